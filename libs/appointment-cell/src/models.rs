// libs/appointment-cell/src/models.rs
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::error::AppError;
use shared_models::scheduling::{Appointment, AppointmentStatus, Service, TransportStatus};

// ==============================================================================
// REQUESTS
// ==============================================================================

/// Booking form as submitted by a citizen or an attendant. Every field the
/// orchestrator requires is optional here so that a missing one surfaces as a
/// validation error instead of a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    #[serde(default)]
    pub client_id: Option<Uuid>,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub professional_id: Option<Uuid>,
    #[serde(default)]
    pub professional_name: Option<String>,
    #[serde(default)]
    pub professional_image: Option<String>,
    #[serde(default)]
    pub service: Option<Service>,
    /// Appended to the service name as "Service (Specialty)".
    #[serde(default)]
    pub specialty: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub time: Option<String>,
    /// Unit of the chosen slot for local services, the picked unit for external ones.
    #[serde(default)]
    pub health_unit: Option<String>,
    #[serde(default)]
    pub external_professional: Option<String>,
    #[serde(default)]
    pub has_companion: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingResponse {
    pub appointment: Appointment,
    /// Prefilled message link; absent when no share target is configured.
    pub share_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CancelAppointmentRequest {
    #[serde(default)]
    pub confirmed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateNotesRequest {
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTransportStatusRequest {
    pub transport_status: TransportStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfessionalDayQuery {
    pub date: NaiveDate,
}

// ==============================================================================
// REMINDERS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reminder {
    pub appointment_id: Uuid,
    pub client_id: Uuid,
    pub client_name: String,
    pub professional_name: String,
    pub service_name: String,
    pub health_unit: Option<String>,
    pub starts_at: NaiveDateTime,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum AppointmentError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Client already has an upcoming appointment with this professional on this date")]
    DuplicateBooking,

    #[error("Transport capacity exceeded: {remaining} of {capacity} seats left")]
    CapacityExceeded { capacity: u32, remaining: u32 },

    #[error("Appointment not found")]
    NotFound,

    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition { from: AppointmentStatus, to: AppointmentStatus },

    #[error("Cancellation must be confirmed")]
    ConfirmationRequired,

    #[error("Appointment does not require transport")]
    NotExternal,

    #[error("Invalid transport status transition from {from} to {to}")]
    InvalidTransportTransition { from: TransportStatus, to: TransportStatus },

    #[error("Reminder delivery failed: {0}")]
    Delivery(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl AppointmentError {
    pub fn user_message(&self) -> String {
        match self {
            AppointmentError::Validation(detail) => format!("Dados do agendamento inválidos: {}", detail),
            AppointmentError::DuplicateBooking => {
                "Você já possui um agendamento com este profissional nesta data.".to_string()
            }
            AppointmentError::CapacityExceeded { capacity, remaining } => format!(
                "O transporte para esta data está lotado (capacidade máxima: {} passageiros, vagas restantes: {}). Escolha outra data.",
                capacity, remaining
            ),
            AppointmentError::NotFound => "Agendamento não encontrado.".to_string(),
            AppointmentError::InvalidStatusTransition { from, .. } => format!(
                "Não é possível alterar um agendamento com status '{}'.", from
            ),
            AppointmentError::ConfirmationRequired => {
                "Confirme o cancelamento para continuar.".to_string()
            }
            AppointmentError::NotExternal => {
                "Este agendamento não possui transporte.".to_string()
            }
            AppointmentError::InvalidTransportTransition { to, .. } => format!(
                "Não é possível marcar o embarque como '{}'.", to
            ),
            AppointmentError::Delivery(_) | AppointmentError::Database(_) => {
                "Não foi possível concluir a operação. Tente novamente.".to_string()
            }
        }
    }
}

impl From<transport_cell::TransportError> for AppointmentError {
    fn from(err: transport_cell::TransportError) -> Self {
        AppointmentError::Database(err.to_string())
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match &err {
            AppointmentError::Validation(_) | AppointmentError::NotExternal => {
                AppError::ValidationError(err.user_message())
            }
            AppointmentError::DuplicateBooking
            | AppointmentError::CapacityExceeded { .. }
            | AppointmentError::InvalidStatusTransition { .. }
            | AppointmentError::InvalidTransportTransition { .. } => AppError::Conflict(err.user_message()),
            AppointmentError::NotFound => AppError::NotFound(err.user_message()),
            AppointmentError::ConfirmationRequired => AppError::ConfirmationRequired(err.user_message()),
            AppointmentError::Delivery(detail) => {
                tracing::error!("Reminder delivery failure: {}", detail);
                AppError::ExternalService(err.user_message())
            }
            AppointmentError::Database(detail) => {
                tracing::error!("Appointment persistence failure: {}", detail);
                AppError::Database(err.user_message())
            }
        }
    }
}
