// libs/transport-cell/src/models.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::error::AppError;
use shared_models::scheduling::{Appointment, Trip};

// ==============================================================================
// LEDGER VIEWS
// ==============================================================================

/// Date-scoped passenger load against the global default capacity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateCapacity {
    pub date: NaiveDate,
    pub capacity: u32,
    pub committed: u32,
    pub remaining: u32,
}

impl DateCapacity {
    pub fn new(date: NaiveDate, capacity: u32, committed: u32) -> Self {
        Self {
            date,
            capacity,
            committed,
            remaining: capacity.saturating_sub(committed),
        }
    }

    pub fn can_accommodate(&self, additional: u32) -> bool {
        self.committed.saturating_add(additional) <= self.capacity
    }
}

/// Stored vs recomputed passenger count of a trip.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TripAudit {
    pub trip_id: Uuid,
    pub stored: u32,
    pub computed: u32,
    pub drift: i64,
    pub reconciled: bool,
}

impl TripAudit {
    pub fn new(trip_id: Uuid, stored: u32, computed: u32) -> Self {
        Self {
            trip_id,
            stored,
            computed,
            drift: i64::from(stored) - i64::from(computed),
            reconciled: false,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.drift == 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripAssignment {
    pub trip: Trip,
    pub appointment: Appointment,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripManifest {
    pub trip: Trip,
    pub passengers: Vec<Appointment>,
    pub seats_taken: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapacityQuery {
    pub date: NaiveDate,
    pub additional: Option<u32>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum TransportError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Trip not found")]
    TripNotFound,

    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("Appointment does not require transport")]
    NotExternal,

    #[error("Trip is {0} and no longer accepts changes")]
    TripClosed(String),

    #[error("Appointment is already assigned to trip {0}")]
    AlreadyAssigned(Uuid),

    #[error("Appointment is not assigned to this trip")]
    NotAssigned,

    #[error("Trip capacity exceeded: {free_seats} free of {capacity}")]
    TripCapacityExceeded { capacity: u32, free_seats: u32 },

    #[error("Database error: {0}")]
    Database(String),
}

impl TransportError {
    pub fn user_message(&self) -> String {
        match self {
            TransportError::Validation(detail) => format!("Dados de transporte inválidos: {}", detail),
            TransportError::TripNotFound => "Viagem não encontrada.".to_string(),
            TransportError::AppointmentNotFound => "Agendamento não encontrado.".to_string(),
            TransportError::NotExternal => {
                "Este agendamento não é de tratamento fora de domicílio.".to_string()
            }
            TransportError::TripClosed(status) => {
                format!("A viagem está com status '{}' e não aceita alterações.", status)
            }
            TransportError::AlreadyAssigned(_) => {
                "Este paciente já está alocado em uma viagem.".to_string()
            }
            TransportError::NotAssigned => "Este paciente não está nesta viagem.".to_string(),
            TransportError::TripCapacityExceeded { free_seats, .. } => format!(
                "Capacidade do veículo excedida. Vagas livres: {}.", free_seats
            ),
            TransportError::Database(_) => {
                "Não foi possível concluir a operação. Tente novamente.".to_string()
            }
        }
    }
}

impl From<TransportError> for AppError {
    fn from(err: TransportError) -> Self {
        match &err {
            TransportError::Validation(_) | TransportError::NotExternal => {
                AppError::ValidationError(err.user_message())
            }
            TransportError::TripNotFound | TransportError::AppointmentNotFound => {
                AppError::NotFound(err.user_message())
            }
            TransportError::TripClosed(_)
            | TransportError::AlreadyAssigned(_)
            | TransportError::NotAssigned
            | TransportError::TripCapacityExceeded { .. } => AppError::Conflict(err.user_message()),
            TransportError::Database(detail) => {
                tracing::error!("Transport persistence failure: {}", detail);
                AppError::Database(err.user_message())
            }
        }
    }
}
