// libs/appointment-cell/src/services/lifecycle.rs
use std::sync::Arc;

use chrono::NaiveDate;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use shared_database::SupabaseClient;
use shared_models::scheduling::{Appointment, AppointmentStatus, TransportStatus};
use transport_cell::services::TripService;

use crate::models::AppointmentError;
use crate::services::status::{check_status_transition, check_transport_transition};

pub struct AppointmentLifecycleService {
    supabase: Arc<SupabaseClient>,
}

impl AppointmentLifecycleService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Fetching appointment {}", appointment_id);

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let mut appointments = self.fetch(&path, auth_token).await?;
        if appointments.is_empty() {
            return Err(AppointmentError::NotFound);
        }
        Ok(appointments.swap_remove(0))
    }

    /// Newest first.
    pub async fn list_for_client(
        &self,
        client_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?client_id=eq.{}&order=date.desc,time.desc",
            client_id
        );
        self.fetch(&path, auth_token).await
    }

    /// The professional's agenda for one day, cancelled rows included.
    pub async fn list_for_professional_date(
        &self,
        professional_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?professional_id=eq.{}&date=eq.{}&order=time.asc",
            professional_id, date
        );
        self.fetch(&path, auth_token).await
    }

    pub async fn complete(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        self.transition(appointment_id, AppointmentStatus::Completed, auth_token).await
    }

    /// Nothing is read or written until the caller has confirmed.
    pub async fn cancel(
        &self,
        appointment_id: Uuid,
        confirmed: bool,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        if !confirmed {
            debug!("Cancellation of {} awaiting confirmation", appointment_id);
            return Err(AppointmentError::ConfirmationRequired);
        }
        self.transition(appointment_id, AppointmentStatus::Cancelled, auth_token).await
    }

    async fn transition(
        &self,
        appointment_id: Uuid,
        requested: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.get_appointment(appointment_id, auth_token).await?;

        if !check_status_transition(appointment.status, requested)? {
            return Ok(appointment);
        }

        // The write only lands if the status is still the one we checked.
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&status=eq.{}",
            appointment_id, appointment.status
        );
        let written = self.write_fields(&path, json!({ "status": requested }), auth_token).await?;

        let Some(mut updated) = written else {
            let current = self.get_appointment(appointment_id, auth_token).await?;
            warn!("Appointment {} moved to {} before it could be set to {}",
                  appointment_id, current.status, requested);
            if current.status == requested {
                return Ok(current);
            }
            return Err(AppointmentError::InvalidStatusTransition {
                from: current.status,
                to: requested,
            });
        };
        info!("Appointment {} moved from {} to {}", appointment_id, appointment.status, requested);

        if requested == AppointmentStatus::Cancelled && updated.trip_id.is_some() {
            self.release_trip_seats(&mut updated, auth_token).await;
        }
        Ok(updated)
    }

    /// A failed release leaves the cancellation in place; the trip audit repairs the count.
    async fn release_trip_seats(&self, cancelled: &mut Appointment, auth_token: &str) {
        let trips = TripService::new(Arc::clone(&self.supabase));
        match trips.release_cancelled(cancelled, auth_token).await {
            Ok(Some(_)) => cancelled.trip_id = None,
            Ok(None) => {}
            Err(e) => error!(
                "Appointment {} was cancelled but its seats on trip {:?} were not released: {}",
                cancelled.id, cancelled.trip_id, e
            ),
        }
    }

    /// Notes stay editable after the appointment is closed.
    pub async fn update_notes(
        &self,
        appointment_id: Uuid,
        notes: Option<String>,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let notes = notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        self.update_fields(appointment_id, json!({ "notes": notes }), auth_token).await
    }

    /// Boarding status only; trip seat counts are not touched.
    pub async fn set_transport_status(
        &self,
        appointment_id: Uuid,
        requested: TransportStatus,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.get_appointment(appointment_id, auth_token).await?;
        if !appointment.is_external() {
            return Err(AppointmentError::NotExternal);
        }

        if !check_transport_transition(appointment.transport_status, requested)? {
            return Ok(appointment);
        }

        let updated = self
            .update_fields(appointment_id, json!({ "transport_status": requested }), auth_token)
            .await?;
        info!("Boarding status of {} set to {}", appointment_id, requested);
        Ok(updated)
    }

    async fn fetch(&self, path: &str, auth_token: &str) -> Result<Vec<Appointment>, AppointmentError> {
        let rows: Vec<Value> = self.supabase.request(
            Method::GET,
            path,
            Some(auth_token),
            None,
        ).await.map_err(|e| AppointmentError::Database(e.to_string()))?;

        rows.into_iter()
            .map(|row| serde_json::from_value(row)
                .map_err(|e| AppointmentError::Database(format!("Failed to parse appointment: {}", e))))
            .collect()
    }

    async fn update_fields(
        &self,
        appointment_id: Uuid,
        fields: Value,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        self.write_fields(&path, fields, auth_token)
            .await?
            .ok_or(AppointmentError::NotFound)
    }

    /// `None` when the filter in `path` matched no row.
    async fn write_fields(
        &self,
        path: &str,
        fields: Value,
        auth_token: &str,
    ) -> Result<Option<Appointment>, AppointmentError> {
        let rows = self.supabase.write_returning(
            Method::PATCH,
            path,
            Some(auth_token),
            fields,
        ).await.map_err(|e| AppointmentError::Database(e.to_string()))?;

        rows.into_iter()
            .next()
            .map(|row| serde_json::from_value(row)
                .map_err(|e| AppointmentError::Database(format!("Failed to parse appointment: {}", e))))
            .transpose()
    }
}
