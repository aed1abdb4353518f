// libs/transport-cell/src/services/trips.rs
//
// Trip assignment keeps `passengers_count` by explicit increment/decrement.
// Each mutation is two writes (appointment, then trip) with no transaction
// around them; `audit`/`reconcile` repair drift left by a failed second write.
// Every path counts seats with `seats_held`, so a cancelled passenger is
// worth zero seats to `unassign` and to the audit alike.

use std::sync::Arc;

use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use shared_database::SupabaseClient;
use shared_models::scheduling::{Appointment, AppointmentStatus, Trip, TripStatus};

use crate::models::{TransportError, TripAssignment, TripAudit, TripManifest};
use crate::services::ledger::{check_trip_capacity, passengers_for, seats_held};

pub struct TripService {
    supabase: Arc<SupabaseClient>,
}

impl TripService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub async fn get_trip(&self, trip_id: Uuid, auth_token: &str) -> Result<Trip, TransportError> {
        debug!("Fetching trip {}", trip_id);

        let path = format!("/rest/v1/trips?id=eq.{}", trip_id);
        let rows: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| TransportError::Database(e.to_string()))?;

        let row = rows.into_iter().next().ok_or(TransportError::TripNotFound)?;
        serde_json::from_value(row)
            .map_err(|e| TransportError::Database(format!("Failed to parse trip: {}", e)))
    }

    async fn get_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, TransportError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let rows: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| TransportError::Database(e.to_string()))?;

        let row = rows.into_iter().next().ok_or(TransportError::AppointmentNotFound)?;
        serde_json::from_value(row)
            .map_err(|e| TransportError::Database(format!("Failed to parse appointment: {}", e)))
    }

    async fn assigned_appointments(
        &self,
        trip_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, TransportError> {
        let path = format!(
            "/rest/v1/appointments?trip_id=eq.{}&status=neq.cancelled&order=time.asc",
            trip_id
        );
        let rows: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| TransportError::Database(e.to_string()))?;

        rows.into_iter()
            .map(|row| serde_json::from_value(row)
                .map_err(|e| TransportError::Database(format!("Failed to parse appointment: {}", e))))
            .collect()
    }

    /// The trip plus its non-cancelled passengers, by appointment time.
    pub async fn trip_passengers(
        &self,
        trip_id: Uuid,
        auth_token: &str,
    ) -> Result<TripManifest, TransportError> {
        let trip = self.get_trip(trip_id, auth_token).await?;
        let passengers = self.assigned_appointments(trip_id, auth_token).await?;
        let seats_taken = passengers.iter().map(seats_held).sum();

        Ok(TripManifest { trip, passengers, seats_taken })
    }

    pub async fn assign(
        &self,
        trip_id: Uuid,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<TripAssignment, TransportError> {
        let trip = self.get_trip(trip_id, auth_token).await?;
        if trip.status != TripStatus::Scheduled {
            return Err(TransportError::TripClosed(trip.status.to_string()));
        }

        let appointment = self.get_appointment(appointment_id, auth_token).await?;
        if !appointment.is_external() {
            return Err(TransportError::NotExternal);
        }
        if appointment.status == AppointmentStatus::Cancelled {
            return Err(TransportError::Validation(
                "Cancelled appointments cannot be assigned to a trip".to_string(),
            ));
        }
        if let Some(current) = appointment.trip_id {
            return Err(TransportError::AlreadyAssigned(current));
        }
        if appointment.date != trip.date {
            return Err(TransportError::Validation(format!(
                "Appointment is on {} but the trip leaves on {}", appointment.date, trip.date
            )));
        }

        let incoming = passengers_for(appointment.has_companion);
        check_trip_capacity(&trip, incoming)?;

        let appointment = self
            .write_appointment_trip(appointment_id, Some(trip_id), auth_token)
            .await?;

        let new_count = trip.passengers_count + incoming;
        let trip = match self.write_passenger_count(trip_id, new_count, auth_token).await {
            Ok(trip) => trip,
            Err(e) => {
                error!(
                    "Appointment {} was linked to trip {} but the passenger count update failed; run the trip audit: {}",
                    appointment_id, trip_id, e
                );
                return Err(e);
            }
        };

        info!("Assigned appointment {} to trip {} ({}/{})",
              appointment_id, trip_id, trip.passengers_count, trip.capacity);

        Ok(TripAssignment { trip, appointment })
    }

    pub async fn unassign(
        &self,
        trip_id: Uuid,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<TripAssignment, TransportError> {
        let trip = self.get_trip(trip_id, auth_token).await?;
        if matches!(trip.status, TripStatus::Completed | TripStatus::Cancelled) {
            return Err(TransportError::TripClosed(trip.status.to_string()));
        }

        let appointment = self.get_appointment(appointment_id, auth_token).await?;
        if appointment.trip_id != Some(trip_id) {
            return Err(TransportError::NotAssigned);
        }

        let outgoing = seats_held(&appointment);

        let appointment = self.write_appointment_trip(appointment_id, None, auth_token).await?;

        if outgoing == 0 {
            info!("Unlinked cancelled appointment {} from trip {}; seat count unchanged",
                  appointment_id, trip_id);
            return Ok(TripAssignment { trip, appointment });
        }

        let new_count = trip.passengers_count.saturating_sub(outgoing);
        let trip = match self.write_passenger_count(trip_id, new_count, auth_token).await {
            Ok(trip) => trip,
            Err(e) => {
                error!(
                    "Appointment {} was unlinked from trip {} but the passenger count update failed; run the trip audit: {}",
                    appointment_id, trip_id, e
                );
                return Err(e);
            }
        };

        info!("Removed appointment {} from trip {}", appointment_id, trip_id);
        Ok(TripAssignment { trip, appointment })
    }

    /// Frees the seats of an appointment that has just been cancelled while
    /// still on a trip. `cancelled` is the row as written, so its seats are
    /// still part of the stored count. Closed trips are left as they are.
    /// Returns the updated trip when seats were released.
    pub async fn release_cancelled(
        &self,
        cancelled: &Appointment,
        auth_token: &str,
    ) -> Result<Option<Trip>, TransportError> {
        let Some(trip_id) = cancelled.trip_id else {
            return Ok(None);
        };

        let trip = self.get_trip(trip_id, auth_token).await?;
        if matches!(trip.status, TripStatus::Completed | TripStatus::Cancelled) {
            debug!("Trip {} is {}; keeping cancelled appointment {} on its record",
                   trip_id, trip.status, cancelled.id);
            return Ok(None);
        }

        self.write_appointment_trip(cancelled.id, None, auth_token).await?;

        let outgoing = passengers_for(cancelled.has_companion);
        let new_count = trip.passengers_count.saturating_sub(outgoing);
        let trip = match self.write_passenger_count(trip_id, new_count, auth_token).await {
            Ok(trip) => trip,
            Err(e) => {
                error!(
                    "Cancelled appointment {} was unlinked from trip {} but the passenger count update failed; run the trip audit: {}",
                    cancelled.id, trip_id, e
                );
                return Err(e);
            }
        };

        info!("Released {} seat(s) of cancelled appointment {} on trip {} ({}/{})",
              outgoing, cancelled.id, trip_id, trip.passengers_count, trip.capacity);
        Ok(Some(trip))
    }

    /// Recomputes the passenger count from assigned appointments. Read-only.
    pub async fn audit(&self, trip_id: Uuid, auth_token: &str) -> Result<TripAudit, TransportError> {
        let manifest = self.trip_passengers(trip_id, auth_token).await?;
        let audit = TripAudit::new(trip_id, manifest.trip.passengers_count, manifest.seats_taken);

        if !audit.is_consistent() {
            warn!("Trip {} passenger count drift: stored {} computed {}",
                  trip_id, audit.stored, audit.computed);
        }
        Ok(audit)
    }

    /// Writes the recomputed count back when the audit finds drift.
    pub async fn reconcile(&self, trip_id: Uuid, auth_token: &str) -> Result<TripAudit, TransportError> {
        let mut audit = self.audit(trip_id, auth_token).await?;
        if audit.is_consistent() {
            return Ok(audit);
        }

        self.write_passenger_count(trip_id, audit.computed, auth_token).await?;
        audit.reconciled = true;

        info!("Trip {} passenger count reconciled to {}", trip_id, audit.computed);
        Ok(audit)
    }

    async fn write_appointment_trip(
        &self,
        appointment_id: Uuid,
        trip_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<Appointment, TransportError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let rows = self.supabase.write_returning(
            Method::PATCH,
            &path,
            Some(auth_token),
            json!({ "trip_id": trip_id }),
        ).await.map_err(|e| TransportError::Database(e.to_string()))?;

        let row = rows.into_iter().next().ok_or(TransportError::AppointmentNotFound)?;
        serde_json::from_value(row)
            .map_err(|e| TransportError::Database(format!("Failed to parse appointment: {}", e)))
    }

    async fn write_passenger_count(
        &self,
        trip_id: Uuid,
        passengers_count: u32,
        auth_token: &str,
    ) -> Result<Trip, TransportError> {
        let path = format!("/rest/v1/trips?id=eq.{}", trip_id);
        let rows = self.supabase.write_returning(
            Method::PATCH,
            &path,
            Some(auth_token),
            json!({ "passengers_count": passengers_count }),
        ).await.map_err(|e| TransportError::Database(e.to_string()))?;

        let row = rows.into_iter().next().ok_or(TransportError::TripNotFound)?;
        serde_json::from_value(row)
            .map_err(|e| TransportError::Database(format!("Failed to parse trip: {}", e)))
    }
}
