// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::NaiveDate;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use schedule_cell::time::{is_on_slot_grid, normalize_time};
use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::scheduling::{
    Appointment, AppointmentStatus, LocationType, NewAppointment, Service, TransportStatus,
};
use transport_cell::services::{passengers_for, TransportLedger};

use crate::models::{AppointmentError, BookAppointmentRequest, BookingResponse};
use crate::services::share::share_url;

/// A request that passed field validation.
#[derive(Debug, Clone)]
struct ValidatedBooking {
    client_id: Uuid,
    client_name: String,
    professional_id: Uuid,
    professional_name: String,
    service: Service,
    date: NaiveDate,
    time: String,
    health_unit: String,
}

pub struct AppointmentBookingService {
    supabase: Arc<SupabaseClient>,
    ledger: TransportLedger,
    share_base_url: String,
}

impl AppointmentBookingService {
    pub fn new(supabase: Arc<SupabaseClient>, config: &AppConfig) -> Self {
        let ledger = TransportLedger::new(Arc::clone(&supabase), config.default_transport_capacity);
        Self {
            supabase,
            ledger,
            share_base_url: config.share_base_url.clone(),
        }
    }

    /// Validates, checks for a duplicate, checks transport capacity for
    /// external services, then inserts. Any failed check returns before the
    /// insert is issued.
    pub async fn book_appointment(
        &self,
        request: BookAppointmentRequest,
        auth_token: &str,
    ) -> Result<BookingResponse, AppointmentError> {
        let booking = validate_request(&request)?;
        info!("Booking {} for client {} with professional {} on {} at {}",
              booking.service.name, booking.client_id, booking.professional_id, booking.date, booking.time);

        if self
            .has_upcoming_appointment(booking.client_id, booking.professional_id, booking.date, auth_token)
            .await?
        {
            warn!("Duplicate booking rejected for client {} with professional {} on {}",
                  booking.client_id, booking.professional_id, booking.date);
            return Err(AppointmentError::DuplicateBooking);
        }

        let is_external = booking.service.is_external();
        if is_external {
            self.check_transport_capacity(booking.date, request.has_companion, auth_token).await?;
        }

        let new_appointment = NewAppointment {
            client_id: booking.client_id,
            client_name: booking.client_name,
            professional_id: booking.professional_id,
            professional_name: booking.professional_name,
            professional_image: request.professional_image.clone(),
            service_name: service_label(&booking.service.name, request.specialty.as_deref()),
            date: booking.date,
            time: booking.time,
            price: booking.service.price,
            status: AppointmentStatus::Upcoming,
            location_type: booking.service.location_type,
            health_unit: Some(booking.health_unit),
            destination_city: if is_external { booking.service.destination_city.clone() } else { None },
            external_professional: if is_external { non_blank(&request.external_professional) } else { None },
            has_companion: is_external && request.has_companion,
            transport_status: is_external.then_some(TransportStatus::Pending),
            notes: non_blank(&request.notes),
        };

        let appointment = self.insert_appointment(&new_appointment, auth_token).await?;
        info!("Appointment {} booked", appointment.id);

        let share_url = share_url(&self.share_base_url, &appointment);
        Ok(BookingResponse { appointment, share_url })
    }

    async fn has_upcoming_appointment(
        &self,
        client_id: Uuid,
        professional_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<bool, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?client_id=eq.{}&professional_id=eq.{}&date=eq.{}&status=eq.upcoming&select=id",
            client_id, professional_id, date
        );
        let rows: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| AppointmentError::Database(e.to_string()))?;

        Ok(!rows.is_empty())
    }

    async fn check_transport_capacity(
        &self,
        date: NaiveDate,
        has_companion: bool,
        auth_token: &str,
    ) -> Result<(), AppointmentError> {
        let incoming = passengers_for(has_companion);
        let load = self.ledger.date_load(date, auth_token).await?;
        debug!("Transport on {}: {} committed, {} incoming, capacity {}",
               date, load.committed, incoming, load.capacity);

        if !load.can_accommodate(incoming) {
            warn!("Transport capacity exceeded on {}: {}/{} with {} incoming",
                  date, load.committed, load.capacity, incoming);
            return Err(AppointmentError::CapacityExceeded {
                capacity: load.capacity,
                remaining: load.remaining,
            });
        }
        Ok(())
    }

    async fn insert_appointment(
        &self,
        appointment: &NewAppointment,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let body = serde_json::to_value(appointment)
            .map_err(|e| AppointmentError::Database(format!("Failed to serialize appointment: {}", e)))?;

        let rows: Vec<Value> = self.supabase.write_returning(
            Method::POST,
            "/rest/v1/appointments",
            Some(auth_token),
            body,
        ).await.map_err(|e| AppointmentError::Database(e.to_string()))?;

        let row = rows.into_iter().next()
            .ok_or_else(|| AppointmentError::Database("Insert returned no row".to_string()))?;
        serde_json::from_value(row)
            .map_err(|e| AppointmentError::Database(format!("Failed to parse appointment: {}", e)))
    }
}

fn validate_request(request: &BookAppointmentRequest) -> Result<ValidatedBooking, AppointmentError> {
    let service = request.service.clone()
        .ok_or_else(|| missing("service"))?;
    let date = request.date.ok_or_else(|| missing("date"))?;
    let raw_time = non_blank(&request.time).ok_or_else(|| missing("time"))?;
    let professional_id = request.professional_id.ok_or_else(|| missing("professional"))?;
    let professional_name = non_blank(&request.professional_name)
        .ok_or_else(|| missing("professional name"))?;
    let health_unit = non_blank(&request.health_unit).ok_or_else(|| missing("health unit"))?;
    let client_id = request.client_id.ok_or_else(|| missing("client"))?;
    let client_name = non_blank(&request.client_name).ok_or_else(|| missing("client name"))?;

    // Local bookings come from generated slots; external ones carry the
    // remote facility's time and may fall anywhere.
    let time = match service.location_type {
        LocationType::Local => {
            if !is_on_slot_grid(&raw_time) {
                return Err(AppointmentError::Validation(format!(
                    "'{}' is not a half-hour slot", raw_time
                )));
            }
            normalize_time(&raw_time)
        }
        LocationType::External => normalize_time(&raw_time),
    }
    .ok_or_else(|| AppointmentError::Validation(format!("Invalid time '{}'", raw_time)))?;

    Ok(ValidatedBooking {
        client_id,
        client_name,
        professional_id,
        professional_name,
        service,
        date,
        time,
        health_unit,
    })
}

pub fn service_label(service_name: &str, specialty: Option<&str>) -> String {
    match specialty.map(str::trim).filter(|s| !s.is_empty()) {
        Some(specialty) => format!("{} ({})", service_name, specialty),
        None => service_name.to_string(),
    }
}

fn missing(field: &str) -> AppointmentError {
    AppointmentError::Validation(format!("{} is required", field))
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn service(location_type: LocationType) -> Service {
        Service {
            id: Uuid::new_v4(),
            name: "Consulta".to_string(),
            duration: 30,
            price: 0.0,
            location_type,
            destination_city: None,
        }
    }

    fn complete_request(location_type: LocationType, time: &str) -> BookAppointmentRequest {
        BookAppointmentRequest {
            client_id: Some(Uuid::new_v4()),
            client_name: Some("Maria".to_string()),
            professional_id: Some(Uuid::new_v4()),
            professional_name: Some("Dra. Ana".to_string()),
            service: Some(service(location_type)),
            date: NaiveDate::from_ymd_opt(2024, 6, 10),
            time: Some(time.to_string()),
            health_unit: Some("UBS Centro".to_string()),
            ..BookAppointmentRequest::default()
        }
    }

    #[test]
    fn each_required_field_is_checked() {
        let mut request = complete_request(LocationType::Local, "09:00");
        request.health_unit = Some("   ".to_string());
        assert_matches!(validate_request(&request), Err(AppointmentError::Validation(msg)) if msg.contains("health unit"));

        let mut request = complete_request(LocationType::Local, "09:00");
        request.service = None;
        assert_matches!(validate_request(&request), Err(AppointmentError::Validation(msg)) if msg.contains("service"));

        let mut request = complete_request(LocationType::Local, "09:00");
        request.professional_id = None;
        assert_matches!(validate_request(&request), Err(AppointmentError::Validation(_)));
    }

    #[test]
    fn grid_applies_to_local_only() {
        assert_matches!(
            validate_request(&complete_request(LocationType::Local, "09:15")),
            Err(AppointmentError::Validation(_))
        );

        let booking = validate_request(&complete_request(LocationType::External, "07:15")).unwrap();
        assert_eq!(booking.time, "07:15");
    }

    #[test]
    fn specialty_suffix() {
        assert_eq!(service_label("Consulta", Some("Cardiologia")), "Consulta (Cardiologia)");
        assert_eq!(service_label("Consulta", Some("  ")), "Consulta");
        assert_eq!(service_label("Consulta", None), "Consulta");
    }
}
