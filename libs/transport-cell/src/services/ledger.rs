// libs/transport-cell/src/services/ledger.rs
use std::sync::Arc;

use chrono::NaiveDate;
use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, warn};

use shared_database::SupabaseClient;
use shared_models::scheduling::{Appointment, AppointmentStatus, Trip};

use crate::models::{DateCapacity, TransportError};

/// Seats one booking occupies: the patient plus an optional companion.
pub fn passengers_for(has_companion: bool) -> u32 {
    1 + u32::from(has_companion)
}

/// Seats an appointment linked to a trip counts for in `passengers_count`.
/// Cancelled rows count for none, whether or not they are still linked.
pub fn seats_held(appointment: &Appointment) -> u32 {
    match appointment.status {
        AppointmentStatus::Cancelled => 0,
        _ => passengers_for(appointment.has_companion),
    }
}

/// Trip-scoped hard cap, checked against the vehicle's own capacity.
pub fn check_trip_capacity(trip: &Trip, incoming: u32) -> Result<(), TransportError> {
    if trip.passengers_count.saturating_add(incoming) > trip.capacity {
        warn!(
            "Trip {} cannot take {} more passenger(s): {}/{} seats taken",
            trip.id, incoming, trip.passengers_count, trip.capacity
        );
        return Err(TransportError::TripCapacityExceeded {
            capacity: trip.capacity,
            free_seats: trip.free_seats(),
        });
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct CompanionRow {
    #[serde(default)]
    has_companion: bool,
}

/// Date-scoped soft cap used at booking time. It knows nothing about vehicles.
pub struct TransportLedger {
    supabase: Arc<SupabaseClient>,
    capacity: u32,
}

impl TransportLedger {
    pub fn new(supabase: Arc<SupabaseClient>, capacity: u32) -> Self {
        Self { supabase, capacity }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Passengers already committed to external appointments on `date`.
    pub async fn date_load(
        &self,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<DateCapacity, TransportError> {
        let path = format!(
            "/rest/v1/appointments?date=eq.{}&location_type=eq.external&status=neq.cancelled&select=has_companion",
            date
        );
        let rows: Vec<CompanionRow> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| TransportError::Database(e.to_string()))?;

        let committed = rows.iter().map(|row| passengers_for(row.has_companion)).sum();
        debug!("Transport load for {}: {}/{}", date, committed, self.capacity);

        Ok(DateCapacity::new(date, self.capacity, committed))
    }

    pub async fn can_accommodate(
        &self,
        date: NaiveDate,
        additional: u32,
        auth_token: &str,
    ) -> Result<bool, TransportError> {
        Ok(self.date_load(date, auth_token).await?.can_accommodate(additional))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use shared_models::scheduling::TripStatus;
    use uuid::Uuid;

    fn trip(capacity: u32, passengers_count: u32) -> Trip {
        Trip {
            id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
            time: "05:00".to_string(),
            destination_id: None,
            destination_name: Some("Campina Grande".to_string()),
            vehicle_id: None,
            vehicle_name: Some("Van 02".to_string()),
            driver_id: None,
            driver_name: None,
            capacity,
            passengers_count,
            status: TripStatus::Scheduled,
        }
    }

    #[test]
    fn companion_counts_as_a_seat() {
        assert_eq!(passengers_for(false), 1);
        assert_eq!(passengers_for(true), 2);
    }

    #[test]
    fn trip_cap_reports_free_seats() {
        assert!(check_trip_capacity(&trip(12, 10), 2).is_ok());

        match check_trip_capacity(&trip(12, 11), 2) {
            Err(TransportError::TripCapacityExceeded { capacity, free_seats }) => {
                assert_eq!(capacity, 12);
                assert_eq!(free_seats, 1);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn overfilled_trip_has_zero_free_seats() {
        let drifted = trip(4, 6);
        assert_eq!(drifted.free_seats(), 0);
        assert!(check_trip_capacity(&drifted, 1).is_err());
    }
}
