//! Row shapes shared by the scheduling cells.
//!
//! Names copied onto an appointment (`client_name`, `professional_name`, ...)
//! are a snapshot taken at booking time and are never re-joined.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Upcoming,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Completed | AppointmentStatus::Cancelled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Upcoming => write!(f, "upcoming"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Boarding state of a patient on an intercity trip.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TransportStatus {
    Pending,
    Present,
    Absent,
}

impl fmt::Display for TransportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportStatus::Pending => write!(f, "pending"),
            TransportStatus::Present => write!(f, "present"),
            TransportStatus::Absent => write!(f, "absent"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum LocationType {
    #[default]
    Local,
    External,
}

impl fmt::Display for LocationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationType::Local => write!(f, "local"),
            LocationType::External => write!(f, "external"),
        }
    }
}

/// A bookable service. `External` services require intercity transport.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Service {
    pub id: Uuid,
    pub name: String,
    pub duration: i32,
    pub price: f64,
    #[serde(default)]
    pub location_type: LocationType,
    #[serde(default)]
    pub destination_city: Option<String>,
}

impl Service {
    pub fn is_external(&self) -> bool {
        self.location_type == LocationType::External
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub client_id: Uuid,
    pub client_name: String,
    pub professional_id: Uuid,
    pub professional_name: String,
    #[serde(default)]
    pub professional_image: Option<String>,
    pub service_name: String,
    pub date: NaiveDate,
    pub time: String,
    pub price: f64,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub location_type: LocationType,
    #[serde(default)]
    pub health_unit: Option<String>,
    #[serde(default)]
    pub destination_city: Option<String>,
    #[serde(default)]
    pub external_professional: Option<String>,
    #[serde(default)]
    pub has_companion: bool,
    #[serde(default)]
    pub transport_status: Option<TransportStatus>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub trip_id: Option<Uuid>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Appointment {
    pub fn is_external(&self) -> bool {
        self.location_type == LocationType::External
    }

    pub fn is_active(&self) -> bool {
        self.status != AppointmentStatus::Cancelled
    }
}

/// Insert payload; the data service assigns `id` and `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewAppointment {
    pub client_id: Uuid,
    pub client_name: String,
    pub professional_id: Uuid,
    pub professional_name: String,
    pub professional_image: Option<String>,
    pub service_name: String,
    pub date: NaiveDate,
    pub time: String,
    pub price: f64,
    pub status: AppointmentStatus,
    pub location_type: LocationType,
    pub health_unit: Option<String>,
    pub destination_city: Option<String>,
    pub external_professional: Option<String>,
    pub has_companion: bool,
    pub transport_status: Option<TransportStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    #[default]
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TripStatus::Scheduled => write!(f, "scheduled"),
            TripStatus::InProgress => write!(f, "in_progress"),
            TripStatus::Completed => write!(f, "completed"),
            TripStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trip {
    pub id: Uuid,
    pub date: NaiveDate,
    pub time: String,
    #[serde(default)]
    pub destination_id: Option<Uuid>,
    #[serde(default)]
    pub destination_name: Option<String>,
    #[serde(default)]
    pub vehicle_id: Option<Uuid>,
    #[serde(default)]
    pub vehicle_name: Option<String>,
    #[serde(default)]
    pub driver_id: Option<Uuid>,
    #[serde(default)]
    pub driver_name: Option<String>,
    pub capacity: u32,
    #[serde(default)]
    pub passengers_count: u32,
    #[serde(default)]
    pub status: TripStatus,
}

impl Trip {
    pub fn free_seats(&self) -> u32 {
        self.capacity.saturating_sub(self.passengers_count)
    }
}
