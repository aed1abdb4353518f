pub mod ledger;
pub mod trips;

pub use ledger::{check_trip_capacity, passengers_for, seats_held, TransportLedger};
pub use trips::TripService;
