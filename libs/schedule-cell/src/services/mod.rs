pub mod slots;
pub mod availability;

pub use slots::{generate_slots, working_days};
pub use availability::AvailabilityService;
