pub mod booking;
pub mod lifecycle;
pub mod reminders;
pub mod share;
pub mod status;

pub use booking::AppointmentBookingService;
pub use lifecycle::AppointmentLifecycleService;
pub use reminders::{ReminderService, ReminderSink, TracingReminderSink};
