pub mod handlers;
pub mod router;
pub mod models;
pub mod time;
pub mod services;

pub use models::*;
pub use services::*;
