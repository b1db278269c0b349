pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use error::BookingError;
pub use handlers::AppointmentState;
pub use models::*;
pub use router::appointment_routes;
pub use services::*;
