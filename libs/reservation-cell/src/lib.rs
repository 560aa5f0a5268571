pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::*;
pub use router::reservation_routes;
pub use services::{ReservationLifecycleService, ReservationService};
