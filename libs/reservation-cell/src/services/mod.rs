pub mod booking;
pub mod lifecycle;
pub mod validation;

pub use booking::ReservationService;
pub use lifecycle::ReservationLifecycleService;
