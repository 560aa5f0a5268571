pub mod affiliation;
pub mod csv_io;
pub mod doctor;
pub mod locations;
pub mod matching;
pub mod specialties;

pub use affiliation::AffiliationService;
pub use csv_io::DoctorCsvService;
pub use doctor::DoctorService;
pub use matching::{filter_doctors, DoctorMatchingService};
