//! SQLite access shared by every cell.
//!
//! The service keeps two databases: `doctors.db` for the doctor directory and
//! `admin_data.db` for everything the admin panel and patients generate.

pub mod migrations;
pub mod pool;
pub mod settings;
pub mod state;

pub use pool::DbPool;
pub use state::AppState;
