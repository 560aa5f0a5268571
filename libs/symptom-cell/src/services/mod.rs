pub mod ai;
pub mod analysis;
pub mod finder;
pub mod pubmed;
pub mod queries;
pub mod severity;

pub use ai::{provider_for, ChatMessage, ChatProvider};
pub use analysis::SymptomAnalyzer;
pub use finder::DoctorFinder;
pub use pubmed::PubMedClient;
pub use queries::QueryService;
