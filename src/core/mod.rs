//! Core domain model and service abstractions

pub mod advisor;
pub mod cache;
pub mod config;
pub mod draft;
pub mod lenient;
pub mod log;
pub mod money;
pub mod squad;
pub mod suggestion;
pub mod task;

// Re-export main types for cleaner imports
pub use advisor::{AdvisorService, SavedSquadRepository, SearchPlayer};
pub use draft::{Draft, DraftStore};
pub use squad::{AdviceMode, Position, Squad, SquadPlayer};
pub use suggestion::{SuggestionBoard, TransferSuggestion};
pub use task::{TaskBackend, TaskKind, TaskRequest};
