//! ShelfTrack - Personal Library Tracker
//!
//! A self-hosted tracker for a personal book collection. Keeps per-user
//! reading statistics up to date on every change, evaluates a catalog of
//! achievements against them, and can share a read-only view of a library.

pub mod achievements;
pub mod library;
pub mod shelf;
pub mod stats;
pub mod storage;

// Re-export commonly used types
pub use achievements::AchievementEngine;
pub use library::LibraryService;
pub use shelf::Shelf;
pub use stats::StatAggregate;
pub use storage::config::ServiceConfig;
pub use storage::Database;
