//! Per-user reading statistics.
//!
//! [`StatAggregate`] is a running summary of a user's library. It is kept up
//! to date by closed-form increments on every book mutation (see [`hooks`])
//! and only rebuilt from the full book list when no row exists yet.

pub mod hooks;
pub mod store;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::library::types::{Book, BookStatus};

pub use hooks::StatMutationHooks;
pub use store::StatStore;

/// Running summary of one user's library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatAggregate {
    pub user_id: Uuid,
    pub total_books: i64,
    pub completed_books: i64,
    pub to_read_books: i64,
    pub reading_books: i64,
    pub favorite_books: i64,
    pub total_pages: i64,
    /// Mean rating over all books, 0 when the library is empty.
    pub average_rating: f64,
}

impl StatAggregate {
    /// Aggregate of an empty library.
    pub fn empty(user_id: Uuid) -> Self {
        Self {
            user_id,
            total_books: 0,
            completed_books: 0,
            to_read_books: 0,
            reading_books: 0,
            favorite_books: 0,
            total_pages: 0,
            average_rating: 0.0,
        }
    }

    /// Build the aggregate by scanning a full book list.
    pub fn from_books(user_id: Uuid, books: &[Book]) -> Self {
        let mut stats = Self::empty(user_id);
        let mut rating_sum: i64 = 0;

        for book in books {
            stats.total_books += 1;
            stats.total_pages += book.page_count;
            rating_sum += i64::from(book.rating);
            if book.favorite {
                stats.favorite_books += 1;
            }
            *stats.status_counter(book.status) += 1;
        }

        if stats.total_books > 0 {
            stats.average_rating = rating_sum as f64 / stats.total_books as f64;
        }

        stats
    }

    /// Current value of a stat key.
    pub fn value(&self, key: StatKey) -> i64 {
        key.read(self)
    }

    pub(crate) fn status_counter(&mut self, status: BookStatus) -> &mut i64 {
        match status {
            BookStatus::ToRead => &mut self.to_read_books,
            BookStatus::Reading => &mut self.reading_books,
            BookStatus::Finished => &mut self.completed_books,
        }
    }
}

/// Integer stats that achievements can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatKey {
    TotalBooks,
    CompletedBooks,
    ToReadBooks,
    ReadingBooks,
    FavoriteBooks,
    TotalPages,
}

impl StatKey {
    pub const ALL: [StatKey; 6] = [
        StatKey::TotalBooks,
        StatKey::CompletedBooks,
        StatKey::ToReadBooks,
        StatKey::ReadingBooks,
        StatKey::FavoriteBooks,
        StatKey::TotalPages,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatKey::TotalBooks => "TotalBooks",
            StatKey::CompletedBooks => "CompletedBooks",
            StatKey::ToReadBooks => "ToReadBooks",
            StatKey::ReadingBooks => "ReadingBooks",
            StatKey::FavoriteBooks => "FavoriteBooks",
            StatKey::TotalPages => "TotalPages",
        }
    }

    /// Read this stat from an aggregate.
    pub fn read(&self, stats: &StatAggregate) -> i64 {
        match self {
            StatKey::TotalBooks => stats.total_books,
            StatKey::CompletedBooks => stats.completed_books,
            StatKey::ToReadBooks => stats.to_read_books,
            StatKey::ReadingBooks => stats.reading_books,
            StatKey::FavoriteBooks => stats.favorite_books,
            StatKey::TotalPages => stats.total_pages,
        }
    }
}

impl fmt::Display for StatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatKey {
    type Err = UnknownStatKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StatKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| UnknownStatKey(s.to_string()))
    }
}

/// Error returned when a name does not match any targetable stat.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown stat '{0}'")]
pub struct UnknownStatKey(pub String);

/// Statistics errors.
#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    #[error("Statistics not found for user {0}")]
    NotFound(Uuid),

    #[error("Storage error: {0}")]
    Storage(#[from] crate::storage::DatabaseError),
}
