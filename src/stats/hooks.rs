//! Incremental statistics maintenance.
//!
//! Each book mutation adjusts the aggregate by a closed-form delta instead of
//! rescanning the library. The `StatMutationHooks` entry points perform the
//! read-modify-write against the connection they are given; callers run them
//! inside [`Database::with_transaction`](crate::storage::Database::with_transaction)
//! together with the book write itself.

use rusqlite::Connection;
use uuid::Uuid;

use super::store::StatStore;
use super::{StatAggregate, StatsError};
use crate::library::types::Book;

impl StatAggregate {
    /// Account for a newly added book.
    pub fn on_add(&mut self, book: &Book) {
        let old_total = self.total_books;
        self.total_books += 1;
        self.total_pages += book.page_count;
        self.average_rating = (old_total as f64 * self.average_rating
            + f64::from(book.rating))
            / self.total_books as f64;

        *self.status_counter(book.status) += 1;
        if book.favorite {
            self.favorite_books += 1;
        }
    }

    /// Account for a removed book.
    pub fn on_delete(&mut self, book: &Book) {
        let old_total = self.total_books;
        self.total_books -= 1;
        self.total_pages -= book.page_count;
        self.average_rating = if self.total_books <= 0 {
            0.0
        } else {
            (old_total as f64 * self.average_rating - f64::from(book.rating))
                / self.total_books as f64
        };

        *self.status_counter(book.status) -= 1;
        if book.favorite {
            self.favorite_books -= 1;
        }
    }

    /// Account for an edit from `old` to `new`. The book count is unchanged.
    pub fn on_change(&mut self, old: &Book, new: &Book) {
        if old.status != new.status {
            *self.status_counter(old.status) -= 1;
            *self.status_counter(new.status) += 1;
        }

        if old.favorite != new.favorite {
            if new.favorite {
                self.favorite_books += 1;
            } else {
                self.favorite_books -= 1;
            }
        }

        if old.rating != new.rating && self.total_books > 0 {
            let total = self.total_books as f64;
            self.average_rating = (total * self.average_rating - f64::from(old.rating)
                + f64::from(new.rating))
                / total;
        }

        self.total_pages += new.page_count - old.page_count;
    }
}

/// Stat mutation entry points bound to a connection.
pub struct StatMutationHooks<'a> {
    store: StatStore<'a>,
}

impl<'a> StatMutationHooks<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self {
            store: StatStore::new(conn),
        }
    }

    /// Apply a book addition to the user's aggregate.
    pub fn on_add(&self, user_id: &Uuid, book: &Book) -> Result<StatAggregate, StatsError> {
        self.mutate(user_id, |stats| stats.on_add(book))
    }

    /// Apply a book removal to the user's aggregate.
    pub fn on_delete(&self, user_id: &Uuid, book: &Book) -> Result<StatAggregate, StatsError> {
        self.mutate(user_id, |stats| stats.on_delete(book))
    }

    /// Apply a book edit to the user's aggregate.
    pub fn on_change(
        &self,
        user_id: &Uuid,
        old: &Book,
        new: &Book,
    ) -> Result<StatAggregate, StatsError> {
        self.mutate(user_id, |stats| stats.on_change(old, new))
    }

    fn mutate<F>(&self, user_id: &Uuid, apply: F) -> Result<StatAggregate, StatsError>
    where
        F: FnOnce(&mut StatAggregate),
    {
        let mut stats = self
            .store
            .get(user_id)?
            .ok_or(StatsError::NotFound(*user_id))?;

        apply(&mut stats);
        self.store.upsert(&stats)?;

        tracing::debug!(
            user_id = %user_id,
            total_books = stats.total_books,
            total_pages = stats.total_pages,
            "Updated user statistics"
        );
        Ok(stats)
    }
}
