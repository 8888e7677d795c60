//! Statistics persistence.

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::StatAggregate;
use crate::library::store::LibraryStore;
use crate::storage::database::{parse_uuid, DatabaseError};

/// Store for the `user_stats` table.
pub struct StatStore<'a> {
    conn: &'a Connection,
}

impl<'a> StatStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Get the stored aggregate for a user.
    pub fn get(&self, user_id: &Uuid) -> Result<Option<StatAggregate>, DatabaseError> {
        let row = self
            .conn
            .query_row(
                "SELECT user_id, total_books, completed_books, to_read_books, reading_books,
                        favorite_books, total_pages, average_rating
                 FROM user_stats WHERE user_id = ?1",
                params![user_id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, i64>(5)?,
                        row.get::<_, i64>(6)?,
                        row.get::<_, f64>(7)?,
                    ))
                },
            )
            .optional()?;

        row.map(
            |(
                id,
                total_books,
                completed_books,
                to_read_books,
                reading_books,
                favorite_books,
                total_pages,
                average_rating,
            )| {
                Ok(StatAggregate {
                    user_id: parse_uuid(&id)?,
                    total_books,
                    completed_books,
                    to_read_books,
                    reading_books,
                    favorite_books,
                    total_pages,
                    average_rating,
                })
            },
        )
        .transpose()
    }

    /// Insert or overwrite the aggregate row.
    pub fn upsert(&self, stats: &StatAggregate) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO user_stats (user_id, total_books, completed_books, to_read_books,
                                     reading_books, favorite_books, total_pages, average_rating)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(user_id) DO UPDATE SET
                total_books = excluded.total_books,
                completed_books = excluded.completed_books,
                to_read_books = excluded.to_read_books,
                reading_books = excluded.reading_books,
                favorite_books = excluded.favorite_books,
                total_pages = excluded.total_pages,
                average_rating = excluded.average_rating",
            params![
                stats.user_id.to_string(),
                stats.total_books,
                stats.completed_books,
                stats.to_read_books,
                stats.reading_books,
                stats.favorite_books,
                stats.total_pages,
                stats.average_rating,
            ],
        )?;
        Ok(())
    }

    /// Rebuild a user's aggregate by scanning all of their books.
    pub fn compute_from_scratch(&self, user_id: &Uuid) -> Result<StatAggregate, DatabaseError> {
        let books = LibraryStore::new(self.conn).list_books(user_id)?;
        Ok(StatAggregate::from_books(*user_id, &books))
    }

    /// Return the stored aggregate, rebuilding and persisting it if absent.
    pub fn ensure(&self, user_id: &Uuid) -> Result<StatAggregate, DatabaseError> {
        if let Some(stats) = self.get(user_id)? {
            return Ok(stats);
        }

        let stats = self.compute_from_scratch(user_id)?;
        self.upsert(&stats)?;
        tracing::info!(user_id = %user_id, total_books = stats.total_books, "Rebuilt user statistics");
        Ok(stats)
    }
}
