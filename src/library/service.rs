//! Library operations.
//!
//! Every book mutation writes the book and adjusts the owner's statistics in
//! one transaction, then runs an achievement evaluation in a second one. A
//! failed evaluation is logged and never undoes the committed mutation.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use super::store::LibraryStore;
use super::types::{Book, BookUpdate, NewBook, User};
use crate::achievements::{
    AchievementEngine, AchievementError, AchievementView, UnlockedAchievement,
};
use crate::stats::{StatAggregate, StatMutationHooks, StatStore, StatsError};
use crate::storage::{Database, DatabaseError};

/// Result of a book mutation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookMutation {
    /// The book as written, or as it was before removal.
    pub book: Book,
    pub stats: StatAggregate,
    /// Achievements unlocked by the follow-up evaluation.
    pub newly_unlocked: Vec<UnlockedAchievement>,
}

/// Sharing state of a user's library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicVisibility {
    pub is_public: bool,
    pub public_id: Uuid,
}

/// Read-only view of a shared library.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicLibrary {
    pub owner: String,
    pub books: Vec<Book>,
}

/// Entry point for all library operations.
pub struct LibraryService {
    db: Arc<Database>,
    engine: AchievementEngine,
}

impl LibraryService {
    pub fn new(db: Arc<Database>, engine: AchievementEngine) -> Self {
        Self { db, engine }
    }

    pub fn engine(&self) -> &AchievementEngine {
        &self.engine
    }

    // ========== Users ==========

    /// Register a user with an empty statistics row.
    pub fn create_user(&self, name: &str, email: &str) -> Result<User, LibraryError> {
        let name = name.trim();
        let email = email.trim();
        if name.is_empty() {
            return Err(LibraryError::ValidationError("Name is required".to_string()));
        }
        if !email.contains('@') {
            return Err(LibraryError::ValidationError(format!(
                "Invalid email address: {}",
                email
            )));
        }

        let user = User::new(name.to_string(), email.to_string());

        self.db.with_transaction(|tx| -> Result<(), LibraryError> {
            LibraryStore::new(tx)
                .insert_user(&user)
                .map_err(|e| match e {
                    DatabaseError::ConstraintViolation(_) => {
                        LibraryError::EmailTaken(user.email.clone())
                    }
                    other => LibraryError::Storage(other),
                })?;
            StatStore::new(tx).upsert(&StatAggregate::empty(user.id))?;
            Ok(())
        })?;

        tracing::info!(user_id = %user.id, "Created user");
        Ok(user)
    }

    pub fn get_user(&self, user_id: &Uuid) -> Result<User, LibraryError> {
        self.db
            .with_connection(|conn| require_user(&LibraryStore::new(conn), user_id))
    }

    // ========== Books ==========

    /// Add a book to the user's library.
    pub fn add_book(&self, user_id: &Uuid, entry: NewBook) -> Result<BookMutation, LibraryError> {
        entry.validate().map_err(LibraryError::ValidationError)?;

        let (book, stats) = self.db.with_transaction(|tx| -> Result<_, LibraryError> {
            let library = LibraryStore::new(tx);
            require_user(&library, user_id)?;
            StatStore::new(tx).ensure(user_id)?;

            let book = entry.into_book(*user_id);
            library.insert_book(&book)?;
            let stats = StatMutationHooks::new(tx).on_add(user_id, &book)?;
            Ok((book, stats))
        })?;

        tracing::info!(user_id = %user_id, book_id = %book.id, "Added book");
        Ok(self.finish(user_id, book, stats))
    }

    /// Edit status, rating, comment or favorite flag of an owned book.
    pub fn update_book(
        &self,
        user_id: &Uuid,
        book_id: &Uuid,
        update: BookUpdate,
    ) -> Result<BookMutation, LibraryError> {
        update.validate().map_err(LibraryError::ValidationError)?;

        let (book, stats) = self.db.with_transaction(|tx| -> Result<_, LibraryError> {
            let library = LibraryStore::new(tx);
            let old = owned_book(&library, user_id, book_id)?;
            StatStore::new(tx).ensure(user_id)?;

            let new = update.apply(&old);
            library.update_book(&new)?;
            let stats = StatMutationHooks::new(tx).on_change(user_id, &old, &new)?;
            Ok((new, stats))
        })?;

        tracing::info!(user_id = %user_id, book_id = %book_id, "Updated book");
        Ok(self.finish(user_id, book, stats))
    }

    /// Remove an owned book.
    pub fn remove_book(
        &self,
        user_id: &Uuid,
        book_id: &Uuid,
    ) -> Result<BookMutation, LibraryError> {
        let (book, stats) = self.db.with_transaction(|tx| -> Result<_, LibraryError> {
            let library = LibraryStore::new(tx);
            let book = owned_book(&library, user_id, book_id)?;
            StatStore::new(tx).ensure(user_id)?;

            library.delete_book(book_id)?;
            let stats = StatMutationHooks::new(tx).on_delete(user_id, &book)?;
            Ok((book, stats))
        })?;

        tracing::info!(user_id = %user_id, book_id = %book_id, "Removed book");
        Ok(self.finish(user_id, book, stats))
    }

    pub fn list_books(&self, user_id: &Uuid) -> Result<Vec<Book>, LibraryError> {
        self.db.with_connection(|conn| {
            let library = LibraryStore::new(conn);
            require_user(&library, user_id)?;
            Ok(library.list_books(user_id)?)
        })
    }

    // ========== Statistics and achievements ==========

    /// The user's aggregate, rebuilt from their books if no row exists.
    pub fn stats(&self, user_id: &Uuid) -> Result<StatAggregate, LibraryError> {
        self.db.with_transaction(|tx| {
            require_user(&LibraryStore::new(tx), user_id)?;
            Ok(StatStore::new(tx).ensure(user_id)?)
        })
    }

    /// Evaluate, then list the user's visible achievements.
    pub fn achievements(&self, user_id: &Uuid) -> Result<Vec<AchievementView>, LibraryError> {
        self.stats(user_id)?;
        self.engine.evaluate(user_id)?;
        Ok(self.engine.views(user_id)?)
    }

    // ========== Public sharing ==========

    pub fn set_public(
        &self,
        user_id: &Uuid,
        is_public: bool,
    ) -> Result<PublicVisibility, LibraryError> {
        let visibility = self.db.with_transaction(|tx| {
            let library = LibraryStore::new(tx);
            let user = require_user(&library, user_id)?;
            library.set_public(user_id, is_public)?;
            Ok::<_, LibraryError>(PublicVisibility {
                is_public,
                public_id: user.public_id,
            })
        })?;

        tracing::info!(user_id = %user_id, is_public, "Changed public visibility");
        Ok(visibility)
    }

    /// Flip the sharing flag and return the new state.
    pub fn toggle_public(&self, user_id: &Uuid) -> Result<PublicVisibility, LibraryError> {
        let visibility = self.db.with_transaction(|tx| {
            let library = LibraryStore::new(tx);
            let user = require_user(&library, user_id)?;
            library.set_public(user_id, !user.is_public)?;
            Ok::<_, LibraryError>(PublicVisibility {
                is_public: !user.is_public,
                public_id: user.public_id,
            })
        })?;

        tracing::info!(
            user_id = %user_id,
            is_public = visibility.is_public,
            "Changed public visibility"
        );
        Ok(visibility)
    }

    pub fn public_visibility(&self, user_id: &Uuid) -> Result<PublicVisibility, LibraryError> {
        let user = self.get_user(user_id)?;
        Ok(PublicVisibility {
            is_public: user.is_public,
            public_id: user.public_id,
        })
    }

    /// Books of a shared library.
    ///
    /// Unknown ids and private libraries fail the same way.
    pub fn public_books(&self, public_id: &Uuid) -> Result<PublicLibrary, LibraryError> {
        self.db.with_connection(|conn| {
            let library = LibraryStore::new(conn);
            let user = match library.get_user_by_public_id(public_id)? {
                Some(user) if user.is_public => user,
                _ => return Err(LibraryError::NotPublic(*public_id)),
            };

            Ok(PublicLibrary {
                books: library.list_books(&user.id)?,
                owner: user.name,
            })
        })
    }

    /// Evaluate achievements after a committed mutation.
    fn finish(&self, user_id: &Uuid, book: Book, stats: StatAggregate) -> BookMutation {
        let newly_unlocked = match self.engine.evaluate(user_id) {
            Ok(unlocked) => unlocked,
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Achievement evaluation failed");
                Vec::new()
            }
        };

        BookMutation {
            book,
            stats,
            newly_unlocked,
        }
    }
}

fn require_user(library: &LibraryStore<'_>, user_id: &Uuid) -> Result<User, LibraryError> {
    library
        .get_user(user_id)?
        .ok_or(LibraryError::UserNotFound(*user_id))
}

fn owned_book(
    library: &LibraryStore<'_>,
    user_id: &Uuid,
    book_id: &Uuid,
) -> Result<Book, LibraryError> {
    let book = library
        .get_book(book_id)?
        .ok_or(LibraryError::BookNotFound(*book_id))?;

    if book.user_id != *user_id {
        return Err(LibraryError::Forbidden {
            user_id: *user_id,
            book_id: *book_id,
        });
    }
    Ok(book)
}

/// Library errors.
#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("User not found: {0}")]
    UserNotFound(Uuid),

    #[error("Book not found: {0}")]
    BookNotFound(Uuid),

    #[error("Book {book_id} does not belong to user {user_id}")]
    Forbidden { user_id: Uuid, book_id: Uuid },

    #[error("Email already registered: {0}")]
    EmailTaken(String),

    #[error("No public library for {0}")]
    NotPublic(Uuid),

    #[error(transparent)]
    Stats(#[from] StatsError),

    #[error(transparent)]
    Achievement(#[from] AchievementError),

    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),
}
