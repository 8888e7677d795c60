//! Core types for the personal library.
//!
//! Defines users, books, reading status and the change sets applied to books.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Highest rating a book can carry.
pub const MAX_RATING: u8 = 5;

/// A registered library owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// Identifier used by the read-only public view.
    pub public_id: Uuid,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new private user.
    pub fn new(name: String, email: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            email,
            public_id: Uuid::new_v4(),
            is_public: false,
            created_at: Utc::now(),
        }
    }
}

/// Reading status of a book.
///
/// The set is closed: statistics keep one counter per variant, so any other
/// string is rejected when parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookStatus {
    #[serde(rename = "to-read")]
    ToRead,
    #[serde(rename = "reading")]
    Reading,
    #[serde(rename = "finished")]
    Finished,
}

impl BookStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookStatus::ToRead => "to-read",
            BookStatus::Reading => "reading",
            BookStatus::Finished => "finished",
        }
    }
}

impl fmt::Display for BookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "to-read" => Ok(BookStatus::ToRead),
            "reading" => Ok(BookStatus::Reading),
            "finished" => Ok(BookStatus::Finished),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Error returned when a status string is not one of the known values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown book status '{0}' (expected to-read, reading or finished)")]
pub struct UnknownStatus(pub String);

/// A book in a user's library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: Uuid,
    pub user_id: Uuid,
    pub google_books_id: Option<String>,
    pub title: String,
    pub authors: Vec<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub status: BookStatus,
    pub rating: u8,
    pub comment: Option<String>,
    pub favorite: bool,
    pub page_count: i64,
    pub genres: Vec<String>,
    pub published_date: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when adding a book.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBook {
    #[serde(default)]
    pub google_books_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub status: BookStatus,
    #[serde(default)]
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub page_count: i64,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub published_date: Option<String>,
}

impl NewBook {
    /// Create a minimal book entry.
    pub fn new(title: impl Into<String>, status: BookStatus) -> Self {
        Self {
            google_books_id: None,
            title: title.into(),
            authors: Vec::new(),
            description: None,
            image_url: None,
            status,
            rating: 0,
            comment: None,
            favorite: false,
            page_count: 0,
            genres: Vec::new(),
            published_date: None,
        }
    }

    pub fn with_pages(mut self, page_count: i64) -> Self {
        self.page_count = page_count;
        self
    }

    pub fn with_rating(mut self, rating: u8) -> Self {
        self.rating = rating;
        self
    }

    pub fn favorite(mut self) -> Self {
        self.favorite = true;
        self
    }

    pub fn by(mut self, author: impl Into<String>) -> Self {
        self.authors.push(author.into());
        self
    }

    /// Check the fields that statistics depend on.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Book title is required".to_string());
        }
        validate_rating(self.rating)?;
        if self.page_count < 0 {
            return Err("Page count cannot be negative".to_string());
        }
        Ok(())
    }

    /// Materialize the entry as a book owned by `user_id`.
    pub fn into_book(self, user_id: Uuid) -> Book {
        Book {
            id: Uuid::new_v4(),
            user_id,
            google_books_id: self.google_books_id,
            title: self.title,
            authors: self.authors,
            description: self.description,
            image_url: self.image_url,
            status: self.status,
            rating: self.rating,
            comment: self.comment,
            favorite: self.favorite,
            page_count: self.page_count,
            genres: self.genres,
            published_date: self.published_date,
            created_at: Utc::now(),
        }
    }
}

/// Editable fields of an existing book. `None` keeps the current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookUpdate {
    pub status: Option<BookStatus>,
    pub rating: Option<u8>,
    pub comment: Option<String>,
    pub favorite: Option<bool>,
}

impl BookUpdate {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(rating) = self.rating {
            validate_rating(rating)?;
        }
        Ok(())
    }

    /// Produce the edited copy of `book`.
    pub fn apply(&self, book: &Book) -> Book {
        let mut updated = book.clone();
        if let Some(status) = self.status {
            updated.status = status;
        }
        if let Some(rating) = self.rating {
            updated.rating = rating;
        }
        if let Some(comment) = &self.comment {
            updated.comment = Some(comment.clone());
        }
        if let Some(favorite) = self.favorite {
            updated.favorite = favorite;
        }
        updated
    }
}

fn validate_rating(rating: u8) -> Result<(), String> {
    if rating > MAX_RATING {
        return Err(format!("Rating must be between 0 and {}", MAX_RATING));
    }
    Ok(())
}
