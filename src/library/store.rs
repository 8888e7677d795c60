//! Library data storage operations.
//!
//! Provides persistence for:
//! - Users and their public-sharing settings
//! - Books

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::types::{Book, BookStatus, User};
use crate::storage::database::{parse_timestamp, parse_uuid, DatabaseError};

/// Library store for persisting users and books.
pub struct LibraryStore<'a> {
    conn: &'a Connection,
}

impl<'a> LibraryStore<'a> {
    /// Create a new library store with the given connection.
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    // ========== User Operations ==========

    /// Insert a new user.
    pub fn insert_user(&self, user: &User) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO users (id, name, email, public_id, is_public, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user.id.to_string(),
                user.name,
                user.email,
                user.public_id.to_string(),
                user.is_public,
                user.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Get a user by ID.
    pub fn get_user(&self, user_id: &Uuid) -> Result<Option<User>, DatabaseError> {
        self.query_user("WHERE id = ?1", user_id)
    }

    /// Get a user by the identifier of their public view.
    pub fn get_user_by_public_id(&self, public_id: &Uuid) -> Result<Option<User>, DatabaseError> {
        self.query_user("WHERE public_id = ?1", public_id)
    }

    fn query_user(&self, filter: &str, key: &Uuid) -> Result<Option<User>, DatabaseError> {
        let sql = format!(
            "SELECT id, name, email, public_id, is_public, created_at FROM users {}",
            filter
        );

        let row = self
            .conn
            .query_row(&sql, params![key.to_string()], |row| {
                Ok(UserRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    email: row.get(2)?,
                    public_id: row.get(3)?,
                    is_public: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })
            .optional()?;

        row.map(UserRow::into_user).transpose()
    }

    /// Set whether a user's library is publicly visible.
    pub fn set_public(&self, user_id: &Uuid, is_public: bool) -> Result<(), DatabaseError> {
        let rows_affected = self.conn.execute(
            "UPDATE users SET is_public = ?2 WHERE id = ?1",
            params![user_id.to_string(), is_public],
        )?;

        if rows_affected == 0 {
            return Err(DatabaseError::NotFound(format!("User {}", user_id)));
        }
        Ok(())
    }

    // ========== Book Operations ==========

    /// Insert a new book.
    pub fn insert_book(&self, book: &Book) -> Result<(), DatabaseError> {
        let authors_json = serde_json::to_string(&book.authors)
            .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;

        let genres_json = if book.genres.is_empty() {
            None
        } else {
            Some(
                serde_json::to_string(&book.genres)
                    .map_err(|e| DatabaseError::SerializationError(e.to_string()))?,
            )
        };

        self.conn.execute(
            "INSERT INTO books (id, user_id, google_books_id, title, authors_json, description,
             image_url, status, rating, comment, favorite, page_count, genres_json,
             published_date, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                book.id.to_string(),
                book.user_id.to_string(),
                book.google_books_id,
                book.title,
                authors_json,
                book.description,
                book.image_url,
                book.status.as_str(),
                book.rating,
                book.comment,
                book.favorite,
                book.page_count,
                genres_json,
                book.published_date,
                book.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Get a book by ID.
    pub fn get_book(&self, book_id: &Uuid) -> Result<Option<Book>, DatabaseError> {
        let row = self
            .conn
            .query_row(
                &format!("{} WHERE id = ?1", BOOK_SELECT),
                params![book_id.to_string()],
                map_book_row,
            )
            .optional()?;

        row.map(BookRow::into_book).transpose()
    }

    /// List all books belonging to a user, oldest first.
    pub fn list_books(&self, user_id: &Uuid) -> Result<Vec<Book>, DatabaseError> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE user_id = ?1 ORDER BY created_at ASC",
            BOOK_SELECT
        ))?;

        let rows = stmt.query_map(params![user_id.to_string()], map_book_row)?;

        let mut books = Vec::new();
        for row in rows {
            books.push(row?.into_book()?);
        }
        Ok(books)
    }

    /// Persist the editable fields of a book.
    pub fn update_book(&self, book: &Book) -> Result<(), DatabaseError> {
        let rows_affected = self.conn.execute(
            "UPDATE books SET status = ?2, rating = ?3, comment = ?4, favorite = ?5 WHERE id = ?1",
            params![
                book.id.to_string(),
                book.status.as_str(),
                book.rating,
                book.comment,
                book.favorite,
            ],
        )?;

        if rows_affected == 0 {
            return Err(DatabaseError::NotFound(format!("Book {}", book.id)));
        }
        Ok(())
    }

    /// Delete a book by ID.
    pub fn delete_book(&self, book_id: &Uuid) -> Result<(), DatabaseError> {
        let rows_affected = self.conn.execute(
            "DELETE FROM books WHERE id = ?1",
            params![book_id.to_string()],
        )?;

        if rows_affected == 0 {
            return Err(DatabaseError::NotFound(format!("Book {}", book_id)));
        }
        Ok(())
    }
}

const BOOK_SELECT: &str = "SELECT id, user_id, google_books_id, title, authors_json, description,
     image_url, status, rating, comment, favorite, page_count, genres_json, published_date,
     created_at FROM books";

fn map_book_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<BookRow> {
    Ok(BookRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        google_books_id: row.get(2)?,
        title: row.get(3)?,
        authors_json: row.get(4)?,
        description: row.get(5)?,
        image_url: row.get(6)?,
        status: row.get(7)?,
        rating: row.get(8)?,
        comment: row.get(9)?,
        favorite: row.get(10)?,
        page_count: row.get(11)?,
        genres_json: row.get(12)?,
        published_date: row.get(13)?,
        created_at: row.get(14)?,
    })
}

/// Helper struct for user row data.
struct UserRow {
    id: String,
    name: String,
    email: String,
    public_id: String,
    is_public: bool,
    created_at: String,
}

impl UserRow {
    fn into_user(self) -> Result<User, DatabaseError> {
        Ok(User {
            id: parse_uuid(&self.id)?,
            name: self.name,
            email: self.email,
            public_id: parse_uuid(&self.public_id)?,
            is_public: self.is_public,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

/// Helper struct for book row data.
struct BookRow {
    id: String,
    user_id: String,
    google_books_id: Option<String>,
    title: String,
    authors_json: String,
    description: Option<String>,
    image_url: Option<String>,
    status: String,
    rating: u8,
    comment: Option<String>,
    favorite: bool,
    page_count: i64,
    genres_json: Option<String>,
    published_date: Option<String>,
    created_at: String,
}

impl BookRow {
    fn into_book(self) -> Result<Book, DatabaseError> {
        let authors: Vec<String> = serde_json::from_str(&self.authors_json)
            .map_err(|e| DatabaseError::DeserializationError(e.to_string()))?;

        let genres: Vec<String> = match self.genres_json {
            Some(json) => serde_json::from_str(&json)
                .map_err(|e| DatabaseError::DeserializationError(e.to_string()))?,
            None => Vec::new(),
        };

        let status: BookStatus = self
            .status
            .parse()
            .map_err(|e: super::types::UnknownStatus| {
                DatabaseError::DeserializationError(e.to_string())
            })?;

        Ok(Book {
            id: parse_uuid(&self.id)?,
            user_id: parse_uuid(&self.user_id)?,
            google_books_id: self.google_books_id,
            title: self.title,
            authors,
            description: self.description,
            image_url: self.image_url,
            status,
            rating: self.rating,
            comment: self.comment,
            favorite: self.favorite,
            page_count: self.page_count,
            genres,
            published_date: self.published_date,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}
