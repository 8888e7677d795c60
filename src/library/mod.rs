//! Personal library: users, their books and public sharing.

pub mod service;
pub mod store;
pub mod types;

pub use service::{BookMutation, LibraryError, LibraryService, PublicLibrary, PublicVisibility};
pub use store::LibraryStore;
pub use types::{Book, BookStatus, BookUpdate, NewBook, User};
