//! Shared fixtures.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use shelftrack::achievements::catalog::{seed_catalog, CatalogSeed};
use shelftrack::achievements::{NotificationError, NotificationSink, UnlockNotification};
use shelftrack::library::User;
use shelftrack::{AchievementEngine, Database, LibraryService, StatAggregate};

pub const SCENARIO_CATALOG: &str = r#"{
    "achievements": [
        {"name": "First Book", "description": "Add a book", "type": "badge",
         "targetValue": 1, "targetStat": "TotalBooks", "category": "collection"},
        {"name": "Century Reader", "description": "Track 1000 pages", "type": "counter",
         "targetValue": 1000, "targetStat": "TotalPages", "category": "reading"},
        {"name": "Shelf of Five", "description": "Collect 5 books", "type": "milestone",
         "targetValue": 5, "targetStat": "TotalBooks", "category": "collection"}
    ]
}"#;

/// In-memory service seeded with `catalog`, without notifications.
pub fn service_with(catalog: &str) -> (Arc<Database>, LibraryService) {
    let db = Arc::new(Database::open_in_memory().unwrap());
    seed_catalog(&db, &CatalogSeed::from_json(catalog).unwrap()).unwrap();
    let service = LibraryService::new(db.clone(), AchievementEngine::new(db.clone()));
    (db, service)
}

pub fn scenario_service() -> (Arc<Database>, LibraryService) {
    service_with(SCENARIO_CATALOG)
}

pub fn new_user(service: &LibraryService) -> User {
    service.create_user("Ada", "ada@example.com").unwrap()
}

pub fn assert_stats_close(actual: &StatAggregate, expected: &StatAggregate) {
    assert_eq!(actual.total_books, expected.total_books);
    assert_eq!(actual.completed_books, expected.completed_books);
    assert_eq!(actual.to_read_books, expected.to_read_books);
    assert_eq!(actual.reading_books, expected.reading_books);
    assert_eq!(actual.favorite_books, expected.favorite_books);
    assert_eq!(actual.total_pages, expected.total_pages);
    assert!(
        (actual.average_rating - expected.average_rating).abs() < 1e-6,
        "average rating {} != {}",
        actual.average_rating,
        expected.average_rating
    );
}

/// Sink that records every notification it receives.
#[derive(Default)]
pub struct RecordingSink {
    delivered: Mutex<Vec<UnlockNotification>>,
}

impl RecordingSink {
    pub fn delivered(&self) -> Vec<UnlockNotification> {
        self.delivered.lock().unwrap().clone()
    }
}

impl NotificationSink for RecordingSink {
    fn deliver(&self, notification: &UnlockNotification) -> Result<(), NotificationError> {
        self.delivered.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// Sink whose deliveries always fail; counts the attempts.
#[derive(Default)]
pub struct FailingSink {
    attempts: AtomicUsize,
}

impl FailingSink {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl NotificationSink for FailingSink {
    fn deliver(&self, _: &UnlockNotification) -> Result<(), NotificationError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(NotificationError::DeliveryFailed("mail server down".to_string()))
    }
}
