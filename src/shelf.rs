//! Service wiring.
//!
//! Opens the database, seeds the catalog, starts the notification worker and
//! hands out a [`LibraryService`] built on top of them.

use std::sync::Arc;

use crate::achievements::catalog::{seed_catalog, CatalogError, CatalogSeed, SeedReport};
use crate::achievements::notify::NotificationError;
use crate::achievements::{
    AchievementEngine, LogSink, NotificationDispatcher, NotificationSink, NotificationWorker,
};
use crate::library::LibraryService;
use crate::storage::{Database, DatabaseError, ServiceConfig};

/// A running library service.
pub struct Shelf {
    db: Arc<Database>,
    service: LibraryService,
    worker: NotificationWorker,
    seed_report: SeedReport,
}

impl Shelf {
    /// Start with notifications going to the log.
    pub fn start(config: &ServiceConfig) -> Result<Self, StartError> {
        let db = Database::open(&config.database.path)?;
        Self::start_with(Arc::new(db), config, Arc::new(LogSink))
    }

    /// Start on an already opened database with a custom sink.
    pub fn start_with(
        db: Arc<Database>,
        config: &ServiceConfig,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<Self, StartError> {
        if config.notifications.queue_capacity == 0 {
            return Err(NotificationError::InvalidCapacity.into());
        }

        let seed = CatalogSeed::resolve(config.catalog.seed_path.as_deref())?;
        let seed_report = seed_catalog(&db, &seed)?;

        let (dispatcher, worker) = NotificationDispatcher::spawn(
            sink,
            db.clone(),
            config.notifications.queue_capacity,
        )?;

        let engine = AchievementEngine::with_dispatcher(db.clone(), dispatcher);
        tracing::debug!(
            queue_capacity = config.notifications.queue_capacity,
            "Library service started"
        );

        Ok(Self {
            service: LibraryService::new(db.clone(), engine),
            db,
            worker,
            seed_report,
        })
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    pub fn service(&self) -> &LibraryService {
        &self.service
    }

    /// What the startup seeding changed.
    pub fn seed_report(&self) -> SeedReport {
        self.seed_report
    }

    /// Stop accepting work and wait for queued notifications to be delivered.
    pub fn shutdown(self) -> Result<usize, NotificationError> {
        let Shelf { service, worker, .. } = self;
        drop(service);
        worker.shutdown()
    }
}

/// Startup errors.
#[derive(Debug, thiserror::Error)]
pub enum StartError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Notification(#[from] NotificationError),
}
