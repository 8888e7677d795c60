//! Unlock notifications.
//!
//! The engine hands each newly unlocked achievement to a bounded queue after
//! its transaction commits. A background worker drains the queue into a
//! [`NotificationSink`] and marks the state row as notified once delivery
//! succeeds. Each unlock gets exactly one dispatch attempt: a full queue or a
//! failed delivery drops the notification and leaves the row un-notified.

use std::sync::Arc;
use std::thread::JoinHandle;

use chrono::{DateTime, Utc};
use crossbeam::channel::{bounded, Receiver, Sender, TrySendError};
use serde::Serialize;
use uuid::Uuid;

use super::store::AchievementStore;
use super::UnlockedAchievement;
use crate::storage::{Database, DatabaseError};

/// Event emitted when a user unlocks an achievement.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockNotification {
    pub user_id: Uuid,
    pub achievement_id: Uuid,
    pub achievement_name: String,
    pub unlocked_at: DateTime<Utc>,
}

impl UnlockNotification {
    pub fn new(user_id: Uuid, unlocked: &UnlockedAchievement) -> Self {
        Self {
            user_id,
            achievement_id: unlocked.achievement_id,
            achievement_name: unlocked.name.clone(),
            unlocked_at: unlocked.unlocked_at,
        }
    }
}

/// Destination for unlock notifications.
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, notification: &UnlockNotification) -> Result<(), NotificationError>;
}

/// Sink that writes notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn deliver(&self, notification: &UnlockNotification) -> Result<(), NotificationError> {
        tracing::info!(
            user_id = %notification.user_id,
            achievement = %notification.achievement_name,
            unlocked_at = %notification.unlocked_at,
            "Achievement unlocked"
        );
        Ok(())
    }
}

/// Producer side of the notification queue.
#[derive(Debug, Clone)]
pub struct NotificationDispatcher {
    tx: Sender<UnlockNotification>,
}

impl NotificationDispatcher {
    /// Create a dispatcher and the receiving end of its queue.
    pub fn channel(capacity: usize) -> (Self, Receiver<UnlockNotification>) {
        let (tx, rx) = bounded(capacity);
        (Self { tx }, rx)
    }

    /// Create a dispatcher whose queue is drained by a worker thread.
    ///
    /// `capacity` must be at least 1; a rendezvous queue would reject every
    /// `try_send` the worker is not already waiting on.
    pub fn spawn(
        sink: Arc<dyn NotificationSink>,
        db: Arc<Database>,
        capacity: usize,
    ) -> Result<(Self, NotificationWorker), NotificationError> {
        if capacity == 0 {
            return Err(NotificationError::InvalidCapacity);
        }
        let (dispatcher, rx) = Self::channel(capacity);

        let handle = std::thread::Builder::new()
            .name("unlock-notifier".to_string())
            .spawn(move || run_worker(rx, sink.as_ref(), &db))
            .map_err(|e| NotificationError::SpawnFailed(e.to_string()))?;

        Ok((dispatcher, NotificationWorker { handle }))
    }

    /// Enqueue without blocking.
    pub fn dispatch(&self, notification: UnlockNotification) -> Result<(), NotificationError> {
        self.tx.try_send(notification).map_err(|e| match e {
            TrySendError::Full(_) => NotificationError::QueueFull,
            TrySendError::Disconnected(_) => NotificationError::Closed,
        })
    }
}

/// Handle to the background delivery thread.
pub struct NotificationWorker {
    handle: JoinHandle<usize>,
}

impl NotificationWorker {
    /// Drain the queue and stop the worker.
    ///
    /// The queue closes once every [`NotificationDispatcher`] clone has been
    /// dropped; this blocks until then. Returns the number of notifications
    /// delivered.
    pub fn shutdown(self) -> Result<usize, NotificationError> {
        self.handle
            .join()
            .map_err(|_| NotificationError::WorkerPanicked)
    }
}

fn run_worker(
    rx: Receiver<UnlockNotification>,
    sink: &dyn NotificationSink,
    db: &Database,
) -> usize {
    let mut delivered = 0;

    for notification in rx.iter() {
        if let Err(e) = sink.deliver(&notification) {
            tracing::warn!(
                user_id = %notification.user_id,
                achievement = %notification.achievement_name,
                error = %e,
                "Failed to deliver unlock notification"
            );
            continue;
        }

        let marked = db.with_transaction(|tx| {
            AchievementStore::new(tx)
                .mark_notified(&notification.user_id, &notification.achievement_id)
        });
        match marked {
            Ok(_) => delivered += 1,
            Err(e) => tracing::warn!(
                user_id = %notification.user_id,
                achievement = %notification.achievement_name,
                error = %e,
                "Failed to mark notification as delivered"
            ),
        }
    }

    tracing::debug!(delivered, "Notification worker stopped");
    delivered
}

/// Notification errors.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Notification queue is full")]
    QueueFull,

    #[error("Notification queue is closed")]
    Closed,

    #[error("Notification queue capacity must be at least 1")]
    InvalidCapacity,

    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("Failed to spawn notification worker: {0}")]
    SpawnFailed(String),

    #[error("Notification worker panicked")]
    WorkerPanicked,

    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),
}
