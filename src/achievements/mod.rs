//! Achievement system.
//!
//! A seeded catalog of definitions is evaluated against each user's
//! [`StatAggregate`](crate::stats::StatAggregate). Per-user state is created
//! lazily, only ever moves forward, and freezes once unlocked.

pub mod catalog;
pub mod engine;
pub mod notify;
pub mod progress;
pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::stats::{StatKey, UnknownStatKey};
use crate::storage::DatabaseError;

pub use catalog::{Catalog, CatalogError, CatalogSeed, SeedReport};
pub use engine::AchievementEngine;
pub use notify::{
    LogSink, NotificationDispatcher, NotificationError, NotificationSink, NotificationWorker,
    UnlockNotification,
};

/// How progress relates to the target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AchievementKind {
    /// Progress tracks the stat without a cap
    Counter,
    /// Progress is clamped at the target
    Milestone,
    /// One-off award, clamped at the target
    Badge,
    /// Kind string not understood by this build; never progresses
    Unrecognized(String),
}

impl AchievementKind {
    pub fn as_str(&self) -> &str {
        match self {
            AchievementKind::Counter => "counter",
            AchievementKind::Milestone => "milestone",
            AchievementKind::Badge => "badge",
            AchievementKind::Unrecognized(raw) => raw,
        }
    }
}

impl From<&str> for AchievementKind {
    fn from(s: &str) -> Self {
        match s {
            "counter" => AchievementKind::Counter,
            "milestone" => AchievementKind::Milestone,
            "badge" => AchievementKind::Badge,
            other => AchievementKind::Unrecognized(other.to_string()),
        }
    }
}

impl From<String> for AchievementKind {
    fn from(s: String) -> Self {
        AchievementKind::from(s.as_str())
    }
}

impl From<AchievementKind> for String {
    fn from(kind: AchievementKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for AchievementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementDefinition {
    pub id: Uuid,
    /// Unique display name; the seeding key
    pub name: String,
    pub description: String,
    pub kind: AchievementKind,
    pub target_value: i64,
    /// Name of the targeted stat; empty or unknown means not stat-driven
    pub target_stat: String,
    /// Hidden until unlocked
    pub is_hidden: bool,
    pub category: String,
}

impl AchievementDefinition {
    /// The stat this definition is driven by.
    pub fn stat_key(&self) -> Result<StatKey, UnknownStatKey> {
        self.target_stat.parse()
    }
}

/// A user's state on one achievement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAchievementState {
    pub user_id: Uuid,
    pub achievement_id: Uuid,
    pub progress: i64,
    pub unlocked_at: Option<DateTime<Utc>>,
    /// Whether the unlock notification was delivered
    pub notified: bool,
}

impl UserAchievementState {
    pub fn is_unlocked(&self) -> bool {
        self.unlocked_at.is_some()
    }
}

/// An achievement unlocked by a single evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockedAchievement {
    pub achievement_id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub progress: i64,
    pub unlocked_at: DateTime<Utc>,
}

/// User-facing achievement entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementView {
    pub name: String,
    pub description: String,
    pub category: String,
    pub kind: AchievementKind,
    pub progress: i64,
    pub target_value: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unlocked_at: Option<DateTime<Utc>>,
}

/// Achievement evaluation errors.
#[derive(Debug, thiserror::Error)]
pub enum AchievementError {
    #[error("Statistics not found for user {0}")]
    StatsNotFound(Uuid),

    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),
}
