//! Achievement evaluation.
//!
//! One evaluation reads the user's aggregate, the whole catalog and the
//! user's prior state rows, then writes only the rows whose state changed.
//! Everything happens inside a single immediate transaction, so concurrent
//! evaluations of the same user serialize and either all of a user's
//! changes persist or none do. Notifications go out only after commit.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use uuid::Uuid;

use super::catalog::Catalog;
use super::notify::{NotificationDispatcher, NotificationError, UnlockNotification};
use super::progress::{self, Evaluation};
use super::store::AchievementStore;
use super::{
    AchievementDefinition, AchievementError, AchievementView, UnlockedAchievement,
    UserAchievementState,
};
use crate::stats::StatStore;
use crate::storage::{Database, DatabaseError};

/// What an evaluation does to one state row.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// No row yet; create it.
    Create(UserAchievementState),
    /// Locked row that progressed or unlocked.
    Advance(UserAchievementState),
    /// Nothing to write.
    Unchanged,
}

impl Transition {
    /// Decide the transition for one definition given the prior state.
    pub fn plan(
        user_id: Uuid,
        definition: &AchievementDefinition,
        prior: Option<&UserAchievementState>,
        evaluation: Evaluation,
        now: DateTime<Utc>,
    ) -> Transition {
        let unlocked_at = evaluation.unlocked.then_some(now);

        let Some(prior) = prior else {
            return Transition::Create(UserAchievementState {
                user_id,
                achievement_id: definition.id,
                progress: evaluation.progress,
                unlocked_at,
                notified: false,
            });
        };

        if prior.is_unlocked() {
            return Transition::Unchanged;
        }

        let progressed = evaluation.progress > prior.progress;
        if !progressed && !evaluation.unlocked {
            return Transition::Unchanged;
        }

        Transition::Advance(UserAchievementState {
            progress: prior.progress.max(evaluation.progress),
            unlocked_at,
            notified: false,
            ..prior.clone()
        })
    }
}

/// Evaluate every catalog entry for one user against `conn`.
///
/// Returns the achievements whose unlock happened in this call.
pub fn evaluate_user(
    conn: &Connection,
    user_id: &Uuid,
    now: DateTime<Utc>,
) -> Result<Vec<UnlockedAchievement>, AchievementError> {
    let stats = StatStore::new(conn)
        .get(user_id)?
        .ok_or(AchievementError::StatsNotFound(*user_id))?;
    let definitions = Catalog::new(conn).all()?;
    let store = AchievementStore::new(conn);

    let prior: HashMap<Uuid, UserAchievementState> = store
        .list_for_user(user_id)?
        .into_iter()
        .map(|state| (state.achievement_id, state))
        .collect();

    let mut unlocked = Vec::new();

    for definition in &definitions {
        let key = match definition.stat_key() {
            Ok(key) => key,
            Err(e) => {
                tracing::debug!(
                    achievement = %definition.name,
                    reason = %e,
                    "Skipping achievement without a known stat"
                );
                continue;
            }
        };

        let evaluation = progress::evaluate(definition, key.read(&stats));
        let transition = Transition::plan(
            *user_id,
            definition,
            prior.get(&definition.id),
            evaluation,
            now,
        );

        let state = match transition {
            Transition::Unchanged => continue,
            Transition::Create(state) => {
                store.insert(&state)?;
                state
            }
            Transition::Advance(state) => {
                store.advance(&state)?;
                state
            }
        };

        if let Some(unlocked_at) = state.unlocked_at {
            tracing::debug!(
                user_id = %user_id,
                achievement = %definition.name,
                progress = state.progress,
                "Recorded unlock"
            );
            unlocked.push(UnlockedAchievement {
                achievement_id: definition.id,
                name: definition.name.clone(),
                description: definition.description.clone(),
                category: definition.category.clone(),
                progress: state.progress,
                unlocked_at,
            });
        }
    }

    Ok(unlocked)
}

/// The user's achievements as shown to them.
///
/// Hidden definitions appear only once unlocked. Definitions without a state
/// row show zero progress.
pub fn list_views(conn: &Connection, user_id: &Uuid) -> Result<Vec<AchievementView>, DatabaseError> {
    let states: HashMap<Uuid, UserAchievementState> = AchievementStore::new(conn)
        .list_for_user(user_id)?
        .into_iter()
        .map(|state| (state.achievement_id, state))
        .collect();

    let views = Catalog::new(conn)
        .all()?
        .into_iter()
        .filter_map(|definition| {
            let state = states.get(&definition.id);
            let unlocked_at = state.and_then(|s| s.unlocked_at);
            if definition.is_hidden && unlocked_at.is_none() {
                return None;
            }
            Some(AchievementView {
                progress: state.map_or(0, |s| s.progress),
                unlocked_at,
                name: definition.name,
                description: definition.description,
                category: definition.category,
                kind: definition.kind,
                target_value: definition.target_value,
            })
        })
        .collect();

    Ok(views)
}

/// Evaluates users against the catalog and dispatches unlock notifications.
#[derive(Clone)]
pub struct AchievementEngine {
    db: Arc<Database>,
    dispatcher: Option<NotificationDispatcher>,
}

impl AchievementEngine {
    /// Create an engine that does not notify.
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            dispatcher: None,
        }
    }

    /// Create an engine that hands unlocks to `dispatcher`.
    pub fn with_dispatcher(db: Arc<Database>, dispatcher: NotificationDispatcher) -> Self {
        Self {
            db,
            dispatcher: Some(dispatcher),
        }
    }

    /// Evaluate all achievements for a user and persist the changes.
    pub fn evaluate(&self, user_id: &Uuid) -> Result<Vec<UnlockedAchievement>, AchievementError> {
        let unlocked = self
            .db
            .with_transaction(|tx| evaluate_user(tx, user_id, Utc::now()))?;

        for achievement in &unlocked {
            self.notify(UnlockNotification::new(*user_id, achievement));
        }

        Ok(unlocked)
    }

    /// The user's visible achievements.
    pub fn views(&self, user_id: &Uuid) -> Result<Vec<AchievementView>, AchievementError> {
        Ok(self.db.with_connection(|conn| list_views(conn, user_id))?)
    }

    fn notify(&self, notification: UnlockNotification) {
        let Some(dispatcher) = &self.dispatcher else {
            return;
        };

        match dispatcher.dispatch(notification.clone()) {
            Ok(()) => {}
            Err(NotificationError::QueueFull) => tracing::warn!(
                user_id = %notification.user_id,
                achievement = %notification.achievement_name,
                "Notification queue full, dropping unlock notification"
            ),
            Err(e) => tracing::warn!(
                user_id = %notification.user_id,
                achievement = %notification.achievement_name,
                error = %e,
                "Failed to dispatch unlock notification"
            ),
        }
    }
}
