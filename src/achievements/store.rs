//! Per-user achievement state persistence.

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::UserAchievementState;
use crate::storage::database::{parse_timestamp, parse_uuid, DatabaseError};

const STATE_SELECT: &str =
    "SELECT user_id, achievement_id, progress, unlocked_at, notified FROM user_achievements";

/// Store for the `user_achievements` table.
pub struct AchievementStore<'a> {
    conn: &'a Connection,
}

impl<'a> AchievementStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// All state rows of a user.
    pub fn list_for_user(&self, user_id: &Uuid) -> Result<Vec<UserAchievementState>, DatabaseError> {
        let sql = format!("{} WHERE user_id = ?1", STATE_SELECT);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![user_id.to_string()], map_state_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(StateRow::into_state).collect()
    }

    pub fn get(
        &self,
        user_id: &Uuid,
        achievement_id: &Uuid,
    ) -> Result<Option<UserAchievementState>, DatabaseError> {
        let sql = format!("{} WHERE user_id = ?1 AND achievement_id = ?2", STATE_SELECT);
        let row = self
            .conn
            .query_row(
                &sql,
                params![user_id.to_string(), achievement_id.to_string()],
                map_state_row,
            )
            .optional()?;

        row.map(StateRow::into_state).transpose()
    }

    /// Create the state row. Fails with a constraint violation if it exists.
    pub fn insert(&self, state: &UserAchievementState) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO user_achievements (user_id, achievement_id, progress, unlocked_at, notified)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                state.user_id.to_string(),
                state.achievement_id.to_string(),
                state.progress,
                state.unlocked_at.map(|t| t.to_rfc3339()),
                state.notified,
            ],
        )?;
        Ok(())
    }

    /// Write new progress (and possibly the unlock) to a still-locked row.
    ///
    /// Unlocked rows are frozen; returns `false` when nothing was written.
    pub fn advance(&self, state: &UserAchievementState) -> Result<bool, DatabaseError> {
        let rows_affected = self.conn.execute(
            "UPDATE user_achievements
             SET progress = ?3, unlocked_at = ?4, notified = ?5
             WHERE user_id = ?1 AND achievement_id = ?2 AND unlocked_at IS NULL",
            params![
                state.user_id.to_string(),
                state.achievement_id.to_string(),
                state.progress,
                state.unlocked_at.map(|t| t.to_rfc3339()),
                state.notified,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Record a delivered unlock notification.
    ///
    /// Only unlocked, not yet notified rows change; returns whether one did.
    pub fn mark_notified(&self, user_id: &Uuid, achievement_id: &Uuid) -> Result<bool, DatabaseError> {
        let rows_affected = self.conn.execute(
            "UPDATE user_achievements SET notified = 1
             WHERE user_id = ?1 AND achievement_id = ?2
               AND unlocked_at IS NOT NULL AND notified = 0",
            params![user_id.to_string(), achievement_id.to_string()],
        )?;
        Ok(rows_affected > 0)
    }

    /// Unlocked rows whose notification was never delivered, oldest first.
    pub fn pending_notifications(&self) -> Result<Vec<UserAchievementState>, DatabaseError> {
        let sql = format!(
            "{} WHERE unlocked_at IS NOT NULL AND notified = 0 ORDER BY unlocked_at ASC",
            STATE_SELECT
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], map_state_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(StateRow::into_state).collect()
    }
}

fn map_state_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StateRow> {
    Ok(StateRow {
        user_id: row.get(0)?,
        achievement_id: row.get(1)?,
        progress: row.get(2)?,
        unlocked_at: row.get(3)?,
        notified: row.get(4)?,
    })
}

struct StateRow {
    user_id: String,
    achievement_id: String,
    progress: i64,
    unlocked_at: Option<String>,
    notified: bool,
}

impl StateRow {
    fn into_state(self) -> Result<UserAchievementState, DatabaseError> {
        Ok(UserAchievementState {
            user_id: parse_uuid(&self.user_id)?,
            achievement_id: parse_uuid(&self.achievement_id)?,
            progress: self.progress,
            unlocked_at: self.unlocked_at.as_deref().map(parse_timestamp).transpose()?,
            notified: self.notified,
        })
    }
}
