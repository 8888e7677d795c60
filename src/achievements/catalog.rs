//! Achievement catalog.
//!
//! Definitions come from a JSON seed document and are upserted by name, so
//! reseeding with the same source changes nothing and editing an entry's
//! fields updates it in place without touching its id.

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use uuid::Uuid;

use super::{AchievementDefinition, AchievementKind};
use crate::storage::database::{parse_uuid, DatabaseError};
use crate::storage::Database;

/// Built-in seed document shipped with the binary.
const BUILTIN_SEED: &str = include_str!("../../data/achievements.json");

/// One definition as written in a seed document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedEntry {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: AchievementKind,
    pub target_value: i64,
    #[serde(default)]
    pub target_stat: String,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub category: String,
}

impl SeedEntry {
    fn matches(&self, definition: &AchievementDefinition) -> bool {
        self.description == definition.description
            && self.kind == definition.kind
            && self.target_value == definition.target_value
            && self.target_stat == definition.target_stat
            && self.is_hidden == definition.is_hidden
            && self.category == definition.category
    }
}

/// A parsed seed document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSeed {
    pub achievements: Vec<SeedEntry>,
}

impl CatalogSeed {
    /// The catalog compiled into the crate.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_SEED)
    }

    /// Parse and validate a seed document.
    pub fn from_json(content: &str) -> Result<Self, CatalogError> {
        let seed: CatalogSeed =
            serde_json::from_str(content).map_err(|e| CatalogError::ParseError(e.to_string()))?;

        for entry in &seed.achievements {
            if entry.name.trim().is_empty() {
                return Err(CatalogError::Invalid(
                    "achievement name must not be empty".to_string(),
                ));
            }
            if entry.target_value < 0 {
                return Err(CatalogError::Invalid(format!(
                    "achievement '{}' has a negative target",
                    entry.name
                )));
            }
        }

        Ok(seed)
    }

    /// Read a seed document from disk.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| CatalogError::IoError(e.to_string()))?;
        Self::from_json(&content)
    }

    /// Entries keyed by name; a repeated name keeps its last entry at the
    /// position of its first.
    pub fn entries(&self) -> Vec<&SeedEntry> {
        let mut positions: HashMap<&str, usize> = HashMap::new();
        let mut entries: Vec<&SeedEntry> = Vec::with_capacity(self.achievements.len());

        for entry in &self.achievements {
            match positions.get(entry.name.as_str()) {
                Some(&index) => entries[index] = entry,
                None => {
                    positions.insert(entry.name.as_str(), entries.len());
                    entries.push(entry);
                }
            }
        }

        entries
    }

    /// Load `path` when given, the built-in catalog otherwise.
    pub fn resolve(path: Option<&Path>) -> Result<Self, CatalogError> {
        match path {
            Some(path) => Self::load(path),
            None => Self::builtin(),
        }
    }
}

/// Counts of what a seeding run changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl SeedReport {
    pub fn changed(&self) -> bool {
        self.inserted > 0 || self.updated > 0
    }
}

/// Catalog access bound to a connection.
pub struct Catalog<'a> {
    conn: &'a Connection,
}

impl<'a> Catalog<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Upsert every entry of `seed` keyed by name.
    pub fn seed(&self, seed: &CatalogSeed) -> Result<SeedReport, DatabaseError> {
        let mut report = SeedReport::default();

        for entry in seed.entries() {
            match self.get_by_name(&entry.name)? {
                None => {
                    self.insert(Uuid::new_v4(), entry)?;
                    report.inserted += 1;
                }
                Some(existing) if entry.matches(&existing) => report.unchanged += 1,
                Some(existing) => {
                    self.update(&existing.id, entry)?;
                    report.updated += 1;
                }
            }
        }

        Ok(report)
    }

    /// Every definition in the catalog.
    pub fn all(&self) -> Result<Vec<AchievementDefinition>, DatabaseError> {
        let sql = format!(
            "{} ORDER BY category ASC, target_value ASC, name ASC",
            DEFINITION_SELECT
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], map_definition_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(DefinitionRow::into_definition).collect()
    }

    pub fn get_by_name(&self, name: &str) -> Result<Option<AchievementDefinition>, DatabaseError> {
        let sql = format!("{} WHERE name = ?1", DEFINITION_SELECT);
        let row = self
            .conn
            .query_row(&sql, params![name], map_definition_row)
            .optional()?;

        row.map(DefinitionRow::into_definition).transpose()
    }

    fn insert(&self, id: Uuid, entry: &SeedEntry) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO achievements (id, name, description, kind, target_value, target_stat,
                                       is_hidden, category)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id.to_string(),
                entry.name,
                entry.description,
                entry.kind.as_str(),
                entry.target_value,
                entry.target_stat,
                entry.is_hidden,
                entry.category,
            ],
        )?;
        Ok(())
    }

    fn update(&self, id: &Uuid, entry: &SeedEntry) -> Result<(), DatabaseError> {
        self.conn.execute(
            "UPDATE achievements
             SET description = ?2, kind = ?3, target_value = ?4, target_stat = ?5,
                 is_hidden = ?6, category = ?7
             WHERE id = ?1",
            params![
                id.to_string(),
                entry.description,
                entry.kind.as_str(),
                entry.target_value,
                entry.target_stat,
                entry.is_hidden,
                entry.category,
            ],
        )?;
        Ok(())
    }
}

/// Seed the catalog in a single transaction.
pub fn seed_catalog(db: &Database, seed: &CatalogSeed) -> Result<SeedReport, CatalogError> {
    let report = db.with_transaction(|tx| Catalog::new(tx).seed(seed))?;

    tracing::info!(
        inserted = report.inserted,
        updated = report.updated,
        unchanged = report.unchanged,
        "Seeded achievement catalog"
    );
    Ok(report)
}

const DEFINITION_SELECT: &str = "SELECT id, name, description, kind, target_value, target_stat,
     is_hidden, category FROM achievements";

fn map_definition_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DefinitionRow> {
    Ok(DefinitionRow {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        kind: row.get(3)?,
        target_value: row.get(4)?,
        target_stat: row.get(5)?,
        is_hidden: row.get(6)?,
        category: row.get(7)?,
    })
}

struct DefinitionRow {
    id: String,
    name: String,
    description: String,
    kind: String,
    target_value: i64,
    target_stat: String,
    is_hidden: bool,
    category: String,
}

impl DefinitionRow {
    fn into_definition(self) -> Result<AchievementDefinition, DatabaseError> {
        Ok(AchievementDefinition {
            id: parse_uuid(&self.id)?,
            name: self.name,
            description: self.description,
            kind: AchievementKind::from(self.kind),
            target_value: self.target_value,
            target_stat: self.target_stat,
            is_hidden: self.is_hidden,
            category: self.category,
        })
    }
}

/// Catalog errors.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid catalog: {0}")]
    Invalid(String),

    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),
}
