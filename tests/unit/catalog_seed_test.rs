//! Built-in catalog contents and seeding behavior.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use shelftrack::achievements::catalog::{seed_catalog, Catalog, CatalogSeed, SeedReport};
use shelftrack::achievements::store::AchievementStore;
use shelftrack::achievements::AchievementKind;
use shelftrack::library::{BookStatus, NewBook};
use shelftrack::stats::StatKey;
use shelftrack::storage::DatabaseError;
use shelftrack::{AchievementEngine, Database, LibraryService};
use uuid::Uuid;

const READER_CATALOG: &str = r#"{"achievements":[
    {"name":"First Book","type":"badge","targetValue":1,"targetStat":"TotalBooks"},
    {"name":"Shelf of Five","type":"milestone","targetValue":5,"targetStat":"TotalBooks"}
]}"#;

#[test]
fn test_builtin_catalog_is_well_formed() {
    let seed = CatalogSeed::builtin().unwrap();

    let names: HashSet<_> = seed.achievements.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names.len(), seed.achievements.len(), "duplicate names");

    for entry in &seed.achievements {
        assert!(
            entry.target_stat.parse::<StatKey>().is_ok(),
            "{} targets unknown stat {}",
            entry.name,
            entry.target_stat
        );
        assert!(
            !matches!(entry.kind, AchievementKind::Unrecognized(_)),
            "{} has unknown kind",
            entry.name
        );
        assert!(entry.target_value > 0);
    }

    let century = seed
        .achievements
        .iter()
        .find(|e| e.name == "Century Reader")
        .unwrap();
    assert_eq!(century.kind, AchievementKind::Counter);
    assert_eq!(century.target_stat, "TotalPages");
    assert_eq!(century.target_value, 1000);
}

#[test]
fn test_seeding_builtin_twice_changes_nothing() {
    let db = Database::open_in_memory().unwrap();
    let seed = CatalogSeed::builtin().unwrap();

    let first = seed_catalog(&db, &seed).unwrap();
    assert_eq!(first.inserted, seed.achievements.len());

    let second = seed_catalog(&db, &seed).unwrap();
    assert_eq!(
        second,
        SeedReport {
            inserted: 0,
            updated: 0,
            unchanged: seed.achievements.len(),
        }
    );

    let stored = db
        .with_connection(|conn| -> Result<_, DatabaseError> { Catalog::new(conn).all() })
        .unwrap();
    assert_eq!(stored.len(), seed.achievements.len());
}

#[test]
fn test_duplicate_names_in_one_document_keep_last() {
    let db = Database::open_in_memory().unwrap();
    let seed = CatalogSeed::from_json(
        r#"{"achievements":[
            {"name":"Reader","type":"badge","targetValue":1,"targetStat":"TotalBooks"},
            {"name":"Reader","type":"milestone","targetValue":3,"targetStat":"TotalBooks"}
        ]}"#,
    )
    .unwrap();

    let report = seed_catalog(&db, &seed).unwrap();
    assert_eq!(
        report,
        SeedReport {
            inserted: 1,
            updated: 0,
            unchanged: 0,
        }
    );

    let again = seed_catalog(&db, &seed).unwrap();
    assert_eq!(
        again,
        SeedReport {
            inserted: 0,
            updated: 0,
            unchanged: 1,
        }
    );

    let stored = db
        .with_connection(|conn| Catalog::new(conn).get_by_name("Reader"))
        .unwrap()
        .unwrap();
    assert_eq!(stored.kind, AchievementKind::Milestone);
    assert_eq!(stored.target_value, 3);
}

#[test]
fn test_reseeding_leaves_user_progress_untouched() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let seed = CatalogSeed::from_json(READER_CATALOG).unwrap();
    seed_catalog(&db, &seed).unwrap();

    let service = LibraryService::new(db.clone(), AchievementEngine::new(db.clone()));
    let user = service.create_user("Ada", "ada@example.com").unwrap();
    for title in ["Dune", "Emma"] {
        service
            .add_book(&user.id, NewBook::new(title, BookStatus::Reading))
            .unwrap();
    }

    let states = || {
        let mut states = db
            .with_connection(|conn| AchievementStore::new(conn).list_for_user(&user.id))
            .unwrap();
        states.sort_by_key(|s| s.achievement_id);
        states
    };
    let definition_ids = || {
        db.with_connection(|conn| -> Result<HashMap<String, Uuid>, DatabaseError> {
            Ok(Catalog::new(conn)
                .all()?
                .into_iter()
                .map(|d| (d.name, d.id))
                .collect())
        })
        .unwrap()
    };

    let before = states();
    assert_eq!(before.len(), 2);
    assert!(before.iter().any(|s| s.is_unlocked() && s.progress == 1));
    assert!(before.iter().any(|s| !s.is_unlocked() && s.progress == 2));
    let ids_before = definition_ids();

    assert!(!seed_catalog(&db, &seed).unwrap().changed());
    assert_eq!(states(), before);
    assert_eq!(definition_ids(), ids_before);

    let edited =
        CatalogSeed::from_json(&READER_CATALOG.replace(r#""targetValue":5"#, r#""targetValue":3"#))
            .unwrap();
    let report = seed_catalog(&db, &edited).unwrap();
    assert_eq!(report.updated, 1);
    assert_eq!(report.unchanged, 1);

    assert_eq!(states(), before);
    assert_eq!(definition_ids(), ids_before);
}
