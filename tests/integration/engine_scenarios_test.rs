//! Integration tests for statistics maintenance and achievement evaluation.

use chrono::Utc;
use shelftrack::achievements::catalog::Catalog;
use shelftrack::achievements::engine::evaluate_user;
use shelftrack::achievements::store::AchievementStore;
use shelftrack::achievements::UserAchievementState;
use shelftrack::library::{BookStatus, BookUpdate, LibraryStore, NewBook};
use shelftrack::stats::{StatMutationHooks, StatStore};
use shelftrack::storage::DatabaseError;
use shelftrack::{Database, StatAggregate};
use uuid::Uuid;

use crate::common::{assert_stats_close, new_user, scenario_service, service_with};

fn state_of(db: &Database, user_id: &Uuid, name: &str) -> Option<UserAchievementState> {
    db.with_connection(|conn| -> Result<_, DatabaseError> {
        let definition = Catalog::new(conn).get_by_name(name)?.unwrap();
        AchievementStore::new(conn).get(user_id, &definition.id)
    })
    .unwrap()
}

#[test]
fn test_add_add_delete_scenario() {
    let (_db, service) = scenario_service();
    let user = new_user(&service);

    let a = service
        .add_book(
            &user.id,
            NewBook::new("A", BookStatus::Reading)
                .with_pages(100)
                .with_rating(4)
                .favorite(),
        )
        .unwrap();
    assert_eq!(a.stats.total_books, 1);
    assert_eq!(a.stats.total_pages, 100);
    assert_eq!(a.stats.average_rating, 4.0);
    assert_eq!(a.stats.reading_books, 1);
    assert_eq!(a.stats.favorite_books, 1);

    let b = service
        .add_book(
            &user.id,
            NewBook::new("B", BookStatus::Finished)
                .with_pages(200)
                .with_rating(2),
        )
        .unwrap();
    assert_eq!(b.stats.total_books, 2);
    assert_eq!(b.stats.total_pages, 300);
    assert_eq!(b.stats.average_rating, 3.0);
    assert_eq!(b.stats.completed_books, 1);

    let removed = service.remove_book(&user.id, &a.book.id).unwrap();
    assert_eq!(removed.stats.total_books, 1);
    assert_eq!(removed.stats.total_pages, 200);
    assert_eq!(removed.stats.average_rating, 2.0);
    assert_eq!(removed.stats.reading_books, 0);
    assert_eq!(removed.stats.completed_books, 1);
    assert_eq!(removed.stats.favorite_books, 0);
}

#[test]
fn test_first_book_unlocks_once_then_freezes() {
    let (db, service) = scenario_service();
    let user = new_user(&service);

    let first = service
        .add_book(&user.id, NewBook::new("A", BookStatus::Reading).with_pages(100))
        .unwrap();
    let unlocked: Vec<_> = first.newly_unlocked.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(unlocked, vec!["First Book"]);

    let state = state_of(&db, &user.id, "First Book").unwrap();
    assert_eq!(state.progress, 1);
    let unlocked_at = state.unlocked_at.unwrap();

    let second = service
        .add_book(&user.id, NewBook::new("B", BookStatus::Finished).with_pages(200))
        .unwrap();
    assert!(second.newly_unlocked.is_empty());

    let state = state_of(&db, &user.id, "First Book").unwrap();
    assert_eq!(state.progress, 1);
    assert_eq!(state.unlocked_at, Some(unlocked_at));
}

#[test]
fn test_counter_reports_uncapped_progress() {
    let (db, service) = scenario_service();
    let user = new_user(&service);

    service
        .add_book(&user.id, NewBook::new("A", BookStatus::Reading).with_pages(100))
        .unwrap();
    service
        .add_book(&user.id, NewBook::new("B", BookStatus::Finished).with_pages(200))
        .unwrap();

    let century = state_of(&db, &user.id, "Century Reader").unwrap();
    assert_eq!(century.progress, 300);
    assert!(!century.is_unlocked());

    // Ten more books land before the next evaluation.
    db.with_transaction(|tx| -> Result<(), Box<dyn std::error::Error>> {
        let library = LibraryStore::new(tx);
        let hooks = StatMutationHooks::new(tx);
        for i in 0..10 {
            let book = NewBook::new(format!("Extra {}", i), BookStatus::ToRead)
                .with_pages(100)
                .into_book(user.id);
            library.insert_book(&book)?;
            hooks.on_add(&user.id, &book)?;
        }
        Ok(())
    })
    .unwrap();

    let unlocked = service.engine().evaluate(&user.id).unwrap();
    let century_unlock = unlocked
        .iter()
        .find(|a| a.name == "Century Reader")
        .unwrap();
    assert_eq!(century_unlock.progress, 1300);

    let century = state_of(&db, &user.id, "Century Reader").unwrap();
    assert_eq!(century.progress, 1300);
    assert!(century.is_unlocked());
}

#[test]
fn test_milestone_progress_is_clamped() {
    let (db, service) = scenario_service();
    let user = new_user(&service);

    for i in 0..8 {
        service
            .add_book(&user.id, NewBook::new(format!("Book {}", i), BookStatus::ToRead))
            .unwrap();
    }

    let shelf = state_of(&db, &user.id, "Shelf of Five").unwrap();
    assert_eq!(shelf.progress, 5);
    assert!(shelf.is_unlocked());
}

#[test]
fn test_progress_never_regresses_while_locked() {
    let (db, service) = scenario_service();
    let user = new_user(&service);

    let mut ids = Vec::new();
    for i in 0..3 {
        let added = service
            .add_book(&user.id, NewBook::new(format!("Book {}", i), BookStatus::ToRead))
            .unwrap();
        ids.push(added.book.id);
    }
    assert_eq!(state_of(&db, &user.id, "Shelf of Five").unwrap().progress, 3);

    for id in &ids[..2] {
        service.remove_book(&user.id, id).unwrap();
    }

    let shelf = state_of(&db, &user.id, "Shelf of Five").unwrap();
    assert_eq!(shelf.progress, 3);
    assert!(!shelf.is_unlocked());
}

#[test]
fn test_unlock_survives_stat_decrease() {
    let (db, service) = scenario_service();
    let user = new_user(&service);

    let added = service
        .add_book(&user.id, NewBook::new("Only", BookStatus::Reading))
        .unwrap();
    service.remove_book(&user.id, &added.book.id).unwrap();

    let first = state_of(&db, &user.id, "First Book").unwrap();
    assert!(first.is_unlocked());
    assert_eq!(first.progress, 1);
}

#[test]
fn test_reevaluation_is_idempotent() {
    let (db, service) = scenario_service();
    let user = new_user(&service);
    service
        .add_book(&user.id, NewBook::new("A", BookStatus::Reading).with_pages(500))
        .unwrap();

    let snapshot = || {
        db.with_connection(|conn| AchievementStore::new(conn).list_for_user(&user.id))
            .unwrap()
    };
    let before = snapshot();

    for _ in 0..3 {
        let unlocked = db
            .with_transaction(|tx| evaluate_user(tx, &user.id, Utc::now()))
            .unwrap();
        assert!(unlocked.is_empty());
    }

    let mut after = snapshot();
    let mut before = before;
    before.sort_by_key(|s| s.achievement_id);
    after.sort_by_key(|s| s.achievement_id);
    assert_eq!(before, after);
}

#[test]
fn test_unknown_target_stat_is_skipped() {
    let (db, service) = service_with(
        r#"{"achievements":[
            {"name":"Critic","type":"badge","targetValue":1,"targetStat":"AverageRating"},
            {"name":"First Book","type":"badge","targetValue":1,"targetStat":"TotalBooks"}
        ]}"#,
    );
    let user = new_user(&service);
    service
        .add_book(&user.id, NewBook::new("A", BookStatus::Finished).with_rating(5))
        .unwrap();

    assert!(state_of(&db, &user.id, "Critic").is_none());
    assert!(state_of(&db, &user.id, "First Book").unwrap().is_unlocked());

    let views = service.achievements(&user.id).unwrap();
    let critic = views.iter().find(|v| v.name == "Critic").unwrap();
    assert_eq!(critic.progress, 0);
    assert!(critic.unlocked_at.is_none());
}

#[test]
fn test_incremental_stats_match_rescan() {
    let (db, service) = scenario_service();
    let user = new_user(&service);
    let statuses = [BookStatus::ToRead, BookStatus::Reading, BookStatus::Finished];

    let mut live = Vec::new();
    for i in 0..40usize {
        match i % 5 {
            0 | 1 | 2 => {
                let entry = NewBook::new(format!("Book {}", i), statuses[i % 3])
                    .with_pages((i as i64 * 37) % 450)
                    .with_rating((i % 6) as u8);
                let entry = if i % 4 == 0 { entry.favorite() } else { entry };
                live.push(service.add_book(&user.id, entry).unwrap().book.id);
            }
            3 if !live.is_empty() => {
                let id = live[i % live.len()];
                let update = BookUpdate {
                    status: Some(statuses[(i / 3) % 3]),
                    rating: Some(((i * 7) % 6) as u8),
                    favorite: Some(i % 2 == 0),
                    comment: None,
                };
                service.update_book(&user.id, &id, update).unwrap();
            }
            _ if !live.is_empty() => {
                let id = live.remove(i % live.len());
                service.remove_book(&user.id, &id).unwrap();
            }
            _ => {}
        }

        let incremental = service.stats(&user.id).unwrap();
        let rescanned = db
            .with_connection(|conn| StatStore::new(conn).compute_from_scratch(&user.id))
            .unwrap();
        assert_stats_close(&incremental, &rescanned);
    }
}

#[test]
fn test_missing_stats_row_is_rebuilt_before_mutation() {
    let (db, service) = scenario_service();
    let user = new_user(&service);
    service
        .add_book(&user.id, NewBook::new("A", BookStatus::Reading).with_pages(100))
        .unwrap();

    db.with_transaction(|tx| -> Result<(), DatabaseError> {
        tx.execute("DELETE FROM user_stats", [])?;
        Ok(())
    })
    .unwrap();

    let added = service
        .add_book(&user.id, NewBook::new("B", BookStatus::Finished).with_pages(50))
        .unwrap();
    assert_eq!(added.stats.total_books, 2);
    assert_eq!(added.stats.total_pages, 150);

    let books = service.list_books(&user.id).unwrap();
    assert_stats_close(&added.stats, &StatAggregate::from_books(user.id, &books));
}
