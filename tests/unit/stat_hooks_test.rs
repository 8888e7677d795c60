//! Incremental statistics against full rescans.

use shelftrack::library::{Book, BookStatus, BookUpdate, NewBook};
use shelftrack::StatAggregate;
use uuid::Uuid;

fn book(user_id: Uuid, i: usize) -> Book {
    let status = match i % 3 {
        0 => BookStatus::ToRead,
        1 => BookStatus::Reading,
        _ => BookStatus::Finished,
    };
    let entry = NewBook::new(format!("Book {}", i), status)
        .with_pages((i as i64 * 53) % 700)
        .with_rating((i % 6) as u8);
    if i % 4 == 1 {
        entry.favorite().into_book(user_id)
    } else {
        entry.into_book(user_id)
    }
}

fn assert_close(actual: &StatAggregate, expected: &StatAggregate) {
    assert_eq!(actual.total_books, expected.total_books);
    assert_eq!(actual.completed_books, expected.completed_books);
    assert_eq!(actual.to_read_books, expected.to_read_books);
    assert_eq!(actual.reading_books, expected.reading_books);
    assert_eq!(actual.favorite_books, expected.favorite_books);
    assert_eq!(actual.total_pages, expected.total_pages);
    assert!((actual.average_rating - expected.average_rating).abs() < 1e-9);
}

#[test]
fn test_adds_then_removes_match_rescan() {
    let user_id = Uuid::new_v4();
    let mut stats = StatAggregate::empty(user_id);
    let mut library: Vec<Book> = Vec::new();

    for i in 0..25 {
        let b = book(user_id, i);
        stats.on_add(&b);
        library.push(b);
        assert_close(&stats, &StatAggregate::from_books(user_id, &library));
    }

    while !library.is_empty() {
        let b = library.remove(library.len() / 2);
        stats.on_delete(&b);
        assert_close(&stats, &StatAggregate::from_books(user_id, &library));
    }

    assert_eq!(stats.average_rating, 0.0);
    assert_eq!(stats.total_books, 0);
}

#[test]
fn test_edits_match_rescan() {
    let user_id = Uuid::new_v4();
    let mut library: Vec<Book> = (0..6).map(|i| book(user_id, i)).collect();
    let mut stats = StatAggregate::from_books(user_id, &library);

    let statuses = [BookStatus::Finished, BookStatus::ToRead, BookStatus::Reading];
    for round in 0..18 {
        let index = round % library.len();
        let update = BookUpdate {
            status: Some(statuses[round % 3]),
            rating: Some(((round * 5) % 6) as u8),
            favorite: Some(round % 2 == 1),
            comment: Some(format!("round {}", round)),
        };
        let old = library[index].clone();
        let new = update.apply(&old);
        stats.on_change(&old, &new);
        library[index] = new;

        assert_close(&stats, &StatAggregate::from_books(user_id, &library));
    }
}
