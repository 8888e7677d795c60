//! Command execution.

use anyhow::Result;
use serde::Serialize;

use shelftrack::achievements::catalog::{seed_catalog, Catalog, CatalogSeed};
use shelftrack::library::{BookUpdate, NewBook};
use shelftrack::storage::{DatabaseError, ServiceConfig};
use shelftrack::Shelf;

use crate::{BookCommands, Commands, PublicCommands, UserCommands};

/// Run one command against a started shelf.
pub fn run(shelf: &Shelf, config: &ServiceConfig, command: Commands) -> Result<()> {
    let service = shelf.service();

    match command {
        Commands::Seed { file } => {
            let path = file.or_else(|| config.catalog.seed_path.clone());
            let seed = CatalogSeed::resolve(path.as_deref())?;
            print_json(&seed_catalog(shelf.database(), &seed)?)
        }
        Commands::Catalog => {
            let definitions = shelf
                .database()
                .with_connection(|conn| -> Result<_, DatabaseError> {
                    Catalog::new(conn).all()
                })?;
            print_json(&definitions)
        }
        Commands::User(UserCommands::Add { name, email }) => {
            print_json(&service.create_user(&name, &email)?)
        }
        Commands::Book(command) => run_book(shelf, command),
        Commands::Stats { user } => print_json(&service.stats(&user)?),
        Commands::Achievements { user } => print_json(&service.achievements(&user)?),
        Commands::Public(PublicCommands::Toggle { user }) => {
            print_json(&service.toggle_public(&user)?)
        }
        Commands::Public(PublicCommands::Show { user }) => {
            print_json(&service.public_visibility(&user)?)
        }
        Commands::Public(PublicCommands::Books { public_id }) => {
            print_json(&service.public_books(&public_id)?)
        }
    }
}

fn run_book(shelf: &Shelf, command: BookCommands) -> Result<()> {
    let service = shelf.service();

    match command {
        BookCommands::Add {
            user,
            title,
            status,
            authors,
            pages,
            rating,
            favorite,
            genres,
            comment,
        } => {
            let mut entry = NewBook::new(title, status)
                .with_pages(pages)
                .with_rating(rating);
            entry.authors = authors;
            entry.genres = genres;
            entry.favorite = favorite;
            entry.comment = comment;
            print_json(&service.add_book(&user, entry)?)
        }
        BookCommands::Update {
            user,
            book,
            status,
            rating,
            comment,
            favorite,
        } => {
            let update = BookUpdate {
                status,
                rating,
                comment,
                favorite,
            };
            print_json(&service.update_book(&user, &book, update)?)
        }
        BookCommands::Remove { user, book } => print_json(&service.remove_book(&user, &book)?),
        BookCommands::List { user } => print_json(&service.list_books(&user)?),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
