//! ShelfTrack - Personal Library Tracker
//!
//! Command-line entry point. Every command prints JSON on stdout.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use shelftrack::library::BookStatus;
use shelftrack::storage::config::{get_config_path, load_config};
use shelftrack::Shelf;

mod app;

#[derive(Parser)]
#[command(name = "shelftrack")]
#[command(about = "Personal library tracker with reading statistics and achievements")]
#[command(version)]
struct Cli {
    /// Path to the config file (defaults to config.toml in the data directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed the achievement catalog from a JSON file or the built-in catalog
    Seed {
        /// Seed document to load instead of the configured one
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// List every achievement definition
    Catalog,

    /// Manage users
    #[command(subcommand)]
    User(UserCommands),

    /// Manage books
    #[command(subcommand)]
    Book(BookCommands),

    /// Show a user's reading statistics
    Stats {
        #[arg(long)]
        user: Uuid,
    },

    /// Evaluate and list a user's achievements
    Achievements {
        #[arg(long)]
        user: Uuid,
    },

    /// Public sharing of a library
    #[command(subcommand)]
    Public(PublicCommands),
}

#[derive(Subcommand)]
enum UserCommands {
    /// Register a user
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
}

#[derive(Subcommand)]
enum BookCommands {
    /// Add a book to a user's library
    Add {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        title: String,
        /// to-read, reading or finished
        #[arg(long, default_value = "to-read")]
        status: BookStatus,
        /// Author; repeat for several
        #[arg(long = "author")]
        authors: Vec<String>,
        #[arg(long, default_value_t = 0)]
        pages: i64,
        #[arg(long, default_value_t = 0)]
        rating: u8,
        #[arg(long)]
        favorite: bool,
        /// Genre; repeat for several
        #[arg(long = "genre")]
        genres: Vec<String>,
        #[arg(long)]
        comment: Option<String>,
    },

    /// Edit a book
    Update {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        book: Uuid,
        #[arg(long)]
        status: Option<BookStatus>,
        #[arg(long)]
        rating: Option<u8>,
        #[arg(long)]
        comment: Option<String>,
        #[arg(long)]
        favorite: Option<bool>,
    },

    /// Remove a book
    Remove {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        book: Uuid,
    },

    /// List a user's books
    List {
        #[arg(long)]
        user: Uuid,
    },
}

#[derive(Subcommand)]
enum PublicCommands {
    /// Flip whether a library is shared
    Toggle {
        #[arg(long)]
        user: Uuid,
    },

    /// Show sharing state and public id
    Show {
        #[arg(long)]
        user: Uuid,
    },

    /// Show the books of a shared library
    Books {
        #[arg(long)]
        public_id: Uuid,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(get_config_path);
    let config = load_config(Some(config_path.as_path()))
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("Starting ShelfTrack v{}", env!("CARGO_PKG_VERSION"));

    let shelf = Shelf::start(&config).context("Failed to start library service")?;
    let outcome = app::run(&shelf, &config, cli.command);

    let delivered = shelf.shutdown()?;
    tracing::debug!(delivered, "Shut down");

    outcome
}
