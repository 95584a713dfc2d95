//! Quire CLI - books of notes on the command line, synced with a server
//!
//! Every change is recorded as an action in the local log and applied to the
//! local replica immediately; `quire sync` pulls what other clients did.

mod cli;
mod commands;
mod error;


use clap::Parser;

use crate::cli::{Cli, Commands, RemoveTarget};
use crate::commands::add::run_add;
use crate::commands::books::run_books;
use crate::commands::common::resolve_db_path;
use crate::commands::edit::run_edit;
use crate::commands::notes::run_notes;
use crate::commands::remove::{run_remove_book, run_remove_note};
use crate::commands::session::{run_login, run_logout, run_status};
use crate::commands::sync::{run_sync, run_upgrade};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let directive: tracing_subscriber::filter::Directive = "quire=info"
        .parse()
        .map_err(|error| CliError::Config(format!("invalid log directive: {error}")))?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(directive))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path)?;

    match cli.command {
        Commands::Add {
            book,
            content,
            public,
        } => run_add(&book, &content, public, &db_path).await,
        Commands::Edit {
            uuid,
            content,
            book,
            public,
        } => run_edit(&uuid, content, book, public, &db_path).await,
        Commands::Remove { target } => match target {
            RemoveTarget::Note { uuid } => run_remove_note(&uuid, &db_path).await,
            RemoveTarget::Book { label } => run_remove_book(&label, &db_path).await,
        },
        Commands::Books { json } => run_books(json, &db_path).await,
        Commands::Notes { book, json } => run_notes(book.as_deref(), json, &db_path).await,
        Commands::Sync { full } => run_sync(full, &db_path).await,
        Commands::Upgrade => run_upgrade(&db_path).await,
        Commands::Status => run_status(&db_path).await,
        Commands::Login {
            session_key,
            expires_at,
            cipher_key,
        } => run_login(&session_key, expires_at, cipher_key.as_deref(), &db_path).await,
        Commands::Logout => run_logout(&db_path).await,
    }
}
