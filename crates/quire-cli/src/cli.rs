use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "quire")]
#[command(about = "Keep books of notes offline and sync them with a server")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a note to a book, creating the book if needed
    #[command(alias = "new")]
    Add {
        /// Book label
        book: String,
        /// Note content (read from stdin or $EDITOR when omitted)
        content: Vec<String>,
        /// Mark the note as public
        #[arg(long)]
        public: bool,
    },
    /// Edit a note's content, book, or visibility
    Edit {
        /// Note uuid
        uuid: String,
        /// Replacement content (opens $EDITOR when no change is given)
        #[arg(short, long)]
        content: Option<String>,
        /// Move the note to this book
        #[arg(short, long, value_name = "LABEL")]
        book: Option<String>,
        /// Set visibility
        #[arg(long, value_name = "BOOL")]
        public: Option<bool>,
    },
    /// Remove a note or a whole book
    #[command(alias = "rm")]
    Remove {
        #[command(subcommand)]
        target: RemoveTarget,
    },
    /// List books
    Books {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List notes, newest first
    Notes {
        /// Only show notes in this book
        book: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Pull changes from the sync server
    Sync {
        /// Discard replicated state and pull everything again
        #[arg(long)]
        full: bool,
    },
    /// Upgrade logged actions to the current payload schema
    Upgrade,
    /// Show sync bookmark and local counts
    Status,
    /// Store a session key issued by the sync server
    Login {
        /// Session key
        #[arg(long, value_name = "KEY")]
        session_key: String,
        /// Expiry as a Unix timestamp in seconds
        #[arg(long, value_name = "SECS")]
        expires_at: Option<i64>,
        /// Cipher key for encrypted content
        #[arg(long, value_name = "KEY")]
        cipher_key: Option<String>,
    },
    /// Clear the stored session
    Logout,
}

#[derive(Subcommand)]
pub enum RemoveTarget {
    /// Remove one note
    Note {
        /// Note uuid
        uuid: String,
    },
    /// Remove a book and every note in it
    Book {
        /// Book label
        label: String,
    },
}
