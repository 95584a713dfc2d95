use std::path::Path;

use quire_core::actions::Mutation;
use quire_core::{DatabaseService, Error};

use crate::commands::common::{open_database, resolve_note_content};
use crate::error::CliError;

pub async fn run_add(
    book: &str,
    content_parts: &[String],
    public: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let content = resolve_note_content(content_parts)?;

    let db = open_database(db_path)?;
    let note_uuid = add_note(&db, book, content, public).await?;

    println!("{note_uuid}");
    Ok(())
}

/// Record a new note, first recording its book when the label is new.
/// Returns the note's uuid.
pub async fn add_note(
    db: &DatabaseService,
    book: &str,
    content: String,
    public: bool,
) -> Result<String, CliError> {
    let book = book.trim();
    let exists = db
        .list_books()
        .await?
        .iter()
        .any(|existing| existing.label == book);
    if !exists {
        db.record(Mutation::AddBook {
            label: book.to_string(),
        })
        .await?;
        tracing::info!("Created book '{book}'");
    }

    let action = db
        .record(Mutation::AddNote {
            book_label: book.to_string(),
            content,
            public,
        })
        .await?;

    action
        .payload()?
        .note_uuid()
        .map(ToString::to_string)
        .ok_or_else(|| {
            CliError::Core(Error::Database(format!(
                "action {} did not record a note",
                action.uuid
            )))
        })
}
