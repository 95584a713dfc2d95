use std::path::Path;

use quire_core::actions::Mutation;

use crate::commands::common::{normalize_note_identifier, open_database};
use crate::error::CliError;

pub async fn run_remove_note(uuid: &str, db_path: &Path) -> Result<(), CliError> {
    let uuid = normalize_note_identifier(uuid)?;
    let db = open_database(db_path)?;
    if db.get_note(&uuid).await?.is_none() {
        return Err(CliError::NoteNotFound(uuid));
    }

    db.record(Mutation::RemoveNote {
        note_uuid: uuid.clone(),
    })
    .await?;
    println!("{uuid}");
    Ok(())
}

pub async fn run_remove_book(label: &str, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path)?;
    let notes = db.list_notes(Some(label)).await?.len();

    db.record(Mutation::RemoveBook {
        label: label.to_string(),
    })
    .await?;
    println!("Removed book '{label}' and {notes} note(s)");
    Ok(())
}
