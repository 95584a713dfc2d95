use std::path::Path;

use quire_core::actions::Mutation;

use crate::commands::common::{
    capture_editor_input_with_initial, normalize_content, normalize_note_identifier, open_database,
};
use crate::error::CliError;

pub async fn run_edit(
    uuid: &str,
    content: Option<String>,
    book: Option<String>,
    public: Option<bool>,
    db_path: &Path,
) -> Result<(), CliError> {
    let uuid = normalize_note_identifier(uuid)?;
    let db = open_database(db_path)?;
    let note = db
        .get_note(&uuid)
        .await?
        .ok_or_else(|| CliError::NoteNotFound(uuid.clone()))?;

    let content = match content {
        Some(content) => Some(normalize_content(&content).ok_or(CliError::EmptyEditedContent)?),
        None if book.is_none() && public.is_none() => {
            let Some(edited) = capture_editor_input_with_initial(&note.content)? else {
                return Err(CliError::EmptyEditedContent);
            };
            if edited == note.content {
                println!("{}", note.uuid);
                return Ok(());
            }
            Some(edited)
        }
        None => None,
    };

    db.record(Mutation::EditNote {
        note_uuid: note.uuid.clone(),
        content,
        public,
        book_label: book,
    })
    .await?;

    println!("{}", note.uuid);
    Ok(())
}
