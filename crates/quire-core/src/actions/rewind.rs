//! Rewinder: reverses the local effect of a single action
//!
//! Only additions have an inverse. Undoing a removal or an edit would need
//! the prior row state, which the action log does not keep, so those types
//! fail with [`Error::UnsupportedRewind`] before anything is written.

use rusqlite::{Connection, Transaction};

use crate::db::{BookRepository, NoteRepository, SqliteBookRepository, SqliteNoteRepository};
use crate::error::{Error, Result};
use crate::models::{Action, ActionPayload, ActionType};

/// Whether [`rewind`] has an inverse for the given action type
#[must_use]
pub const fn is_rewindable(action_type: ActionType) -> bool {
    matches!(action_type, ActionType::AddBook | ActionType::AddNote)
}

/// Undo `action` inside the caller's transaction.
pub fn rewind(tx: &Transaction<'_>, action: &Action) -> Result<()> {
    if !is_rewindable(action.action_type) {
        return Err(Error::UnsupportedRewind(action.action_type));
    }

    tracing::debug!(uuid = %action.uuid, action_type = %action.action_type, "rewinding action");

    let conn: &Connection = tx;
    match action.payload()? {
        ActionPayload::AddBookV1(data) => {
            let book = SqliteBookRepository::new(conn).find_by_label(&data.book_name)?;
            rewind_add_book(conn, book.map(|book| book.uuid))
        }
        ActionPayload::AddBookV2(data) => rewind_add_book(conn, Some(data.book_uuid)),
        ActionPayload::AddNoteV2(data) => rewind_add_note(conn, &data.note_uuid),
        ActionPayload::AddNoteV3(data) => rewind_add_note(conn, &data.note_uuid),
        ActionPayload::RemoveBookV1(_)
        | ActionPayload::RemoveBookV2(_)
        | ActionPayload::RemoveNoteV1(_)
        | ActionPayload::RemoveNoteV2(_)
        | ActionPayload::EditNoteV1(_)
        | ActionPayload::EditNoteV2(_)
        | ActionPayload::EditNoteV3(_) => Err(Error::UnsupportedRewind(action.action_type)),
    }
}

/// Delete the book the action created; an absent book is already undone.
///
/// v1 payloads only carry a label, so the caller resolves it first.
fn rewind_add_book(conn: &Connection, book_uuid: Option<String>) -> Result<()> {
    let Some(book_uuid) = book_uuid else {
        return Ok(());
    };
    let notes = SqliteBookRepository::new(conn).delete_with_notes(&book_uuid)?;
    tracing::debug!(%book_uuid, notes, "rewound add_book");
    Ok(())
}

fn rewind_add_note(conn: &Connection, note_uuid: &str) -> Result<()> {
    SqliteNoteRepository::new(conn).delete(note_uuid)?;
    Ok(())
}
