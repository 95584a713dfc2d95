use std::path::Path;

use crate::commands::common::{
    book_labels, format_note_lines, note_to_list_item, open_database, NoteListItem,
};
use crate::error::CliError;

pub async fn run_notes(book: Option<&str>, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path)?;
    let books = db.list_books().await?;
    let notes = db.list_notes(book).await?;

    let labels = book_labels(&books);
    let items = notes
        .iter()
        .map(|note| note_to_list_item(note, &labels))
        .collect::<Vec<NoteListItem>>();

    if as_json {
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        for line in format_note_lines(&items) {
            println!("{line}");
        }
    }

    Ok(())
}
