use std::path::Path;

use crate::commands::common::{book_to_list_item, format_book_lines, open_database, BookListItem};
use crate::error::CliError;

pub async fn run_books(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path)?;
    let books = db.list_books().await?;
    let notes = db.list_notes(None).await?;

    let items = books
        .iter()
        .map(|book| book_to_list_item(book, &notes))
        .collect::<Vec<BookListItem>>();

    if as_json {
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else if items.is_empty() {
        println!("No books yet. Add a note with `quire add <book> <content>`.");
    } else {
        for line in format_book_lines(&items) {
            println!("{line}");
        }
    }

    Ok(())
}
