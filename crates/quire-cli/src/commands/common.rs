use std::collections::HashMap;
use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::Utc;
use quire_core::{Book, DatabaseService, Note};
use serde::Serialize;

use crate::error::CliError;

pub const DB_PATH_ENV: &str = "QUIRE_DB_PATH";

#[derive(Debug, Serialize)]
pub struct BookListItem {
    pub uuid: String,
    pub label: String,
    pub usn: i64,
    pub note_count: usize,
}

#[derive(Debug, Serialize)]
pub struct NoteListItem {
    pub uuid: String,
    pub book: String,
    pub preview: String,
    pub content: String,
    pub public: bool,
    pub added_on: i64,
    pub edited_on: Option<i64>,
    pub relative_time: String,
    pub synced: bool,
}

pub fn open_database(path: &Path) -> Result<DatabaseService, CliError> {
    Ok(DatabaseService::open_path(path)?)
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = cli_db_path.or_else(|| env::var_os(DB_PATH_ENV).map(PathBuf::from)) {
        return Ok(path);
    }
    default_db_path()
}

pub fn default_db_path() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join("quire").join("quire.db"))
        .ok_or_else(|| {
            CliError::Config(format!(
                "could not resolve a data directory; pass --db-path or set {DB_PATH_ENV}"
            ))
        })
}

pub fn book_labels(books: &[Book]) -> HashMap<&str, &str> {
    books
        .iter()
        .map(|book| (book.uuid.as_str(), book.label.as_str()))
        .collect()
}

pub fn book_to_list_item(book: &Book, notes: &[Note]) -> BookListItem {
    BookListItem {
        uuid: book.uuid.clone(),
        label: book.label.clone(),
        usn: book.usn,
        note_count: notes
            .iter()
            .filter(|note| note.book_uuid == book.uuid)
            .count(),
    }
}

pub fn note_to_list_item(note: &Note, labels: &HashMap<&str, &str>) -> NoteListItem {
    let now_ms = Utc::now().timestamp_millis();
    NoteListItem {
        uuid: note.uuid.clone(),
        book: labels
            .get(note.book_uuid.as_str())
            .map_or_else(|| note.book_uuid.clone(), ToString::to_string),
        preview: note_preview(note, 80),
        content: note.content.clone(),
        public: note.public,
        added_on: note.added_on,
        edited_on: note.edited_on,
        relative_time: format_relative_time(note.last_touched(), now_ms),
        synced: note.usn > 0,
    }
}

pub fn format_book_lines(items: &[BookListItem]) -> Vec<String> {
    items
        .iter()
        .map(|item| {
            let notes = if item.note_count == 1 { "note" } else { "notes" };
            format!("{:<24}  {} {notes}", item.label, item.note_count)
        })
        .collect()
}

pub fn format_note_lines(items: &[NoteListItem]) -> Vec<String> {
    items
        .iter()
        .map(|item| {
            let short_id = item.uuid.chars().take(8).collect::<String>();
            let marker = if item.synced { ' ' } else { '*' };
            format!(
                "{short_id:<8}{marker} {:<16}  {:<40}  {}",
                item.book, item.preview, item.relative_time
            )
        })
        .collect()
}

pub fn note_preview(note: &Note, max_chars: usize) -> String {
    let first_line = note.title_preview(usize::MAX);
    let collapsed = first_line.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_sync_timestamp(timestamp_secs: i64) -> String {
    if timestamp_secs == 0 {
        return "never".to_string();
    }
    chrono::DateTime::from_timestamp(timestamp_secs, 0).map_or_else(
        || timestamp_secs.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

pub fn resolve_note_content(content_parts: &[String]) -> Result<String, CliError> {
    if let Some(content) = normalize_content(&content_parts.join(" ")) {
        return Ok(content);
    }

    if let Some(content) = read_piped_stdin()? {
        return Ok(content);
    }

    if let Some(content) = capture_editor_input()? {
        return Ok(content);
    }

    Err(CliError::EmptyContent)
}

pub fn normalize_content(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn normalize_note_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyNoteId)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_content(&buffer))
}

pub fn capture_editor_input() -> Result<Option<String>, CliError> {
    capture_editor_input_with_initial("")
}

pub fn capture_editor_input_with_initial(
    initial_content: &str,
) -> Result<Option<String>, CliError> {
    let editor = preferred_editor();
    let temp_file = create_temp_note_file_path();
    std::fs::write(&temp_file, initial_content)?;

    let launch_result = launch_editor(&editor, &temp_file);
    let note_content = std::fs::read_to_string(&temp_file)?;
    let _ = std::fs::remove_file(&temp_file);

    launch_result?;
    Ok(normalize_content(&note_content))
}

pub fn launch_editor(editor: &str, file_path: &Path) -> Result<(), CliError> {
    match Command::new(editor).arg(file_path).status() {
        Ok(status) => {
            if status.success() {
                Ok(())
            } else {
                Err(CliError::EditorFailed(format!(
                    "`{editor}` exited with status {status}"
                )))
            }
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            // EDITOR may carry arguments, e.g. "code --wait"
            let mut parts = editor.split_whitespace();
            let Some(program) = parts.next() else {
                return Err(CliError::EditorFailed("empty EDITOR command".into()));
            };

            let status = Command::new(program).args(parts).arg(file_path).status()?;
            if status.success() {
                Ok(())
            } else {
                Err(CliError::EditorFailed(format!(
                    "`{editor}` exited with status {status}"
                )))
            }
        }
        Err(err) => Err(CliError::Io(err)),
    }
}

pub fn preferred_editor() -> String {
    env::var("VISUAL")
        .or_else(|_| env::var("EDITOR"))
        .unwrap_or_else(|_| default_editor().to_string())
}

pub const fn default_editor() -> &'static str {
    if cfg!(windows) {
        "notepad"
    } else {
        "vi"
    }
}

pub fn create_temp_note_file_path() -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    env::temp_dir().join(format!("quire-note-{}-{now}.md", std::process::id()))
}
