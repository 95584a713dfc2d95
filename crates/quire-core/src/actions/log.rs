//! Append-only action log and local mutation recording

use rusqlite::{params, Connection, Transaction};

use super::reducer;
use crate::db::{BookRepository, NoteRepository, SqliteBookRepository, SqliteNoteRepository};
use crate::error::{Error, Result};
use crate::models::{
    Action, ActionPayload, ActionType, AddBookDataV2, AddNoteDataV3, EditNoteDataV3,
    RemoveBookDataV2, RemoveNoteDataV2,
};
use crate::util::{generate_uuid, normalize_text_option, timestamp_now_millis};

/// A user-initiated change to local state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    AddBook {
        label: String,
    },
    RemoveBook {
        label: String,
    },
    AddNote {
        book_label: String,
        content: String,
        public: bool,
    },
    /// Sparse edit; `None` fields stay as they are
    EditNote {
        note_uuid: String,
        content: Option<String>,
        public: Option<bool>,
        book_label: Option<String>,
    },
    RemoveNote {
        note_uuid: String,
    },
}

/// Record a mutation: build its current-schema action, apply it, and log it.
///
/// Both writes go through `tx`; dropping the transaction after an error
/// discards the state change together with the log entry.
pub fn record(tx: &Transaction<'_>, mutation: Mutation) -> Result<Action> {
    record_at(tx, mutation, timestamp_now_millis())
}

/// [`record`] with an explicit action timestamp (Unix ms)
pub fn record_at(tx: &Transaction<'_>, mutation: Mutation, timestamp: i64) -> Result<Action> {
    let payload = build_payload(tx, mutation)?;
    let action = Action::new(&payload, timestamp)?;

    reducer::apply(tx, &action)?;
    ActionLog::new(tx).append(&action)?;

    tracing::debug!(uuid = %action.uuid, action_type = %action.action_type, "recorded action");
    Ok(action)
}

fn build_payload(conn: &Connection, mutation: Mutation) -> Result<ActionPayload> {
    let books = SqliteBookRepository::new(conn);
    let notes = SqliteNoteRepository::new(conn);

    let payload = match mutation {
        Mutation::AddBook { label } => {
            let label = required_label(label)?;
            if books.find_by_label(&label)?.is_some() {
                return Err(Error::InvalidInput(format!("book '{label}' already exists")));
            }
            ActionPayload::AddBookV2(AddBookDataV2 {
                book_name: label,
                book_uuid: generate_uuid(),
            })
        }
        Mutation::RemoveBook { label } => ActionPayload::RemoveBookV2(RemoveBookDataV2 {
            book_uuid: books.uuid_for_label(&label)?,
        }),
        Mutation::AddNote {
            book_label,
            content,
            public,
        } => ActionPayload::AddNoteV3(AddNoteDataV3 {
            note_uuid: generate_uuid(),
            book_uuid: books.uuid_for_label(&book_label)?,
            content,
            public,
        }),
        Mutation::EditNote {
            note_uuid,
            content,
            public,
            book_label,
        } => {
            if notes.get(&note_uuid)?.is_none() {
                return Err(Error::NotFound(format!("note {note_uuid}")));
            }
            if content.is_none() && public.is_none() && book_label.is_none() {
                return Err(Error::InvalidInput("nothing to edit".to_string()));
            }
            let book_uuid = book_label
                .map(|label| books.uuid_for_label(&label))
                .transpose()?;
            ActionPayload::EditNoteV3(EditNoteDataV3 {
                note_uuid,
                book_uuid,
                content,
                public,
            })
        }
        Mutation::RemoveNote { note_uuid } => {
            if notes.get(&note_uuid)?.is_none() {
                return Err(Error::NotFound(format!("note {note_uuid}")));
            }
            ActionPayload::RemoveNoteV2(RemoveNoteDataV2 { note_uuid })
        }
    };

    debug_assert!(payload.is_current());
    Ok(payload)
}

fn required_label(label: String) -> Result<String> {
    let label = normalize_text_option(Some(label))
        .ok_or_else(|| Error::InvalidInput("book label cannot be empty".to_string()))?;
    if label.chars().any(char::is_whitespace) {
        return Err(Error::InvalidInput(format!(
            "book label '{label}' cannot contain whitespace"
        )));
    }
    Ok(label)
}

/// Read and write access to the `actions` table
pub struct ActionLog<'a> {
    conn: &'a Connection,
}

impl<'a> ActionLog<'a> {
    /// Create a new log view over the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Append an action; the log never reuses an action uuid
    pub fn append(&self, action: &Action) -> Result<()> {
        self.conn.execute(
            "INSERT INTO actions (uuid, schema, type, data, timestamp) VALUES (?, ?, ?, ?, ?)",
            params![
                action.uuid,
                action.schema,
                action.action_type.as_str(),
                action.data.to_string(),
                action.timestamp
            ],
        )?;
        Ok(())
    }

    /// All logged actions in recording order
    pub fn list(&self) -> Result<Vec<Action>> {
        self.query(
            "SELECT uuid, schema, type, data, timestamp FROM actions
             ORDER BY timestamp ASC, rowid ASC",
            params![],
        )
    }

    /// Logged actions of one type at one schema version
    pub fn list_by_schema(&self, action_type: ActionType, schema: i64) -> Result<Vec<Action>> {
        self.query(
            "SELECT uuid, schema, type, data, timestamp FROM actions
             WHERE type = ? AND schema = ?
             ORDER BY timestamp ASC, rowid ASC",
            params![action_type.as_str(), schema],
        )
    }

    /// Overwrite an action's payload and schema in place
    pub fn rewrite(&self, uuid: &str, payload: &ActionPayload) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE actions SET data = ?, schema = ? WHERE uuid = ?",
            params![payload.to_value()?.to_string(), payload.schema(), uuid],
        )?;
        if rows == 0 {
            return Err(Error::NotFound(format!("action {uuid}")));
        }
        Ok(())
    }

    pub fn count(&self) -> Result<usize> {
        Ok(self
            .conn
            .query_row("SELECT count(*) FROM actions", [], |row| row.get(0))?)
    }

    fn query(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<Action>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(uuid, schema, action_type, data, timestamp)| {
                Ok(Action {
                    uuid,
                    schema,
                    action_type: action_type.parse()?,
                    data: serde_json::from_str(&data)?,
                    timestamp,
                })
            })
            .collect()
    }
}
