//! Reducer: applies one action to the local book and note tables
//!
//! The same transition function plays local actions at record time and
//! remote actions echoed back by the server, so every handler must be
//! idempotent under at-least-once delivery.

use rusqlite::{Connection, Transaction};

use crate::db::{
    BookRepository, NotePatch, NoteRepository, SqliteBookRepository, SqliteNoteRepository,
};
use crate::error::{Error, Result};
use crate::models::{Action, ActionPayload, Book, Note};

/// Apply an action inside the caller's transaction.
///
/// Never commits or rolls back; a returned error leaves the caller to drop
/// the transaction.
pub fn apply(tx: &Transaction<'_>, action: &Action) -> Result<()> {
    tracing::debug!(
        uuid = %action.uuid,
        action_type = %action.action_type,
        schema = action.schema,
        timestamp = action.timestamp,
        "playing action"
    );

    let conn: &Connection = tx;
    let ts = action.timestamp;

    match action.payload()? {
        ActionPayload::AddBookV1(data) => play_add_book(conn, &data.book_name, None, ts),
        ActionPayload::AddBookV2(data) => {
            play_add_book(conn, &data.book_name, Some(data.book_uuid), ts)
        }
        ActionPayload::RemoveBookV1(data) => {
            let book = SqliteBookRepository::new(conn).find_by_label(&data.book_name)?;
            play_remove_book(conn, book.map(|book| book.uuid))
        }
        ActionPayload::RemoveBookV2(data) => {
            let exists = SqliteBookRepository::new(conn).exists(&data.book_uuid)?;
            play_remove_book(conn, exists.then_some(data.book_uuid))
        }
        ActionPayload::AddNoteV2(data) => {
            let book_uuid = SqliteBookRepository::new(conn).uuid_for_label(&data.book_name)?;
            play_add_note(conn, data.note_uuid, book_uuid, data.content, data.public, ts)
        }
        ActionPayload::AddNoteV3(data) => {
            let book_uuid = existing_book(conn, data.book_uuid)?;
            play_add_note(conn, data.note_uuid, book_uuid, data.content, data.public, ts)
        }
        ActionPayload::RemoveNoteV1(data) => play_remove_note(conn, &data.note_uuid),
        ActionPayload::RemoveNoteV2(data) => play_remove_note(conn, &data.note_uuid),
        ActionPayload::EditNoteV1(data) => play_edit_note(
            conn,
            &data.note_uuid,
            &NotePatch {
                content: Some(data.content),
                // v1 edits always unpublished the note
                public: Some(false),
                edited_on: ts,
                ..NotePatch::default()
            },
        ),
        ActionPayload::EditNoteV2(data) => {
            let book_uuid = data
                .to_book
                .map(|label| SqliteBookRepository::new(conn).uuid_for_label(&label))
                .transpose()?;
            play_edit_note(
                conn,
                &data.note_uuid,
                &NotePatch {
                    book_uuid,
                    content: data.content,
                    public: data.public,
                    edited_on: ts,
                },
            )
        }
        ActionPayload::EditNoteV3(data) => {
            let book_uuid = data
                .book_uuid
                .map(|uuid| existing_book(conn, uuid))
                .transpose()?;
            play_edit_note(
                conn,
                &data.note_uuid,
                &NotePatch {
                    book_uuid,
                    content: data.content,
                    public: data.public,
                    edited_on: ts,
                },
            )
        }
    }
}

fn existing_book(conn: &Connection, book_uuid: String) -> Result<String> {
    if SqliteBookRepository::new(conn).exists(&book_uuid)? {
        Ok(book_uuid)
    } else {
        Err(Error::BookNotFound(book_uuid))
    }
}

fn play_add_book(conn: &Connection, label: &str, uuid: Option<String>, ts: i64) -> Result<()> {
    let books = SqliteBookRepository::new(conn);

    if books.find_by_label(label)?.is_some() {
        // A previous delivery was applied but the bookmark did not advance
        tracing::debug!(label, "book already exists, skipping add_book");
        return Ok(());
    }

    let mut book = match uuid {
        Some(uuid) => Book::with_uuid(uuid, label),
        None => Book::new(label),
    };
    book.created_at = ts;
    book.updated_at = ts;
    books.insert(&book)
}

fn play_remove_book(conn: &Connection, book_uuid: Option<String>) -> Result<()> {
    let Some(book_uuid) = book_uuid else {
        // Already removed elsewhere; last remove wins
        tracing::debug!("book no longer exists, skipping remove_book");
        return Ok(());
    };

    let removed_notes = SqliteBookRepository::new(conn).delete_with_notes(&book_uuid)?;
    tracing::debug!(%book_uuid, removed_notes, "removed book");
    Ok(())
}

fn play_add_note(
    conn: &Connection,
    note_uuid: String,
    book_uuid: String,
    content: String,
    public: bool,
    ts: i64,
) -> Result<()> {
    let notes = SqliteNoteRepository::new(conn);

    if notes.exists_in_book(&note_uuid, &book_uuid)? {
        tracing::debug!(%note_uuid, "note already exists, skipping add_note");
        return Ok(());
    }

    notes.insert(&Note {
        uuid: note_uuid,
        book_uuid,
        usn: 0,
        content,
        added_on: ts,
        edited_on: None,
        public,
        deleted: false,
    })
}

fn play_remove_note(conn: &Connection, note_uuid: &str) -> Result<()> {
    if !SqliteNoteRepository::new(conn).delete(note_uuid)? {
        tracing::debug!(note_uuid, "note already absent, skipping remove_note");
    }
    Ok(())
}

fn play_edit_note(conn: &Connection, note_uuid: &str, patch: &NotePatch) -> Result<()> {
    if SqliteNoteRepository::new(conn).patch(note_uuid, patch)? == 0 {
        tracing::debug!(note_uuid, "note absent, skipping edit_note");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionLog;
    use crate::db::Database;
    use crate::models::ActionType;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn setup() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn action(action_type: ActionType, schema: i64, data: Value, timestamp: i64) -> Action {
        Action {
            uuid: format!("{action_type}-{timestamp}"),
            schema,
            action_type,
            data,
            timestamp,
        }
    }

    fn play(db: &mut Database, action: &Action) -> Result<()> {
        let tx = db.transaction()?;
        apply(&tx, action)?;
        tx.commit()?;
        Ok(())
    }

    fn books(db: &Database) -> Vec<Book> {
        SqliteBookRepository::new(db.connection()).list().unwrap()
    }

    fn notes(db: &Database) -> Vec<Note> {
        SqliteNoteRepository::new(db.connection()).list(None).unwrap()
    }

    fn seed_book(db: &mut Database, uuid: &str, label: &str) {
        play(
            db,
            &action(
                ActionType::AddBook,
                2,
                json!({"book_name": label, "book_uuid": uuid}),
                1,
            ),
        )
        .unwrap();
    }

    fn seed_note(db: &mut Database, uuid: &str, book_uuid: &str, content: &str) {
        play(
            db,
            &action(
                ActionType::AddNote,
                3,
                json!({
                    "note_uuid": uuid,
                    "book_uuid": book_uuid,
                    "content": content,
                    "public": false
                }),
                2,
            ),
        )
        .unwrap();
    }

    #[test]
    fn add_book_v1_generates_uuid() {
        let mut db = setup();
        play(
            &mut db,
            &action(ActionType::AddBook, 1, json!({"book_name": "work"}), 10),
        )
        .unwrap();

        let books = books(&db);
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].label, "work");
        assert!(!books[0].uuid.is_empty());
        assert_eq!(books[0].created_at, 10);
    }

    #[test]
    fn add_book_twice_is_noop() {
        let mut db = setup();
        let add = action(
            ActionType::AddBook,
            2,
            json!({"book_name": "work", "book_uuid": "b1"}),
            10,
        );
        play(&mut db, &add).unwrap();
        let before = books(&db);

        play(&mut db, &add).unwrap();
        assert_eq!(books(&db), before);
    }

    #[test]
    fn add_book_with_existing_label_keeps_first_book() {
        let mut db = setup();
        seed_book(&mut db, "b1", "work");
        play(
            &mut db,
            &action(
                ActionType::AddBook,
                2,
                json!({"book_name": "work", "book_uuid": "b2"}),
                5,
            ),
        )
        .unwrap();

        let books = books(&db);
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].uuid, "b1");
    }

    #[test]
    fn add_note_twice_is_noop() {
        let mut db = setup();
        seed_book(&mut db, "b1", "work");
        let add = action(
            ActionType::AddNote,
            3,
            json!({"note_uuid": "n1", "book_uuid": "b1", "content": "hi", "public": false}),
            20,
        );

        play(&mut db, &add).unwrap();
        play(&mut db, &add).unwrap();

        let notes = notes(&db);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].content, "hi");
        assert_eq!(notes[0].added_on, 20);
    }

    #[test]
    fn add_note_v2_resolves_book_label() {
        let mut db = setup();
        seed_book(&mut db, "b1", "work");
        play(
            &mut db,
            &action(
                ActionType::AddNote,
                2,
                json!({"note_uuid": "n1", "book_name": "work", "content": "hi", "public": true}),
                20,
            ),
        )
        .unwrap();

        let notes = notes(&db);
        assert_eq!(notes[0].book_uuid, "b1");
        assert!(notes[0].public);
    }

    #[test]
    fn add_note_to_missing_book_fails_and_rolls_back() {
        let mut db = setup();
        let error = play(
            &mut db,
            &action(
                ActionType::AddNote,
                2,
                json!({"note_uuid": "n1", "book_name": "ghost", "content": "hi", "public": false}),
                20,
            ),
        )
        .unwrap_err();

        assert!(matches!(error, Error::BookNotFound(label) if label == "ghost"));
        assert!(notes(&db).is_empty());
    }

    #[test]
    fn remove_book_removes_its_notes() {
        let mut db = setup();
        seed_book(&mut db, "b1", "work");
        seed_book(&mut db, "b2", "home");
        seed_note(&mut db, "n1", "b1", "one");
        seed_note(&mut db, "n2", "b1", "two");
        seed_note(&mut db, "n3", "b2", "three");

        play(
            &mut db,
            &action(ActionType::RemoveBook, 2, json!({"book_uuid": "b1"}), 30),
        )
        .unwrap();

        let remaining = books(&db);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].uuid, "b2");
        let notes = notes(&db);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].uuid, "n3");
    }

    #[test]
    fn remove_book_already_removed_is_noop() {
        let mut db = setup();
        seed_book(&mut db, "b1", "work");
        let remove_v1 = action(ActionType::RemoveBook, 1, json!({"book_name": "work"}), 30);
        let remove_v2 = action(ActionType::RemoveBook, 2, json!({"book_uuid": "b1"}), 31);

        play(&mut db, &remove_v1).unwrap();
        play(&mut db, &remove_v1).unwrap();
        play(&mut db, &remove_v2).unwrap();
        assert!(books(&db).is_empty());
    }

    #[test]
    fn cascade_failure_leaves_book_and_notes() {
        let mut db = setup();
        seed_book(&mut db, "b1", "work");
        seed_note(&mut db, "n1", "b1", "one");
        seed_note(&mut db, "n2", "b1", "two");
        db.connection()
            .execute_batch(
                "CREATE TRIGGER fail_second_note BEFORE DELETE ON notes
                 WHEN OLD.uuid = 'n2'
                 BEGIN SELECT RAISE(ABORT, 'cannot delete n2'); END",
            )
            .unwrap();

        let result = play(
            &mut db,
            &action(ActionType::RemoveBook, 2, json!({"book_uuid": "b1"}), 30),
        );

        assert!(result.is_err());
        assert_eq!(books(&db).len(), 1);
        assert_eq!(notes(&db).len(), 2);
    }

    #[test]
    fn remove_note_absent_is_noop() {
        let mut db = setup();
        seed_book(&mut db, "b1", "work");
        seed_note(&mut db, "n1", "b1", "one");
        let remove = action(ActionType::RemoveNote, 2, json!({"note_uuid": "n1"}), 40);

        play(&mut db, &remove).unwrap();
        play(&mut db, &remove).unwrap();
        play(
            &mut db,
            &action(
                ActionType::RemoveNote,
                1,
                json!({"note_uuid": "n1", "book_name": "work"}),
                41,
            ),
        )
        .unwrap();
        assert!(notes(&db).is_empty());
    }

    #[test]
    fn edit_note_is_sparse_patch() {
        let mut db = setup();
        seed_book(&mut db, "b1", "work");
        seed_note(&mut db, "n1", "b1", "A");

        play(
            &mut db,
            &action(
                ActionType::EditNote,
                3,
                json!({"note_uuid": "n1", "public": true}),
                50,
            ),
        )
        .unwrap();

        let note = SqliteNoteRepository::new(db.connection())
            .get("n1")
            .unwrap()
            .unwrap();
        assert_eq!(note.content, "A");
        assert!(note.public);
        assert_eq!(note.book_uuid, "b1");
        assert_eq!(note.edited_on, Some(50));
    }

    #[test]
    fn edit_note_v1_replays_like_its_upgraded_form() {
        let edit_v1 = action(
            ActionType::EditNote,
            1,
            json!({"note_uuid": "n1", "from_book": "work", "content": "B"}),
            70,
        );
        let seeded = || {
            let mut db = setup();
            seed_book(&mut db, "b1", "work");
            seed_note(&mut db, "n1", "b1", "A");
            play(
                &mut db,
                &action(
                    ActionType::EditNote,
                    3,
                    json!({"note_uuid": "n1", "public": true}),
                    50,
                ),
            )
            .unwrap();
            db
        };

        let mut direct = seeded();
        play(&mut direct, &edit_v1).unwrap();

        let mut upgraded = seeded();
        let tx = upgraded.transaction().unwrap();
        ActionLog::new(&tx).append(&edit_v1).unwrap();
        crate::actions::migrate(&tx).unwrap();
        let migrated = ActionLog::new(&tx)
            .list()
            .unwrap()
            .into_iter()
            .find(|logged| logged.uuid == edit_v1.uuid)
            .unwrap();
        apply(&tx, &migrated).unwrap();
        tx.commit().unwrap();

        assert_eq!(migrated.schema, 3);
        assert_eq!(notes(&direct), notes(&upgraded));
        assert!(!notes(&direct)[0].public);
        assert_eq!(notes(&direct)[0].content, "B");
    }

    #[test]
    fn edit_note_v2_moves_note_by_label() {
        let mut db = setup();
        seed_book(&mut db, "b1", "work");
        seed_book(&mut db, "b2", "home");
        seed_note(&mut db, "n1", "b1", "A");

        play(
            &mut db,
            &action(
                ActionType::EditNote,
                2,
                json!({"note_uuid": "n1", "from_book": "work", "to_book": "home", "content": "B"}),
                60,
            ),
        )
        .unwrap();

        let note = SqliteNoteRepository::new(db.connection())
            .get("n1")
            .unwrap()
            .unwrap();
        assert_eq!(note.book_uuid, "b2");
        assert_eq!(note.content, "B");
        assert!(!note.public);
    }

    #[test]
    fn edit_note_to_missing_book_fails() {
        let mut db = setup();
        seed_book(&mut db, "b1", "work");
        seed_note(&mut db, "n1", "b1", "A");

        let error = play(
            &mut db,
            &action(
                ActionType::EditNote,
                3,
                json!({"note_uuid": "n1", "book_uuid": "ghost", "content": "B"}),
                60,
            ),
        )
        .unwrap_err();

        assert!(matches!(error, Error::BookNotFound(_)));
        let note = SqliteNoteRepository::new(db.connection())
            .get("n1")
            .unwrap()
            .unwrap();
        assert_eq!(note.content, "A");
    }

    #[test]
    fn edit_note_replay_is_idempotent() {
        let mut db = setup();
        seed_book(&mut db, "b1", "work");
        seed_note(&mut db, "n1", "b1", "A");
        let edit = action(
            ActionType::EditNote,
            1,
            json!({"note_uuid": "n1", "from_book": "work", "content": "B"}),
            70,
        );

        play(&mut db, &edit).unwrap();
        let once = notes(&db);
        play(&mut db, &edit).unwrap();
        assert_eq!(notes(&db), once);
    }

    #[test]
    fn unsupported_schema_fails_before_writing() {
        let mut db = setup();
        let error = play(
            &mut db,
            &action(ActionType::AddBook, 9, json!({"book_name": "work"}), 1),
        )
        .unwrap_err();

        assert!(matches!(error, Error::UnsupportedSchema { schema: 9, .. }));
        assert!(books(&db).is_empty());
    }
}
