//! Book and note repository implementations
//!
//! Repositories borrow a connection; pass a `Transaction` (which derefs to
//! `Connection`) when the writes must be part of a larger unit of work.

use crate::error::{Error, Result};
use crate::models::{Book, Note};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

/// Trait for book storage operations
pub trait BookRepository {
    /// Get a book by uuid
    fn get(&self, uuid: &str) -> Result<Option<Book>>;

    /// Find a book by its label
    fn find_by_label(&self, label: &str) -> Result<Option<Book>>;

    /// Resolve a label to a uuid, failing with [`Error::BookNotFound`]
    fn uuid_for_label(&self, label: &str) -> Result<String>;

    /// Whether a book with the uuid exists
    fn exists(&self, uuid: &str) -> Result<bool>;

    /// List books ordered by label
    fn list(&self) -> Result<Vec<Book>>;

    /// Insert a new book
    fn insert(&self, book: &Book) -> Result<()>;

    /// Insert the book, or overwrite every field of the row with the same uuid
    fn upsert(&self, book: &Book) -> Result<()>;

    /// Change a book's label
    fn rename(&self, uuid: &str, label: &str) -> Result<()>;

    /// Delete a book's notes, then the book. Returns the number of notes removed.
    fn delete_with_notes(&self, uuid: &str) -> Result<usize>;
}

/// Trait for note storage operations
pub trait NoteRepository {
    /// Get a note by uuid
    fn get(&self, uuid: &str) -> Result<Option<Note>>;

    /// List notes, newest first, optionally restricted to one book
    fn list(&self, book_uuid: Option<&str>) -> Result<Vec<Note>>;

    /// Whether a note with the uuid exists in the given book
    fn exists_in_book(&self, uuid: &str, book_uuid: &str) -> Result<bool>;

    /// Insert a new note
    fn insert(&self, note: &Note) -> Result<()>;

    /// Insert the note, or overwrite every field of the row with the same uuid
    fn upsert(&self, note: &Note) -> Result<()>;

    /// Write only the fields present in the patch. Returns rows changed.
    fn patch(&self, uuid: &str, patch: &NotePatch) -> Result<usize>;

    /// Delete a note by uuid. Returns whether a row was removed.
    fn delete(&self, uuid: &str) -> Result<bool>;
}

/// Sparse update of a note
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotePatch {
    pub book_uuid: Option<String>,
    pub content: Option<String>,
    pub public: Option<bool>,
    /// Always written
    pub edited_on: i64,
}

/// `SQLite` implementation of `BookRepository`
pub struct SqliteBookRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteBookRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a book from a database row
    fn parse_book(row: &rusqlite::Row<'_>) -> rusqlite::Result<Book> {
        Ok(Book {
            uuid: row.get(0)?,
            label: row.get(1)?,
            usn: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
            deleted: row.get(5)?,
        })
    }
}

const BOOK_COLUMNS: &str = "uuid, label, usn, created_at, updated_at, deleted";

impl BookRepository for SqliteBookRepository<'_> {
    fn get(&self, uuid: &str) -> Result<Option<Book>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {BOOK_COLUMNS} FROM books WHERE uuid = ?"),
                [uuid],
                Self::parse_book,
            )
            .optional()?)
    }

    fn find_by_label(&self, label: &str) -> Result<Option<Book>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {BOOK_COLUMNS} FROM books WHERE label = ?"),
                [label],
                Self::parse_book,
            )
            .optional()?)
    }

    fn uuid_for_label(&self, label: &str) -> Result<String> {
        self.conn
            .query_row("SELECT uuid FROM books WHERE label = ?", [label], |row| {
                row.get(0)
            })
            .optional()?
            .ok_or_else(|| Error::BookNotFound(label.to_string()))
    }

    fn exists(&self, uuid: &str) -> Result<bool> {
        Ok(self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM books WHERE uuid = ?)",
            [uuid],
            |row| row.get(0),
        )?)
    }

    fn list(&self) -> Result<Vec<Book>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {BOOK_COLUMNS} FROM books ORDER BY label ASC"))?;

        let books = stmt
            .query_map([], Self::parse_book)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(books)
    }

    fn insert(&self, book: &Book) -> Result<()> {
        self.conn.execute(
            "INSERT INTO books (uuid, label, usn, created_at, updated_at, deleted)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                book.uuid,
                book.label,
                book.usn,
                book.created_at,
                book.updated_at,
                book.deleted
            ],
        )?;
        Ok(())
    }

    fn upsert(&self, book: &Book) -> Result<()> {
        self.conn.execute(
            "INSERT INTO books (uuid, label, usn, created_at, updated_at, deleted)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(uuid) DO UPDATE SET
                label = excluded.label,
                usn = excluded.usn,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at,
                deleted = excluded.deleted",
            params![
                book.uuid,
                book.label,
                book.usn,
                book.created_at,
                book.updated_at,
                book.deleted
            ],
        )?;
        Ok(())
    }

    fn rename(&self, uuid: &str, label: &str) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE books SET label = ? WHERE uuid = ?",
            params![label, uuid],
        )?;
        if rows == 0 {
            return Err(Error::BookNotFound(uuid.to_string()));
        }
        Ok(())
    }

    fn delete_with_notes(&self, uuid: &str) -> Result<usize> {
        let notes = self
            .conn
            .execute("DELETE FROM notes WHERE book_uuid = ?", [uuid])?;
        self.conn.execute("DELETE FROM books WHERE uuid = ?", [uuid])?;
        Ok(notes)
    }
}

/// `SQLite` implementation of `NoteRepository`
pub struct SqliteNoteRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteNoteRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a note from a database row
    fn parse_note(row: &rusqlite::Row<'_>) -> rusqlite::Result<Note> {
        Ok(Note {
            uuid: row.get(0)?,
            book_uuid: row.get(1)?,
            usn: row.get(2)?,
            content: row.get(3)?,
            added_on: row.get(4)?,
            edited_on: row.get(5)?,
            public: row.get(6)?,
            deleted: row.get(7)?,
        })
    }
}

const NOTE_COLUMNS: &str = "uuid, book_uuid, usn, content, added_on, edited_on, public, deleted";

impl NoteRepository for SqliteNoteRepository<'_> {
    fn get(&self, uuid: &str) -> Result<Option<Note>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE uuid = ?"),
                [uuid],
                Self::parse_note,
            )
            .optional()?)
    }

    fn list(&self, book_uuid: Option<&str>) -> Result<Vec<Note>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {NOTE_COLUMNS}
             FROM notes
             WHERE ?1 IS NULL OR book_uuid = ?1
             ORDER BY added_on DESC, uuid ASC"
        ))?;

        let notes = stmt
            .query_map([book_uuid], Self::parse_note)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(notes)
    }

    fn exists_in_book(&self, uuid: &str, book_uuid: &str) -> Result<bool> {
        Ok(self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM notes WHERE uuid = ? AND book_uuid = ?)",
            [uuid, book_uuid],
            |row| row.get(0),
        )?)
    }

    fn insert(&self, note: &Note) -> Result<()> {
        self.conn.execute(
            "INSERT INTO notes (uuid, book_uuid, usn, content, added_on, edited_on, public, deleted)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                note.uuid,
                note.book_uuid,
                note.usn,
                note.content,
                note.added_on,
                note.edited_on,
                note.public,
                note.deleted
            ],
        )?;
        Ok(())
    }

    fn upsert(&self, note: &Note) -> Result<()> {
        self.conn.execute(
            "INSERT INTO notes (uuid, book_uuid, usn, content, added_on, edited_on, public, deleted)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(uuid) DO UPDATE SET
                book_uuid = excluded.book_uuid,
                usn = excluded.usn,
                content = excluded.content,
                added_on = excluded.added_on,
                edited_on = excluded.edited_on,
                public = excluded.public,
                deleted = excluded.deleted",
            params![
                note.uuid,
                note.book_uuid,
                note.usn,
                note.content,
                note.added_on,
                note.edited_on,
                note.public,
                note.deleted
            ],
        )?;
        Ok(())
    }

    fn patch(&self, uuid: &str, patch: &NotePatch) -> Result<usize> {
        let mut assignments = vec!["edited_on = ?"];
        let mut values = vec![Value::Integer(patch.edited_on)];

        if let Some(content) = &patch.content {
            assignments.push("content = ?");
            values.push(Value::Text(content.clone()));
        }
        if let Some(public) = patch.public {
            assignments.push("public = ?");
            values.push(Value::Integer(i64::from(public)));
        }
        if let Some(book_uuid) = &patch.book_uuid {
            assignments.push("book_uuid = ?");
            values.push(Value::Text(book_uuid.clone()));
        }
        values.push(Value::Text(uuid.to_string()));

        let sql = format!("UPDATE notes SET {} WHERE uuid = ?", assignments.join(", "));
        Ok(self.conn.execute(&sql, params_from_iter(values))?)
    }

    fn delete(&self, uuid: &str) -> Result<bool> {
        let rows = self.conn.execute("DELETE FROM notes WHERE uuid = ?", [uuid])?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use pretty_assertions::assert_eq;

    fn setup() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn note(uuid: &str, book_uuid: &str, content: &str, added_on: i64) -> Note {
        Note {
            uuid: uuid.to_string(),
            book_uuid: book_uuid.to_string(),
            usn: 0,
            content: content.to_string(),
            added_on,
            edited_on: None,
            public: false,
            deleted: false,
        }
    }

    #[test]
    fn test_insert_and_find_book() {
        let db = setup();
        let repo = SqliteBookRepository::new(db.connection());

        let book = Book::with_uuid("b1", "work");
        repo.insert(&book).unwrap();

        assert_eq!(repo.get("b1").unwrap(), Some(book.clone()));
        assert_eq!(repo.find_by_label("work").unwrap(), Some(book));
        assert_eq!(repo.uuid_for_label("work").unwrap(), "b1");
        assert!(repo.exists("b1").unwrap());
    }

    #[test]
    fn test_uuid_for_missing_label() {
        let db = setup();
        let repo = SqliteBookRepository::new(db.connection());

        let error = repo.uuid_for_label("nope").unwrap_err();
        assert!(matches!(error, Error::BookNotFound(label) if label == "nope"));
    }

    #[test]
    fn test_book_labels_unique() {
        let db = setup();
        let repo = SqliteBookRepository::new(db.connection());

        repo.insert(&Book::new("work")).unwrap();
        assert!(repo.insert(&Book::new("work")).is_err());
    }

    #[test]
    fn test_upsert_book_overwrites() {
        let db = setup();
        let repo = SqliteBookRepository::new(db.connection());

        repo.upsert(&Book::with_uuid("b1", "work")).unwrap();
        let mut renamed = Book::with_uuid("b1", "job");
        renamed.usn = 9;
        repo.upsert(&renamed).unwrap();

        let books = repo.list().unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].label, "job");
        assert_eq!(books[0].usn, 9);
    }

    #[test]
    fn test_delete_with_notes() {
        let db = setup();
        let books = SqliteBookRepository::new(db.connection());
        let notes = SqliteNoteRepository::new(db.connection());

        books.insert(&Book::with_uuid("b1", "work")).unwrap();
        books.insert(&Book::with_uuid("b2", "home")).unwrap();
        notes.insert(&note("n1", "b1", "a", 1)).unwrap();
        notes.insert(&note("n2", "b1", "b", 2)).unwrap();
        notes.insert(&note("n3", "b2", "c", 3)).unwrap();

        assert_eq!(books.delete_with_notes("b1").unwrap(), 2);
        assert!(!books.exists("b1").unwrap());
        assert_eq!(notes.list(None).unwrap().len(), 1);
        assert_eq!(books.delete_with_notes("b1").unwrap(), 0);
    }

    #[test]
    fn test_note_requires_existing_book() {
        let db = setup();
        let notes = SqliteNoteRepository::new(db.connection());

        assert!(notes.insert(&note("n1", "missing", "a", 1)).is_err());
    }

    #[test]
    fn test_list_notes_by_book_newest_first() {
        let db = setup();
        let books = SqliteBookRepository::new(db.connection());
        let notes = SqliteNoteRepository::new(db.connection());

        books.insert(&Book::with_uuid("b1", "work")).unwrap();
        books.insert(&Book::with_uuid("b2", "home")).unwrap();
        notes.insert(&note("n1", "b1", "old", 1)).unwrap();
        notes.insert(&note("n2", "b1", "new", 5)).unwrap();
        notes.insert(&note("n3", "b2", "other", 3)).unwrap();

        let listed = notes.list(Some("b1")).unwrap();
        let uuids = listed.iter().map(|n| n.uuid.as_str()).collect::<Vec<_>>();
        assert_eq!(uuids, vec!["n2", "n1"]);
        assert_eq!(notes.list(None).unwrap().len(), 3);
    }

    #[test]
    fn test_patch_writes_only_present_fields() {
        let db = setup();
        let books = SqliteBookRepository::new(db.connection());
        let notes = SqliteNoteRepository::new(db.connection());

        books.insert(&Book::with_uuid("b1", "work")).unwrap();
        notes.insert(&note("n1", "b1", "A", 1)).unwrap();

        let changed = notes
            .patch(
                "n1",
                &NotePatch {
                    public: Some(true),
                    edited_on: 50,
                    ..NotePatch::default()
                },
            )
            .unwrap();
        assert_eq!(changed, 1);

        let patched = notes.get("n1").unwrap().unwrap();
        assert_eq!(patched.content, "A");
        assert!(patched.public);
        assert_eq!(patched.edited_on, Some(50));
    }

    #[test]
    fn test_delete_note_reports_absence() {
        let db = setup();
        let books = SqliteBookRepository::new(db.connection());
        let notes = SqliteNoteRepository::new(db.connection());

        books.insert(&Book::with_uuid("b1", "work")).unwrap();
        notes.insert(&note("n1", "b1", "A", 1)).unwrap();

        assert!(notes.delete("n1").unwrap());
        assert!(!notes.delete("n1").unwrap());
    }
}
