//! Shared database service wrapper used across clients.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use crate::actions::{self, ActionLog, Mutation};
use crate::db::{
    BookRepository, BookmarkStore, Database, NoteRepository, SqliteBookRepository,
    SqliteNoteRepository,
};
use crate::models::{Action, Book, Bookmark, Note};
use crate::Result;

/// Single-writer handle to the local replica.
///
/// Every unit of work (recording an action, applying a fragment, upgrading
/// the log) runs while holding the one lock.
#[derive(Clone)]
pub struct DatabaseService {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
}

impl DatabaseService {
    /// Open a database service at the given filesystem path.
    pub fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        let db = Database::open(&db_path)?;
        tracing::debug!("Opened local replica at {}", db_path.display());
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: Some(db_path),
        })
    }

    /// Open an in-memory database service (primarily for tests).
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            db: Arc::new(Mutex::new(Database::open_in_memory()?)),
            db_path: None,
        })
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, Database> {
        self.db.lock().await
    }

    /// Record a local mutation as one atomic unit.
    pub async fn record(&self, mutation: Mutation) -> Result<Action> {
        let mut db = self.db.lock().await;
        let tx = db.transaction()?;
        let action = actions::record(&tx, mutation)?;
        tx.commit()?;
        Ok(action)
    }

    /// Rewrite every logged action to its current schema.
    pub async fn upgrade_actions(&self) -> Result<usize> {
        let mut db = self.db.lock().await;
        let tx = db.transaction()?;
        let rewritten = actions::migrate(&tx)?;
        tx.commit()?;
        Ok(rewritten)
    }

    /// List books ordered by label.
    pub async fn list_books(&self) -> Result<Vec<Book>> {
        let db = self.db.lock().await;
        SqliteBookRepository::new(db.connection()).list()
    }

    /// List notes newest-first, optionally limited to one book.
    pub async fn list_notes(&self, book_label: Option<&str>) -> Result<Vec<Note>> {
        let db = self.db.lock().await;
        let book_uuid = book_label
            .map(|label| SqliteBookRepository::new(db.connection()).uuid_for_label(label))
            .transpose()?;
        SqliteNoteRepository::new(db.connection()).list(book_uuid.as_deref())
    }

    /// Fetch a note by uuid.
    pub async fn get_note(&self, uuid: &str) -> Result<Option<Note>> {
        let db = self.db.lock().await;
        SqliteNoteRepository::new(db.connection()).get(uuid)
    }

    /// All logged actions in recording order.
    pub async fn list_actions(&self) -> Result<Vec<Action>> {
        let db = self.db.lock().await;
        ActionLog::new(db.connection()).list()
    }

    pub async fn bookmark(&self) -> Result<Bookmark> {
        let db = self.db.lock().await;
        BookmarkStore::new(db.connection()).load()
    }

    /// Store session credentials issued by the server.
    pub async fn save_session(
        &self,
        session_key: &str,
        expiry: i64,
        cipher_key: Option<&str>,
    ) -> Result<()> {
        let mut db = self.db.lock().await;
        let tx = db.transaction()?;
        BookmarkStore::new(&tx).save_session(session_key, expiry, cipher_key)?;
        tx.commit()?;
        Ok(())
    }

    /// Forget session credentials. Returns whether a session was stored.
    pub async fn logout(&self) -> Result<bool> {
        let mut db = self.db.lock().await;
        let tx = db.transaction()?;
        let had_session = BookmarkStore::new(&tx).clear_session()?;
        tx.commit()?;
        if had_session {
            tracing::info!("Cleared stored session");
        }
        Ok(had_session)
    }
}
