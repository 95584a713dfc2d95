//! Sync engine: pulls fragments after the bookmark and applies them.

use rusqlite::Connection;

use super::{FragmentBook, SyncFragment, SyncTransport};
use crate::db::{
    BookRepository, BookmarkStore, Database, NoteRepository, SqliteBookRepository,
    SqliteNoteRepository,
};
use crate::error::{Error, Result};
use crate::services::DatabaseService;

/// Result of a sync cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Fragments were pulled and applied up to `last_applied_usn`
    Synced {
        fragments: usize,
        last_applied_usn: i64,
    },
    /// The server no longer holds history back to the local bookmark;
    /// nothing was pulled
    FullSyncRequired {
        last_applied_usn: i64,
        full_sync_before: i64,
    },
}

/// Drives pull replication for one local replica
pub struct SyncEngine<T> {
    service: DatabaseService,
    transport: T,
}

impl<T: SyncTransport> SyncEngine<T> {
    pub const fn new(service: DatabaseService, transport: T) -> Self {
        Self { service, transport }
    }

    /// Run one incremental sync cycle.
    ///
    /// Holds the replica lock throughout, so no local action is recorded
    /// mid-cycle. Each fragment commits together with the bookmark it
    /// advances; an error leaves the bookmark at the last committed fragment.
    pub async fn run_cycle(&self) -> Result<SyncOutcome> {
        let mut db = self.service.lock().await;

        let state = self.transport.sync_state().await?;
        let last_applied_usn = {
            let store = BookmarkStore::new(db.connection());
            store.set_full_sync_before(state.full_sync_before)?;
            store.last_applied_usn()?
        };

        if last_applied_usn < state.full_sync_before {
            tracing::warn!(
                last_applied_usn,
                full_sync_before = state.full_sync_before,
                "local replica is behind the server's retained history, full sync required"
            );
            return Ok(SyncOutcome::FullSyncRequired {
                last_applied_usn,
                full_sync_before: state.full_sync_before,
            });
        }

        if last_applied_usn >= state.max_usn {
            tracing::debug!(last_applied_usn, "local replica is up to date");
            return Ok(SyncOutcome::Synced {
                fragments: 0,
                last_applied_usn,
            });
        }

        self.pull(&mut db, last_applied_usn).await
    }

    /// Discard replicated state and pull everything from the start.
    ///
    /// Rows never acknowledged by the server (`usn == 0`) are kept, along
    /// with any book still holding one of them.
    pub async fn full_sync(&self) -> Result<SyncOutcome> {
        let mut db = self.service.lock().await;

        let state = self.transport.sync_state().await?;
        {
            let tx = db.transaction()?;
            let (notes, books) = discard_replicated(&tx)?;
            let store = BookmarkStore::new(&tx);
            store.reset_usn()?;
            store.set_full_sync_before(state.full_sync_before)?;
            tx.commit()?;
            tracing::info!(notes, books, "discarded replicated state for full sync");
        }

        self.pull(&mut db, 0).await
    }

    async fn pull(&self, db: &mut Database, mut after_usn: i64) -> Result<SyncOutcome> {
        let mut fragments = 0;

        loop {
            let fragment = self.transport.sync_fragment(after_usn).await?;
            if fragment.is_empty() && fragment.frag_max_usn <= after_usn {
                break;
            }

            apply_fragment(db, &fragment)?;
            fragments += 1;

            let advanced = fragment.frag_max_usn > after_usn;
            after_usn = after_usn.max(fragment.frag_max_usn);
            if !advanced || fragment.frag_max_usn >= fragment.user_max_usn {
                break;
            }
        }

        Ok(SyncOutcome::Synced {
            fragments,
            last_applied_usn: after_usn,
        })
    }
}

/// Apply one fragment and advance the bookmark in a single transaction
fn apply_fragment(db: &mut Database, fragment: &SyncFragment) -> Result<()> {
    let tx = db.transaction()?;
    let conn: &Connection = &tx;
    let books = SqliteBookRepository::new(conn);
    let notes = SqliteNoteRepository::new(conn);

    for book in fragment.books.iter().filter(|book| !book.deleted) {
        resolve_label_conflict(&books, book)?;
        books.upsert(&book.to_book())?;
    }

    for note in fragment.notes.iter().filter(|note| !note.deleted) {
        if !books.exists(&note.book_uuid)? {
            return Err(Error::BookNotFound(note.book_uuid.clone()));
        }
        notes.upsert(&note.to_note())?;
    }

    let removed_notes = fragment
        .notes
        .iter()
        .filter(|note| note.deleted)
        .map(|note| note.uuid.as_str())
        .chain(fragment.expunged_notes.iter().map(String::as_str));
    for uuid in removed_notes {
        notes.delete(uuid)?;
    }

    let removed_books = fragment
        .books
        .iter()
        .filter(|book| book.deleted)
        .map(|book| book.uuid.as_str())
        .chain(fragment.expunged_books.iter().map(String::as_str));
    for uuid in removed_books {
        books.delete_with_notes(uuid)?;
    }

    let store = BookmarkStore::new(conn);
    store.advance_usn(fragment.frag_max_usn)?;
    store.set_last_sync_at(fragment.current_time)?;
    tx.commit()?;

    tracing::info!(
        frag_max_usn = fragment.frag_max_usn,
        user_max_usn = fragment.user_max_usn,
        books = fragment.books.len(),
        notes = fragment.notes.len(),
        "applied sync fragment"
    );
    Ok(())
}

/// Move a different local book out of the way of an incoming label
fn resolve_label_conflict(
    books: &SqliteBookRepository<'_>,
    incoming: &FragmentBook,
) -> Result<()> {
    let Some(existing) = books.find_by_label(&incoming.label)? else {
        return Ok(());
    };
    if existing.uuid == incoming.uuid {
        return Ok(());
    }

    let mut suffix = 2;
    let renamed = loop {
        let candidate = format!("{}_{suffix}", incoming.label);
        if books.find_by_label(&candidate)?.is_none() {
            break candidate;
        }
        suffix += 1;
    };

    books.rename(&existing.uuid, &renamed)?;
    tracing::warn!(
        label = %incoming.label,
        renamed = %renamed,
        "renamed local book to make way for a synced book with the same label"
    );
    Ok(())
}

fn discard_replicated(conn: &Connection) -> Result<(usize, usize)> {
    let notes = conn.execute("DELETE FROM notes WHERE usn > 0", [])?;
    let books = conn.execute(
        "DELETE FROM books
         WHERE usn > 0 AND uuid NOT IN (SELECT book_uuid FROM notes)",
        [],
    )?;
    Ok((notes, books))
}
