//! Pull replication from the sync server.
//!
//! The server orders every book and note mutation by a per-account update
//! sequence number (USN). A client fetches the server's [`SyncState`], then
//! pages through [`SyncFragment`]s after its bookmark, applying each one in a
//! single transaction via [`SyncEngine`].

mod engine;
mod http;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{Book, Note};

pub use engine::{SyncEngine, SyncOutcome};
pub use http::HttpSyncClient;

/// Server-side sync state for the current account
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    /// Clients whose bookmark is below this must discard and re-pull
    pub full_sync_before: i64,
    pub max_usn: i64,
    pub current_time: i64,
}

/// One page of server state after some USN
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncFragment {
    pub frag_max_usn: i64,
    pub user_max_usn: i64,
    pub current_time: i64,
    #[serde(default)]
    pub notes: Vec<FragmentNote>,
    #[serde(default)]
    pub books: Vec<FragmentBook>,
    #[serde(default)]
    pub expunged_notes: Vec<String>,
    #[serde(default)]
    pub expunged_books: Vec<String>,
}

impl SyncFragment {
    /// Whether the fragment carries no entries at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
            && self.books.is_empty()
            && self.expunged_notes.is_empty()
            && self.expunged_books.is_empty()
    }
}

/// A note as carried in a sync fragment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentNote {
    pub uuid: String,
    pub book_uuid: String,
    pub usn: i64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub added_on: i64,
    #[serde(default)]
    pub edited_on: i64,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub deleted: bool,
}

impl FragmentNote {
    /// Local row for this entry; an `edited_on` of zero means never edited
    #[must_use]
    pub fn to_note(&self) -> Note {
        Note {
            uuid: self.uuid.clone(),
            book_uuid: self.book_uuid.clone(),
            usn: self.usn,
            content: self.content.clone(),
            added_on: self.added_on,
            edited_on: (self.edited_on != 0).then_some(self.edited_on),
            public: self.public,
            deleted: false,
        }
    }
}

/// A book as carried in a sync fragment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentBook {
    pub uuid: String,
    pub usn: i64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub added_on: i64,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub deleted: bool,
}

impl FragmentBook {
    #[must_use]
    pub fn to_book(&self) -> Book {
        let created_at = self
            .created_at
            .map_or(self.added_on, |created_at| created_at.timestamp_millis());
        let updated_at = self
            .updated_at
            .map_or(created_at, |updated_at| updated_at.timestamp_millis());
        Book {
            uuid: self.uuid.clone(),
            label: self.label.clone(),
            usn: self.usn,
            created_at,
            updated_at,
            deleted: false,
        }
    }
}

/// Source of server sync state and fragments.
///
/// These are the only suspension points of a sync cycle.
#[allow(async_fn_in_trait)]
pub trait SyncTransport {
    async fn sync_state(&self) -> Result<SyncState>;

    /// Fetch the fragment of changes after `after_usn`; `0` starts from scratch
    async fn sync_fragment(&self, after_usn: i64) -> Result<SyncFragment>;
}

/// Server-side invalidation of the stored session key
#[allow(async_fn_in_trait)]
pub trait SessionTransport {
    async fn signout(&self) -> Result<()>;
}
