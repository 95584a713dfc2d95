//! Bookmark store over the string-keyed `system` table

use crate::error::{Error, Result};
use crate::models::Bookmark;
use rusqlite::{Connection, OptionalExtension};

pub const KEY_LAST_MAX_USN: &str = "last_max_usn";
pub const KEY_FULL_SYNC_BEFORE: &str = "full_sync_before";
pub const KEY_LAST_SYNC_AT: &str = "last_sync_at";
pub const KEY_SESSION_KEY: &str = "session_key";
pub const KEY_SESSION_KEY_EXPIRY: &str = "session_key_expiry";
pub const KEY_CIPHER_KEY: &str = "cipher_key";

/// Typed access to sync and session state
pub struct BookmarkStore<'a> {
    conn: &'a Connection,
}

impl<'a> BookmarkStore<'a> {
    /// Create a new store with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Load the bookmark; absent keys read as zero/empty
    pub fn load(&self) -> Result<Bookmark> {
        Ok(Bookmark {
            last_applied_usn: self.get_i64(KEY_LAST_MAX_USN)?.unwrap_or(0),
            full_sync_before: self.get_i64(KEY_FULL_SYNC_BEFORE)?.unwrap_or(0),
            last_sync_at: self.get_i64(KEY_LAST_SYNC_AT)?.unwrap_or(0),
            session_key: self.get(KEY_SESSION_KEY)?,
            session_expiry: self.get_i64(KEY_SESSION_KEY_EXPIRY)?,
            cipher_key: self.get(KEY_CIPHER_KEY)?,
        })
    }

    pub fn last_applied_usn(&self) -> Result<i64> {
        Ok(self.get_i64(KEY_LAST_MAX_USN)?.unwrap_or(0))
    }

    /// Move the applied USN forward. Returns `false` and leaves the value
    /// untouched when `usn` is not ahead of the stored one.
    pub fn advance_usn(&self, usn: i64) -> Result<bool> {
        let current = self.last_applied_usn()?;
        if usn <= current {
            return Ok(false);
        }
        self.set(KEY_LAST_MAX_USN, &usn.to_string())?;
        Ok(true)
    }

    /// Reset the applied USN to zero. Only valid together with discarding
    /// every replicated book and note in the same transaction.
    pub fn reset_usn(&self) -> Result<()> {
        self.set(KEY_LAST_MAX_USN, "0")
    }

    pub fn set_full_sync_before(&self, usn: i64) -> Result<()> {
        self.set(KEY_FULL_SYNC_BEFORE, &usn.to_string())
    }

    pub fn set_last_sync_at(&self, timestamp: i64) -> Result<()> {
        self.set(KEY_LAST_SYNC_AT, &timestamp.to_string())
    }

    /// Store session credentials obtained from the server
    pub fn save_session(
        &self,
        session_key: &str,
        expiry: i64,
        cipher_key: Option<&str>,
    ) -> Result<()> {
        self.set(KEY_SESSION_KEY, session_key)?;
        self.set(KEY_SESSION_KEY_EXPIRY, &expiry.to_string())?;
        match cipher_key {
            Some(cipher_key) => self.set(KEY_CIPHER_KEY, cipher_key),
            None => self.delete(KEY_CIPHER_KEY),
        }
    }

    /// Forget session credentials. Returns whether a session was stored.
    pub fn clear_session(&self) -> Result<bool> {
        let had_session = self.get(KEY_SESSION_KEY)?.is_some();
        for key in [KEY_CIPHER_KEY, KEY_SESSION_KEY, KEY_SESSION_KEY_EXPIRY] {
            self.delete(key)?;
        }
        Ok(had_session)
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .conn
            .query_row("SELECT value FROM system WHERE key = ?", [key], |row| {
                row.get(0)
            })
            .optional()?)
    }

    fn get_i64(&self, key: &str) -> Result<Option<i64>> {
        self.get(key)?
            .map(|value| {
                value.trim().parse::<i64>().map_err(|_| {
                    Error::Database(format!("invalid integer '{value}' for system key '{key}'"))
                })
            })
            .transpose()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO system (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [key, value],
        )?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.conn.execute("DELETE FROM system WHERE key = ?", [key])?;
        Ok(())
    }
}
