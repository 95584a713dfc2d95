//! Sync bookmark model

/// Durable sync position and session state of the local replica
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Bookmark {
    /// Highest server USN whose fragment has been fully applied
    pub last_applied_usn: i64,
    /// Server history-compaction boundary; below it only a full resync works
    pub full_sync_before: i64,
    /// Server clock at the last committed fragment (Unix seconds)
    pub last_sync_at: i64,
    pub session_key: Option<String>,
    pub session_expiry: Option<i64>,
    pub cipher_key: Option<String>,
}

impl Bookmark {
    /// Whether incremental sync can no longer reconstruct a consistent replica
    #[must_use]
    pub const fn requires_full_sync(&self) -> bool {
        self.last_applied_usn < self.full_sync_before
    }

    /// Whether a session key is stored and not known to be expired at `now`
    #[must_use]
    pub fn has_live_session(&self, now: i64) -> bool {
        self.session_key.is_some() && self.session_expiry.is_none_or(|expiry| expiry > now)
    }
}

impl std::fmt::Debug for Bookmark {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Bookmark")
            .field("last_applied_usn", &self.last_applied_usn)
            .field("full_sync_before", &self.full_sync_before)
            .field("last_sync_at", &self.last_sync_at)
            .field("session_key", &self.session_key.as_ref().map(|_| "[REDACTED]"))
            .field("session_expiry", &self.session_expiry)
            .field("cipher_key", &self.cipher_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_sync_required_below_threshold() {
        let bookmark = Bookmark {
            last_applied_usn: 5,
            full_sync_before: 10,
            ..Bookmark::default()
        };
        assert!(bookmark.requires_full_sync());

        let caught_up = Bookmark {
            last_applied_usn: 10,
            full_sync_before: 10,
            ..Bookmark::default()
        };
        assert!(!caught_up.requires_full_sync());
    }

    #[test]
    fn debug_redacts_secrets() {
        let bookmark = Bookmark {
            session_key: Some("secret-session".to_string()),
            cipher_key: Some("secret-cipher".to_string()),
            ..Bookmark::default()
        };
        let debug = format!("{bookmark:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn live_session_respects_expiry() {
        let mut bookmark = Bookmark {
            session_key: Some("key".to_string()),
            session_expiry: Some(100),
            ..Bookmark::default()
        };
        assert!(bookmark.has_live_session(50));
        assert!(!bookmark.has_live_session(150));

        bookmark.session_key = None;
        assert!(!bookmark.has_live_session(50));
    }
}
