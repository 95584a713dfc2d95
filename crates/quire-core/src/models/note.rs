//! Note model

use serde::{Deserialize, Serialize};

/// A note in the system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Unique identifier, shared with the server
    pub uuid: String,
    /// Owning book
    pub book_uuid: String,
    /// Last known server sequence number (0 if never synced)
    pub usn: i64,
    /// Note body; opaque to the sync engine
    pub content: String,
    /// Creation timestamp from the client clock (Unix ms)
    pub added_on: i64,
    /// Last edit timestamp (Unix ms)
    pub edited_on: Option<i64>,
    /// Whether the note is publicly shared
    pub public: bool,
    /// Deletion flag as reported by the server
    pub deleted: bool,
}

impl Note {
    /// Get first line as title preview, truncated to `max_len` characters
    #[must_use]
    pub fn title_preview(&self, max_len: usize) -> String {
        self.content
            .lines()
            .next()
            .unwrap_or("")
            .chars()
            .take(max_len)
            .collect()
    }

    /// Most recent of `added_on` and `edited_on`
    #[must_use]
    pub fn last_touched(&self) -> i64 {
        self.edited_on.map_or(self.added_on, |edited| edited.max(self.added_on))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(content: &str) -> Note {
        Note {
            uuid: "n1".to_string(),
            book_uuid: "b1".to_string(),
            usn: 0,
            content: content.to_string(),
            added_on: 100,
            edited_on: None,
            public: false,
            deleted: false,
        }
    }

    #[test]
    fn test_title_preview() {
        let note = note("First line\nSecond line\nThird line");
        assert_eq!(note.title_preview(50), "First line");
        assert_eq!(note.title_preview(5), "First");
    }

    #[test]
    fn test_last_touched_prefers_edit() {
        let mut note = note("hi");
        assert_eq!(note.last_touched(), 100);
        note.edited_on = Some(250);
        assert_eq!(note.last_touched(), 250);
    }
}
