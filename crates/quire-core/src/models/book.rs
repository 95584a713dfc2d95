//! Book model

use serde::{Deserialize, Serialize};

use crate::util::{generate_uuid, timestamp_now_millis};

/// A book groups notes under a user-visible label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// Unique identifier, shared with the server
    pub uuid: String,
    /// User-visible name, unique among local books
    pub label: String,
    /// Last known server sequence number (0 if never synced)
    pub usn: i64,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
    /// Deletion flag as reported by the server
    pub deleted: bool,
}

impl Book {
    /// Create a new, never-synced book with the given label
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self::with_uuid(generate_uuid(), label)
    }

    /// Create a new, never-synced book with a known identifier
    #[must_use]
    pub fn with_uuid(uuid: impl Into<String>, label: impl Into<String>) -> Self {
        let now = timestamp_now_millis();
        Self {
            uuid: uuid.into(),
            label: label.into(),
            usn: 0,
            created_at: now,
            updated_at: now,
            deleted: false,
        }
    }

    /// Whether the server has ever acknowledged this book
    #[must_use]
    pub const fn is_synced(&self) -> bool {
        self.usn > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_new() {
        let book = Book::new("work");
        assert_eq!(book.label, "work");
        assert_eq!(book.usn, 0);
        assert!(!book.deleted);
        assert!(!book.is_synced());
        assert_eq!(book.created_at, book.updated_at);
    }

    #[test]
    fn test_book_ids_unique() {
        assert_ne!(Book::new("a").uuid, Book::new("a").uuid);
    }
}
