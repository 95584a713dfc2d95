//! Database layer for Quire

mod bookmark;
mod connection;
mod migrations;
mod repository;

pub use bookmark::BookmarkStore;
pub use connection::Database;
pub use repository::{
    BookRepository, NotePatch, NoteRepository, SqliteBookRepository, SqliteNoteRepository,
};
