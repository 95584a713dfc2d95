//! Data models for Quire

mod action;
mod book;
mod bookmark;
mod note;

pub use action::{
    Action, ActionPayload, ActionType, AddBookDataV1, AddBookDataV2, AddNoteDataV2, AddNoteDataV3,
    EditNoteDataV1, EditNoteDataV2, EditNoteDataV3, RemoveBookDataV1, RemoveBookDataV2,
    RemoveNoteDataV1, RemoveNoteDataV2,
};
pub use book::Book;
pub use bookmark::Bookmark;
pub use note::Note;
