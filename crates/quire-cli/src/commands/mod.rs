pub mod add;
pub mod books;
pub mod common;
pub mod edit;
pub mod notes;
pub mod remove;
pub mod session;
pub mod sync;
