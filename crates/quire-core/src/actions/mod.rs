//! Action log, reducer, rewinder, and schema migrations

mod log;
pub mod migrate;
pub mod reducer;
pub mod rewind;

pub use log::{record, record_at, ActionLog, Mutation};
pub use migrate::migrate;
pub use reducer::apply;
pub use rewind::{is_rewindable, rewind};
