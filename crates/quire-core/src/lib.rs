//! quire-core - Core library for Quire
//!
//! This crate contains the local replica of books and notes, the action log
//! that records every local mutation, and the pull sync engine that keeps the
//! replica converged with the server. Clients (currently the CLI) own one
//! [`DatabaseService`] and hand it to every component that needs the store.

pub mod actions;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod sync;
pub mod util;

pub use config::ClientConfig;
pub use error::{Error, Result};
pub use models::{Action, ActionType, Book, Bookmark, Note};
pub use services::DatabaseService;
pub use sync::{HttpSyncClient, SessionTransport, SyncEngine, SyncOutcome, SyncTransport};
