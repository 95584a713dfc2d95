//! Services shared by Quire clients

mod database;

pub use database::DatabaseService;
