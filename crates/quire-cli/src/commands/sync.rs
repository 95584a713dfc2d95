use std::path::Path;

use chrono::Utc;
use quire_core::{
    ClientConfig, DatabaseService, HttpSyncClient, SyncEngine, SyncOutcome, SyncTransport,
};

use crate::commands::common::open_database;
use crate::error::CliError;

pub async fn run_sync(full: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path)?;
    let session_key = live_session_key(&db).await?;
    let config = ClientConfig::from_env()?;
    let transport = HttpSyncClient::new(&config, session_key)?;

    match sync_with(&db, transport, full).await? {
        SyncOutcome::Synced {
            fragments,
            last_applied_usn,
        } => {
            println!("Sync completed ({fragments} fragment(s), usn {last_applied_usn})");
        }
        SyncOutcome::FullSyncRequired {
            last_applied_usn,
            full_sync_before,
        } => {
            println!(
                "Local replica is at usn {last_applied_usn} but the server only keeps history \
                 from usn {full_sync_before}. Run `quire sync --full` to re-download."
            );
        }
    }
    Ok(())
}

/// Upgrade logged actions, then pull from `transport`
pub async fn sync_with<T: SyncTransport>(
    db: &DatabaseService,
    transport: T,
    full: bool,
) -> Result<SyncOutcome, CliError> {
    let upgraded = db.upgrade_actions().await?;
    if upgraded > 0 {
        tracing::info!("Upgraded {upgraded} logged action(s) before sync");
    }

    let engine = SyncEngine::new(db.clone(), transport);
    let outcome = if full {
        engine.full_sync().await?
    } else {
        engine.run_cycle().await?
    };
    Ok(outcome)
}

pub async fn run_upgrade(db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path)?;
    let upgraded = db.upgrade_actions().await?;
    println!("Upgraded {upgraded} action(s)");
    Ok(())
}

pub async fn live_session_key(db: &DatabaseService) -> Result<String, CliError> {
    let bookmark = db.bookmark().await?;
    if !bookmark.has_live_session(Utc::now().timestamp()) {
        return Err(if bookmark.session_key.is_some() {
            CliError::SessionExpired
        } else {
            CliError::NotLoggedIn
        });
    }
    bookmark.session_key.ok_or(CliError::NotLoggedIn)
}
