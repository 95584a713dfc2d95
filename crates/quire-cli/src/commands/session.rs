use std::path::Path;

use chrono::Utc;
use quire_core::{ClientConfig, DatabaseService, HttpSyncClient, SessionTransport};

use crate::commands::common::{format_sync_timestamp, open_database};
use crate::error::CliError;

/// Stored sessions without an explicit expiry last this long
const DEFAULT_SESSION_SECS: i64 = 30 * 24 * 60 * 60;

pub async fn run_login(
    session_key: &str,
    expires_at: Option<i64>,
    cipher_key: Option<&str>,
    db_path: &Path,
) -> Result<(), CliError> {
    let session_key = session_key.trim();
    if session_key.is_empty() {
        return Err(CliError::Config("session key must not be empty".to_string()));
    }

    let expiry = expires_at.unwrap_or_else(|| Utc::now().timestamp() + DEFAULT_SESSION_SECS);
    let db = open_database(db_path)?;
    db.save_session(session_key, expiry, cipher_key).await?;

    println!("Session stored (expires {})", format_sync_timestamp(expiry));
    Ok(())
}

pub async fn run_logout(db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path)?;
    let bookmark = db.bookmark().await?;

    // An expired key is already dead on the server
    let live = bookmark.has_live_session(Utc::now().timestamp());
    let server = match bookmark.session_key {
        Some(session_key) if live => {
            let config = ClientConfig::from_env()?;
            Some(HttpSyncClient::new(&config, session_key)?)
        }
        _ => None,
    };

    if logout_with(&db, server.as_ref()).await? {
        println!("Logged out");
    } else {
        println!("No stored session");
    }
    Ok(())
}

/// Sign out on the server when given a transport, then clear local keys.
///
/// A failed signout keeps the stored session so the user can retry.
pub async fn logout_with<T: SessionTransport>(
    db: &DatabaseService,
    server: Option<&T>,
) -> Result<bool, CliError> {
    if let Some(server) = server {
        server.signout().await?;
    }
    Ok(db.logout().await?)
}

pub async fn run_status(db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path)?;
    for line in status_lines(&db).await? {
        println!("{line}");
    }
    Ok(())
}

pub async fn status_lines(db: &DatabaseService) -> Result<Vec<String>, CliError> {
    let bookmark = db.bookmark().await?;
    let books = db.list_books().await?.len();
    let notes = db.list_notes(None).await?.len();
    let actions = db.list_actions().await?;
    let pending = actions
        .iter()
        .filter(|action| !action.payload().is_ok_and(|payload| payload.is_current()))
        .count();
    let location = db
        .db_path()
        .map_or_else(|| "(in memory)".to_string(), |path| path.display().to_string());

    let session = if bookmark.has_live_session(Utc::now().timestamp()) {
        "logged in"
    } else if bookmark.session_key.is_some() {
        "session expired"
    } else {
        "logged out"
    };

    let mut lines = vec![
        format!("Database:          {location}"),
        format!("Session:           {session}"),
        format!("Last applied usn:  {}", bookmark.last_applied_usn),
        format!("Full sync before:  {}", bookmark.full_sync_before),
        format!(
            "Last sync:         {}",
            format_sync_timestamp(bookmark.last_sync_at)
        ),
        format!("Books / notes:     {books} / {notes}"),
        format!("Logged actions:    {}", actions.len()),
    ];
    if pending > 0 {
        lines.push(format!(
            "Needs upgrade:     {pending} action(s); run `quire upgrade`"
        ));
    }
    if bookmark.requires_full_sync() {
        lines.push("Full sync required: run `quire sync --full`".to_string());
    }
    Ok(lines)
}
