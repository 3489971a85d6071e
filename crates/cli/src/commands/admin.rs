//! Admin directory commands.
//!
//! # Usage
//!
//! ```bash
//! # Add an admin (id generated unless given)
//! vd-cli admin add -n "Alice" -e alice@example.com
//!
//! # Bind a chat endpoint (Slack user id or Telegram chat id)
//! vd-cli admin connect ADM-1a2b3c4d5e U0123ABC
//!
//! vd-cli admin pause ADM-1a2b3c4d5e
//! vd-cli admin unpause ADM-1a2b3c4d5e
//! vd-cli admin remove ADM-1a2b3c4d5e
//! vd-cli admin list
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `VERIFYDESK_BASE_URL` - Base URL for personal links

use std::sync::Arc;
use std::time::Duration;

use verifydesk_core::{AdminId, ChatEndpoint};
use verifydesk_server::config::ServerConfig;
use verifydesk_server::directory::AdminDirectory;
use verifydesk_server::models::Admin;

use super::{CommandError, connect};

async fn directory() -> Result<AdminDirectory, CommandError> {
    let store = connect().await?;
    // One-shot process: the endpoint hint cache never gets a second lookup.
    Ok(AdminDirectory::new(Arc::new(store), Duration::from_secs(1)))
}

fn personal_link(admin_id: &AdminId) -> String {
    let mut config = ServerConfig::local();
    if let Ok(base_url) = std::env::var("VERIFYDESK_BASE_URL") {
        config.base_url = base_url;
    }
    config.admin_link(admin_id.as_str())
}

/// Create an admin.
///
/// # Errors
///
/// Returns error if the name is empty, the id is taken, or the database
/// fails.
pub async fn add(
    admin_id: Option<String>,
    name: &str,
    email: Option<String>,
) -> Result<Admin, CommandError> {
    let admin = directory()
        .await?
        .add_admin(admin_id.map(AdminId::new), name, email)
        .await?;

    tracing::info!("Admin created successfully!");
    tracing::info!("  ID: {}", admin.admin_id);
    tracing::info!("  Name: {}", admin.name);
    tracing::info!("");
    tracing::info!("Share this personal link:");
    tracing::info!("  {}", personal_link(&admin.admin_id));
    tracing::info!("");
    tracing::info!(
        "The admin connects their chat by sending /start {} to the bot.",
        admin.admin_id
    );
    Ok(admin)
}

/// Bind a chat endpoint to an admin without going through the bot.
///
/// # Errors
///
/// Returns error if the endpoint is malformed, the admin is unknown, or the
/// endpoint belongs to someone else.
pub async fn connect_endpoint(admin_id: &str, endpoint: &str) -> Result<Admin, CommandError> {
    let endpoint =
        ChatEndpoint::parse(endpoint).map_err(|e| CommandError::Invalid(e.to_string()))?;
    let admin = directory()
        .await?
        .connect_endpoint(&AdminId::new(admin_id), &endpoint)
        .await?;
    tracing::info!("Connected {} to {}", admin.admin_id, endpoint);
    Ok(admin)
}

/// # Errors
///
/// Returns error if the admin is unknown or the database fails.
pub async fn pause(admin_id: &str) -> Result<(), CommandError> {
    let admin = directory()
        .await?
        .pause_admin(&AdminId::new(admin_id))
        .await?;
    tracing::info!("Paused {} ({})", admin.admin_id, admin.name);
    Ok(())
}

/// # Errors
///
/// Returns error if the admin is unknown or the database fails.
pub async fn unpause(admin_id: &str) -> Result<(), CommandError> {
    let admin = directory()
        .await?
        .unpause_admin(&AdminId::new(admin_id))
        .await?;
    tracing::info!("Unpaused {} ({})", admin.admin_id, admin.name);
    Ok(())
}

/// Delete an admin. Their applications are kept.
///
/// # Errors
///
/// Returns error if the admin is unknown or the database fails.
pub async fn remove(admin_id: &str) -> Result<(), CommandError> {
    directory()
        .await?
        .remove_admin(&AdminId::new(admin_id))
        .await?;
    tracing::info!("Removed {admin_id}");
    Ok(())
}

/// Print every admin, one per line.
///
/// # Errors
///
/// Returns error if the database fails.
#[allow(clippy::print_stdout)]
pub async fn list() -> Result<(), CommandError> {
    let admins = directory().await?.list_admins().await?;

    if admins.is_empty() {
        println!("No admins.");
    }
    for admin in &admins {
        println!(
            "{}\t{}\t{}\t{}",
            admin.admin_id,
            admin.status,
            admin
                .endpoint
                .as_ref()
                .map_or_else(|| "(not connected)".to_string(), ToString::to_string),
            admin.name
        );
    }
    Ok(())
}
