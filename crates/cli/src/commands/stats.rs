//! Statistics command.

use verifydesk_core::AdminId;
use verifydesk_server::db::RecordStore;

use super::{CommandError, connect};

/// Print desk-wide counters, or one admin's.
///
/// # Errors
///
/// Returns error if the admin is unknown or the database fails.
#[allow(clippy::print_stdout)]
pub async fn run(admin_id: Option<String>) -> Result<(), CommandError> {
    let store = connect().await?;

    if let Some(admin_id) = admin_id {
        let admin_id = AdminId::new(admin_id);
        let admin = store
            .get_admin(&admin_id)
            .await?
            .ok_or_else(|| CommandError::Invalid(format!("no admin {admin_id}")))?;
        let stats = store.admin_stats(&admin_id).await?;
        println!("{} ({})", admin.name, admin.admin_id);
        println!("  Total applications:     {}", stats.total);
        println!("  Awaiting PIN decision:  {}", stats.pin_pending);
        println!("  PIN approved:           {}", stats.pin_approved);
        println!("  Awaiting code decision: {}", stats.code_pending);
        println!("  Fully approved:         {}", stats.fully_approved);
    } else {
        let stats = store.system_stats().await?;
        println!("Admins:                 {}", stats.total_admins);
        println!("Applications:           {}", stats.total_applications);
        println!("Awaiting PIN decision:  {}", stats.pin_pending);
        println!("PIN approved:           {}", stats.pin_approved);
        println!("Awaiting code decision: {}", stats.code_pending);
        println!("Fully approved:         {}", stats.fully_approved);
        println!("Rejected:               {}", stats.total_rejected);
    }
    Ok(())
}
