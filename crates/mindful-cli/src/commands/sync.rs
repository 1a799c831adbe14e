use mindful_core::JournalEntry;
use serde::Serialize;

use crate::commands::common::{open_journal, AppContext};
use crate::error::CliError;

pub async fn run_sync(context: &AppContext) -> Result<(), CliError> {
    if !context.remote_configured() {
        return Err(CliError::SyncNotConfigured);
    }

    let session = open_journal(context).await?;
    if !session.service.is_online() {
        let pending = session.service.pending_entries().await?.len();
        println!("Offline; {pending} change(s) still pending");
        return Ok(());
    }

    let report = session.service.sync_pending_entries().await?;
    if report.is_clean() {
        println!("Sync completed ({} change(s) pushed)", report.synced);
    } else {
        println!(
            "Sync finished with errors: {} pushed, {} still pending",
            report.synced, report.failed
        );
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct PendingItem {
    pub id: String,
    pub action: &'static str,
    pub remote_id: Option<String>,
    pub preview: String,
}

pub fn pending_to_item(record: &JournalEntry) -> PendingItem {
    let action = if record.is_deletion_intent() {
        "delete"
    } else if record.remote_id.is_some() {
        "update"
    } else {
        "create"
    };

    PendingItem {
        id: record.id.to_string(),
        action,
        remote_id: record.remote_id.clone(),
        preview: record.preview(60),
    }
}

pub async fn run_pending(as_json: bool, context: &AppContext) -> Result<(), CliError> {
    let session = open_journal(context).await?;
    let items = session
        .service
        .pending_entries()
        .await?
        .iter()
        .map(pending_to_item)
        .collect::<Vec<PendingItem>>();

    if as_json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if items.is_empty() {
        println!("Nothing waiting to sync.");
        return Ok(());
    }

    for item in items {
        let short_id = item.id.chars().take(13).collect::<String>();
        println!("{short_id:<13}  {:<6}  {}", item.action, item.preview);
    }
    Ok(())
}
