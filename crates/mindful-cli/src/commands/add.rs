use mindful_core::EntryDraft;

use crate::commands::common::{open_journal, resolve_entry_text, AppContext};
use crate::error::CliError;

pub async fn run_add(
    text_parts: &[String],
    mood: Option<&str>,
    tags: &[String],
    context: &AppContext,
) -> Result<(), CliError> {
    let text = resolve_entry_text(text_parts)?;
    let mut draft = EntryDraft::new(text);
    if let Some(mood) = mood {
        draft = draft.with_mood(mood);
    }
    for tag in tags {
        draft = draft.with_tag(tag.trim());
    }

    let session = open_journal(context).await?;
    let entry = session.service.add_entry(draft).await?;

    println!("{}", entry.id);
    if entry.sync_status.is_unsynced() {
        tracing::info!("Entry saved locally ({}); it will sync when online", entry.sync_status);
    }
    Ok(())
}
