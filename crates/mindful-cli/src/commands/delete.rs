use crate::commands::common::{normalize_entry_identifier, open_journal, resolve_entry, AppContext};
use crate::error::CliError;

pub async fn run_delete(id: &str, context: &AppContext) -> Result<(), CliError> {
    let normalized_id = normalize_entry_identifier(id)?;
    let session = open_journal(context).await?;
    let entry = resolve_entry(&normalized_id, &session.service.entries())?;

    session.service.delete_entry(&entry.id).await?;
    println!("{}", entry.id);
    Ok(())
}
