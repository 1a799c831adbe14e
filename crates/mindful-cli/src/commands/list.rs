use chrono::Utc;

use crate::commands::common::{
    entry_to_list_item, filter_entries, format_entry_lines, open_journal, AppContext,
    EntryListItem,
};
use crate::error::CliError;

pub async fn run_list(
    limit: usize,
    mood: Option<&str>,
    tag: Option<&str>,
    as_json: bool,
    context: &AppContext,
) -> Result<(), CliError> {
    let session = open_journal(context).await?;
    let entries = session.service.entries();
    let selected = filter_entries(&entries, mood, tag, limit);

    if as_json {
        let json_items = selected
            .iter()
            .map(|entry| entry_to_list_item(entry))
            .collect::<Vec<EntryListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if selected.is_empty() {
        println!("No journal entries yet.");
    } else {
        for line in format_entry_lines(&selected, Utc::now().timestamp_millis()) {
            println!("{line}");
        }
    }

    Ok(())
}
