use crate::commands::common::{
    capture_editor_input_with_initial, normalize_content, normalize_entry_identifier,
    open_journal, resolve_entry, AppContext,
};
use crate::error::CliError;

pub async fn run_edit(
    id: &str,
    text_parts: &[String],
    mood: Option<&str>,
    tags: &[String],
    context: &AppContext,
) -> Result<(), CliError> {
    let normalized_id = normalize_entry_identifier(id)?;
    let session = open_journal(context).await?;
    let mut entry = resolve_entry(&normalized_id, &session.service.entries())?;

    let text = match normalize_content(&text_parts.join(" ")) {
        Some(text) => text,
        None if mood.is_some() || !tags.is_empty() => entry.text.clone(),
        None => capture_editor_input_with_initial(&entry.text)?
            .ok_or(CliError::EmptyEditedContent)?,
    };

    let unchanged = text == entry.text && mood.is_none() && tags.is_empty();
    if unchanged {
        println!("{}", entry.id);
        return Ok(());
    }

    entry.text = text;
    if let Some(mood) = mood {
        entry.mood = normalize_content(mood);
    }
    if !tags.is_empty() {
        entry.tags = Some(tags.iter().map(|tag| tag.trim().to_string()).collect());
    }

    let updated = session.service.update_entry(entry).await?;
    println!("{}", updated.id);
    Ok(())
}
