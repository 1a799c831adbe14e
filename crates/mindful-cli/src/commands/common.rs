use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::Utc;
use mindful_core::config::AppConfig;
use mindful_core::connectivity::{ConnectivityHandle, HttpProbe};
use mindful_core::remote::RemoteStore;
use mindful_core::storage::LibSqlKeyValueStore;
use mindful_core::{JournalEntry, JournalSyncService, SyncStatus};
use serde::Serialize;

use crate::error::CliError;
use crate::lazy_remote::LazyRemote;
use crate::offline_remote::OfflineRemote;

const DB_FILE_NAME: &str = "mindful.db";
const CONFIG_FILE_NAME: &str = "config.json";

/// Resolved settings shared by every command
#[derive(Debug, Clone)]
pub struct AppContext {
    pub config: AppConfig,
    pub data_dir: PathBuf,
    pub offline: bool,
}

impl AppContext {
    /// Combine the config file, `MINDFUL_*` env vars and CLI flags, in
    /// increasing order of precedence.
    pub fn resolve(
        cli_data_dir: Option<PathBuf>,
        config_path: Option<PathBuf>,
        offline: bool,
    ) -> Result<Self, CliError> {
        let file_config = match config_path {
            Some(path) => AppConfig::load_file(path)?,
            None => match default_config_path().filter(|path| path.is_file()) {
                Some(path) => AppConfig::load_file(path)?,
                None => AppConfig::default(),
            },
        };
        let config = file_config.merged_with(AppConfig::from_env()?);

        let data_dir = cli_data_dir
            .or_else(|| config.data_dir.clone())
            .unwrap_or_else(default_data_dir);

        Ok(Self {
            config,
            data_dir,
            offline,
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }

    pub fn remote_configured(&self) -> bool {
        self.config.remote_config().is_some()
    }
}

pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mindful")
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("mindful").join(CONFIG_FILE_NAME))
}

pub async fn open_store(context: &AppContext) -> Result<Arc<LibSqlKeyValueStore>, CliError> {
    Ok(Arc::new(LibSqlKeyValueStore::open_path(context.db_path()).await?))
}

/// A started sync service plus the handle driving its connectivity
pub struct JournalSession {
    pub service: JournalSyncService,
    pub connectivity: ConnectivityHandle,
}

pub async fn open_journal(context: &AppContext) -> Result<JournalSession, CliError> {
    let store = open_store(context).await?;
    let (remote, online) = connect_remote(context).await?;
    start_session(store, remote, online).await
}

pub async fn start_session(
    store: Arc<LibSqlKeyValueStore>,
    remote: Arc<dyn RemoteStore>,
    online: bool,
) -> Result<JournalSession, CliError> {
    let connectivity = ConnectivityHandle::new(online);
    let service =
        JournalSyncService::start(store, remote, Arc::new(connectivity.clone())).await?;

    Ok(JournalSession {
        service,
        connectivity,
    })
}

async fn connect_remote(context: &AppContext) -> Result<(Arc<dyn RemoteStore>, bool), CliError> {
    let Some(remote_config) = context.config.remote_config() else {
        return Ok((offline_remote(), false));
    };
    if context.offline {
        tracing::info!("Offline mode requested; changes will be queued");
        return Ok((offline_remote(), false));
    }

    // the session keeps the real mirror even when starting offline so a
    // later reconnect can replay against it
    let remote = Arc::new(LazyRemote::new(remote_config));
    let reachable = match context.config.probe_url() {
        Some(url) => HttpProbe::new(url)?.check().await,
        None => true,
    };
    let online = if reachable {
        match remote.connect().await {
            Ok(_) => true,
            Err(error) => {
                tracing::warn!(
                    "Failed to connect to remote mirror: {error}; changes will be queued"
                );
                false
            }
        }
    } else {
        tracing::info!("Remote mirror unreachable; changes will be queued");
        false
    };

    let remote: Arc<dyn RemoteStore> = remote;
    Ok((remote, online))
}

fn offline_remote() -> Arc<dyn RemoteStore> {
    Arc::new(OfflineRemote)
}

#[derive(Debug, Serialize)]
pub struct EntryListItem {
    pub id: String,
    pub preview: String,
    pub text: String,
    pub date: String,
    pub relative_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
    pub tags: Vec<String>,
    pub sync_status: SyncStatus,
}

pub fn entry_to_list_item(entry: &JournalEntry) -> EntryListItem {
    let now_ms = Utc::now().timestamp_millis();
    let mut tags = entry.tag_list().to_vec();
    tags.sort();

    EntryListItem {
        id: entry.id.to_string(),
        preview: entry.preview(80),
        text: entry.text.clone(),
        date: entry.date.clone(),
        relative_time: entry_relative_time(entry, now_ms),
        mood: entry.mood.clone(),
        tags,
        sync_status: entry.sync_status,
    }
}

pub fn filter_entries<'a>(
    entries: &'a [JournalEntry],
    mood: Option<&str>,
    tag: Option<&str>,
    limit: usize,
) -> Vec<&'a JournalEntry> {
    entries
        .iter()
        .filter(|entry| {
            mood.is_none_or(|mood| {
                entry
                    .mood
                    .as_deref()
                    .is_some_and(|entry_mood| entry_mood.eq_ignore_ascii_case(mood))
            })
        })
        .filter(|entry| {
            tag.is_none_or(|tag| {
                entry
                    .tag_list()
                    .iter()
                    .any(|entry_tag| entry_tag.eq_ignore_ascii_case(tag))
            })
        })
        .take(limit)
        .collect()
}

pub fn format_entry_lines(entries: &[&JournalEntry], now_ms: i64) -> Vec<String> {
    entries
        .iter()
        .map(|entry| {
            let id = entry.id.to_string();
            let short_id = id.chars().take(13).collect::<String>();
            let preview = entry.preview(40);
            let relative_time = entry_relative_time(entry, now_ms);
            let details = render_details(entry);

            if details.is_empty() {
                format!("{short_id:<13}  {preview:<40}  {relative_time}")
            } else {
                format!("{short_id:<13}  {preview:<40}  {relative_time:<10}  {details}")
            }
        })
        .collect()
}

/// Mood, tags and a sync marker for anything not yet mirrored
pub fn render_details(entry: &JournalEntry) -> String {
    let mut parts = Vec::new();
    if let Some(mood) = &entry.mood {
        parts.push(format!("[{mood}]"));
    }
    let mut tags = entry.tag_list().to_vec();
    tags.sort();
    parts.extend(tags.into_iter().map(|tag| format!("#{tag}")));
    if entry.sync_status.is_unsynced() {
        parts.push(format!("({})", entry.sync_status));
    }
    parts.join(" ")
}

pub fn entry_relative_time(entry: &JournalEntry, now_ms: i64) -> String {
    entry.parsed_date().map_or_else(
        || entry.date.clone(),
        |date| format_relative_time(date.timestamp_millis(), now_ms),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

/// Find an entry by full id or unique id prefix
pub fn resolve_entry(query: &str, entries: &[JournalEntry]) -> Result<JournalEntry, CliError> {
    if let Some(entry) = entries.iter().find(|entry| entry.id.as_str() == query) {
        return Ok(entry.clone());
    }

    let matching = entries
        .iter()
        .filter(|entry| entry.id.as_str().starts_with(query))
        .collect::<Vec<_>>();

    match matching.as_slice() {
        [] => Err(CliError::EntryNotFound(query.to_string())),
        [entry] => Ok((*entry).clone()),
        _ => {
            let options = matching
                .iter()
                .take(3)
                .map(|entry| entry.id.as_str().chars().take(13).collect::<String>())
                .collect::<Vec<_>>()
                .join(", ");

            Err(CliError::AmbiguousEntryId(format!(
                "ID prefix '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

pub fn resolve_entry_text(text_parts: &[String]) -> Result<String, CliError> {
    if let Some(text) = normalize_content(&text_parts.join(" ")) {
        return Ok(text);
    }

    if let Some(text) = read_piped_stdin()? {
        return Ok(text);
    }

    if let Some(text) = capture_editor_input_with_initial("")? {
        return Ok(text);
    }

    Err(CliError::EmptyContent)
}

pub fn normalize_content(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn normalize_entry_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyEntryId)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_content(&buffer))
}

pub fn capture_editor_input_with_initial(
    initial_content: &str,
) -> Result<Option<String>, CliError> {
    let editor = preferred_editor();
    let temp_file = create_temp_entry_file_path();
    std::fs::write(&temp_file, initial_content)?;

    let launch_result = launch_editor(&editor, &temp_file);
    let text = std::fs::read_to_string(&temp_file)?;
    let _ = std::fs::remove_file(&temp_file);

    launch_result?;
    Ok(normalize_content(&text))
}

pub fn launch_editor(editor: &str, file_path: &Path) -> Result<(), CliError> {
    match Command::new(editor).arg(file_path).status() {
        Ok(status) => {
            if status.success() {
                Ok(())
            } else {
                Err(CliError::EditorFailed(format!(
                    "`{editor}` exited with status {status}"
                )))
            }
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            let mut parts = editor.split_whitespace();
            let Some(program) = parts.next() else {
                return Err(CliError::EditorFailed("empty EDITOR command".into()));
            };

            let mut command = Command::new(program);
            command.args(parts).arg(file_path);

            let status = command.status()?;
            if status.success() {
                Ok(())
            } else {
                Err(CliError::EditorFailed(format!(
                    "`{editor}` exited with status {status}"
                )))
            }
        }
        Err(err) => Err(CliError::Io(err)),
    }
}

pub fn preferred_editor() -> String {
    env::var("VISUAL")
        .or_else(|_| env::var("EDITOR"))
        .unwrap_or_else(|_| default_editor().to_string())
}

pub const fn default_editor() -> &'static str {
    if cfg!(windows) {
        "notepad"
    } else {
        "vi"
    }
}

fn create_temp_entry_file_path() -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    env::temp_dir().join(format!("mindful-entry-{}-{now}.md", std::process::id()))
}
