use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] mindful_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No entry text provided")]
    EmptyContent,
    #[error("Edited entry text cannot be empty")]
    EmptyEditedContent,
    #[error("Entry ID cannot be empty")]
    EmptyEntryId,
    #[error("Entry not found for id/prefix: {0}")]
    EntryNotFound(String),
    #[error("{0}")]
    AmbiguousEntryId(String),
    #[error("Editor command failed: {0}")]
    EditorFailed(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(
        "Sync is not configured. Set MINDFUL_REMOTE_URL and MINDFUL_REMOTE_TOKEN, or add remote_url to the config file."
    )]
    SyncNotConfigured,
}
