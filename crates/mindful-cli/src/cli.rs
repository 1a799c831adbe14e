use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "mindful")]
#[command(about = "Journal, track your mood and read a daily wellness tip from the terminal")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Directory holding the local journal database
    #[arg(long, global = true, value_name = "PATH")]
    pub data_dir: Option<PathBuf>,

    /// JSON config file (defaults to the platform config dir)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Work offline even when a remote mirror is configured
    #[arg(long, global = true)]
    pub offline: bool,

    /// Quick capture: mindful "felt calm after the walk"
    #[arg(trailing_var_arg = true)]
    pub entry: Vec<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a new journal entry
    #[command(alias = "new")]
    Add {
        /// Entry text (stdin or $EDITOR when omitted)
        text: Vec<String>,
        /// Mood to attach to the entry
        #[arg(short, long)]
        mood: Option<String>,
        /// Tag to attach (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },
    /// List recent entries, newest first
    List {
        /// Number of entries to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Only entries with this mood
        #[arg(long)]
        mood: Option<String>,
        /// Only entries with this tag
        #[arg(long)]
        tag: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit an existing entry
    Edit {
        /// Entry ID or unique ID prefix
        id: String,
        /// Replacement text ($EDITOR when omitted)
        text: Vec<String>,
        /// Replace the mood
        #[arg(short, long)]
        mood: Option<String>,
        /// Replace the tags (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },
    /// Delete an entry
    Delete {
        /// Entry ID or unique ID prefix
        id: String,
    },
    /// Push pending changes to the remote mirror
    Sync,
    /// Show changes waiting to be synced
    Pending {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Stay connected and print the journal whenever it changes
    Watch,
    /// Record or show your current mood
    Mood {
        #[command(subcommand)]
        command: MoodCommands,
    },
    /// Show the wellness tip of the day
    Tip {
        /// Pick a random tip instead
        #[arg(long)]
        another: bool,
    },
    /// Export the journal
    Export {
        /// Export format
        #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum MoodCommands {
    /// Set the current mood (Happy, Sad, Angry, Excited, Anxious, Calm, ...)
    Set { mood: String },
    /// Show the current mood
    Show,
    /// Forget the current mood
    Clear,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ExportFormat {
    Json,
    Markdown,
}

impl From<ExportFormat> for mindful_core::export::ExportFormat {
    fn from(format: ExportFormat) -> Self {
        match format {
            ExportFormat::Json => Self::Json,
            ExportFormat::Markdown => Self::Markdown,
        }
    }
}
