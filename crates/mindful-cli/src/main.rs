//! Mindful CLI - journal, mood and wellness tips from the terminal
//!
//! Entries are stored locally first and mirrored to a remote libSQL database
//! whenever one is configured and reachable.

mod cli;
mod commands;
mod error;
mod lazy_remote;
mod offline_remote;


use clap::{CommandFactory, Parser};

use crate::cli::{Cli, Commands};
use crate::commands::add::run_add;
use crate::commands::common::AppContext;
use crate::commands::delete::run_delete;
use crate::commands::edit::run_edit;
use crate::commands::export::run_export;
use crate::commands::list::run_list;
use crate::commands::mood::run_mood;
use crate::commands::sync::{run_pending, run_sync};
use crate::commands::tip::run_tip;
use crate::commands::watch::run_watch;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "mindful=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let context = AppContext::resolve(cli.data_dir, cli.config, cli.offline)?;

    match cli.command {
        Some(Commands::Add { text, mood, tags }) => {
            run_add(&text, mood.as_deref(), &tags, &context).await?;
        }
        Some(Commands::List {
            limit,
            mood,
            tag,
            json,
        }) => {
            run_list(limit, mood.as_deref(), tag.as_deref(), json, &context).await?;
        }
        Some(Commands::Edit {
            id,
            text,
            mood,
            tags,
        }) => run_edit(&id, &text, mood.as_deref(), &tags, &context).await?,
        Some(Commands::Delete { id }) => run_delete(&id, &context).await?,
        Some(Commands::Sync) => run_sync(&context).await?,
        Some(Commands::Pending { json }) => run_pending(json, &context).await?,
        Some(Commands::Watch) => run_watch(&context).await?,
        Some(Commands::Mood { command }) => run_mood(&command, &context).await?,
        Some(Commands::Tip { another }) => run_tip(another),
        Some(Commands::Export { format, output }) => {
            run_export(format, output.as_deref(), &context).await?;
        }
        None => {
            // Quick capture mode: mindful "my thought"
            if cli.entry.is_empty() {
                Cli::command().print_help().map_err(CliError::Io)?;
                println!();
            } else {
                run_add(&cli.entry, None, &[], &context).await?;
            }
        }
    }

    Ok(())
}
