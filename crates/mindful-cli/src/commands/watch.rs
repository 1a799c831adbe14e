use chrono::Utc;
use mindful_core::connectivity::{spawn_http_probe, HttpProbe};

use crate::commands::common::{format_entry_lines, open_journal, AppContext};
use crate::error::CliError;

const DEFAULT_PROBE_INTERVAL_SECS: u64 = 15;

/// Keep the service running, printing the journal on every change until Ctrl-C
pub async fn run_watch(context: &AppContext) -> Result<(), CliError> {
    let session = open_journal(context).await?;
    let mut updates = session.service.subscribe();

    let probe_task = match context.config.probe_url() {
        Some(url) if !context.offline && context.remote_configured() => {
            let interval = context
                .config
                .poll_interval()
                .unwrap_or(std::time::Duration::from_secs(DEFAULT_PROBE_INTERVAL_SECS));
            Some(spawn_http_probe(
                session.connectivity.clone(),
                HttpProbe::new(url)?,
                interval,
            ))
        }
        _ => None,
    };

    print_snapshot(&updates.borrow_and_update());
    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                print_snapshot(&updates.borrow_and_update());
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    if let Some(task) = probe_task {
        task.abort();
    }
    session.service.shutdown();
    Ok(())
}

fn print_snapshot(entries: &[mindful_core::JournalEntry]) {
    let refs = entries.iter().collect::<Vec<_>>();
    println!("--- {} entries ---", entries.len());
    for line in format_entry_lines(&refs, Utc::now().timestamp_millis()) {
        println!("{line}");
    }
}
