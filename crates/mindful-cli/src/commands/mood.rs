use chrono::Local;
use mindful_core::models::KNOWN_MOODS;
use mindful_core::mood::{format_mood_timestamp, MoodService};

use crate::cli::MoodCommands;
use crate::commands::common::{open_store, AppContext};
use crate::error::CliError;

pub async fn run_mood(command: &MoodCommands, context: &AppContext) -> Result<(), CliError> {
    let service = MoodService::open(open_store(context).await?).await?;

    match command {
        MoodCommands::Set { mood } => {
            let entry = service.save_mood(mood).await?;
            if !KNOWN_MOODS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(&entry.mood))
            {
                tracing::info!("'{}' is not one of: {}", entry.mood, KNOWN_MOODS.join(", "));
            }
            println!("{} ({})", entry.mood, entry.color);
        }
        MoodCommands::Show => match service.current() {
            Some(entry) => println!(
                "{}  {}",
                entry.mood,
                format_mood_timestamp(&entry.timestamp, &Local::now())
            ),
            None => println!("No mood recorded."),
        },
        MoodCommands::Clear => {
            service.clear().await?;
            println!("Mood cleared.");
        }
    }

    Ok(())
}
