//! Current mood persistence

use std::fmt::Display;
use std::sync::Arc;

use chrono::{DateTime, TimeZone};
use tokio::sync::watch;

use crate::error::{Error, Result};
use crate::models::MoodEntry;
use crate::storage::{KeyValueStore, CURRENT_MOOD_KEY};

/// Stores the user's current mood and publishes changes
pub struct MoodService {
    store: Arc<dyn KeyValueStore>,
    current: watch::Sender<Option<MoodEntry>>,
}

impl MoodService {
    /// Load the stored mood, if any.
    ///
    /// An unreadable stored value is logged and treated as no mood.
    pub async fn open(store: Arc<dyn KeyValueStore>) -> Result<Self> {
        let current = match store.get(CURRENT_MOOD_KEY).await? {
            Some(raw) => match serde_json::from_str::<MoodEntry>(&raw) {
                Ok(entry) => Some(entry),
                Err(error) => {
                    tracing::warn!("Ignoring unreadable stored mood: {error}");
                    None
                }
            },
            None => None,
        };

        let (current, _) = watch::channel(current);
        Ok(Self { store, current })
    }

    pub fn current(&self) -> Option<MoodEntry> {
        self.current.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<MoodEntry>> {
        self.current.subscribe()
    }

    /// Record `label` as the current mood, stamped now
    pub async fn save_mood(&self, label: &str) -> Result<MoodEntry> {
        let label = label.trim();
        if label.is_empty() {
            return Err(Error::InvalidInput("mood cannot be empty".to_string()));
        }

        let entry = MoodEntry::new(label);
        self.store
            .set(CURRENT_MOOD_KEY, &serde_json::to_string(&entry)?)
            .await?;
        self.current.send_replace(Some(entry.clone()));
        tracing::debug!("Current mood set to {}", entry.mood);
        Ok(entry)
    }

    pub async fn clear(&self) -> Result<()> {
        self.store.remove(CURRENT_MOOD_KEY).await?;
        self.current.send_replace(None);
        Ok(())
    }
}

/// Human-friendly rendering of a mood timestamp relative to `now`:
/// "Today at 09:15", "Yesterday at 22:40" or "2024-03-05 at 08:00".
///
/// Unparseable timestamps are returned as-is.
pub fn format_mood_timestamp<Tz>(timestamp: &str, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let Ok(parsed) = DateTime::parse_from_rfc3339(timestamp) else {
        return timestamp.to_string();
    };
    let local = parsed.with_timezone(&now.timezone());
    let time = local.format("%H:%M");

    let today = now.date_naive();
    let day = local.date_naive();
    if day == today {
        format!("Today at {time}")
    } else if today.pred_opt() == Some(day) {
        format!("Yesterday at {time}")
    } else {
        format!("{} at {time}", day.format("%Y-%m-%d"))
    }
}
