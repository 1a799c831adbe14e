//! Mood model

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::journal_entry::format_entry_date;

/// Moods offered by the mood picker, in display order
pub const KNOWN_MOODS: [&str; 6] = ["Happy", "Sad", "Angry", "Excited", "Anxious", "Calm"];

/// Display color and icon associated with a mood
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoodPalette {
    pub color: &'static str,
    pub icon: &'static str,
}

const FALLBACK_PALETTE: MoodPalette = MoodPalette {
    color: "#FFFFFF",
    icon: "help-outline",
};

/// Look up the palette for a mood label (case-insensitive).
///
/// Unknown labels get a neutral white color and a help icon.
#[must_use]
pub fn mood_palette(mood: &str) -> MoodPalette {
    let (color, icon) = match mood.trim().to_ascii_lowercase().as_str() {
        "happy" => ("#FFECB3", "happy-outline"),
        "sad" => ("#A7C7E7", "sad-outline"),
        "angry" => ("#FF8A80", "thunderstorm-outline"),
        "excited" => ("#FFCC80", "flame-outline"),
        "calm" => ("#A8D5BA", "leaf-outline"),
        "anxious" => ("#D1A1D1", "alert-circle-outline"),
        _ => return FALLBACK_PALETTE,
    };
    MoodPalette { color, icon }
}

/// The user's current mood
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodEntry {
    pub mood: String,
    pub color: String,
    pub icon: String,
    /// RFC 3339 timestamp of when the mood was recorded
    pub timestamp: String,
}

impl MoodEntry {
    /// Record a mood now, resolving its palette
    #[must_use]
    pub fn new(mood: impl Into<String>) -> Self {
        let mood = mood.into();
        let palette = mood_palette(&mood);
        Self {
            color: palette.color.to_string(),
            icon: palette.icon.to_string(),
            timestamp: format_entry_date(Utc::now()),
            mood,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_moods_have_palettes() {
        for mood in KNOWN_MOODS {
            assert_ne!(mood_palette(mood), FALLBACK_PALETTE, "{mood}");
        }
    }

    #[test]
    fn test_palette_is_case_insensitive() {
        assert_eq!(mood_palette("calm").color, "#A8D5BA");
        assert_eq!(mood_palette(" ANGRY ").icon, "thunderstorm-outline");
    }

    #[test]
    fn test_unknown_mood_falls_back() {
        let entry = MoodEntry::new("Tired");
        assert_eq!(entry.color, "#FFFFFF");
        assert_eq!(entry.icon, "help-outline");
        assert_eq!(entry.mood, "Tired");
    }
}
