//! Wellness tip of the day

use chrono::{Datelike, NaiveDate};
use rand::Rng;
use serde::Serialize;

/// A short quote shown on the home screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WellnessTip {
    pub quote: &'static str,
    pub author: &'static str,
}

const TIPS: [WellnessTip; 12] = [
    WellnessTip {
        quote: "Happiness depends upon ourselves.",
        author: "Aristoltle",
    },
    WellnessTip {
        quote: "Your mental health is a priority. Your happiness is essential.",
        author: "Unknown",
    },
    WellnessTip {
        quote: "Our bodies are our gardens, to which our wills are gardeners.",
        author: "William Shakespeare",
    },
    WellnessTip {
        quote: "Self-care is not selfish. You cannot serve from an empty vessel.",
        author: "Eleanor Brownn",
    },
    WellnessTip {
        quote: "Your body hears everything your mind says.",
        author: "Naomi Judd",
    },
    WellnessTip {
        quote: "Your body holds deep wisdom. Trust in it. Learn from it. Nourish it. \
                Watch your life transform and be healthy",
        author: "Bella Bleue",
    },
    WellnessTip {
        quote: "What drains your spirit drains your body. What fuels your spirit fuels your body",
        author: "Caroline Myss",
    },
    WellnessTip {
        quote: "I am not afraid of storms, for I am learning how to sail my ship.",
        author: "Louisa May Alcott",
    },
    WellnessTip {
        quote: "The most powerful relationship you will ever have is the relationship with yourself.",
        author: "Unknown",
    },
    WellnessTip {
        quote: "Self-care is not self-indulgence, it is self-preservation.",
        author: "Audre Lorde",
    },
    WellnessTip {
        quote: "Wellness, I came to realize, will not happen by accident. It must be a daily \
                practice, especially for those of us who are more susceptible to the \
                oppressiveness of the world",
        author: "Jenna Wortham",
    },
    WellnessTip {
        quote: "Courage doesn't always roar. Sometimes it's the quiet voice saying \
                'I will try again tomorrow'.",
        author: "Mary Anne Radmacher",
    },
];

#[must_use]
pub const fn all_tips() -> &'static [WellnessTip] {
    &TIPS
}

/// The tip for `date`; stable for a whole day, keyed on the day of the month
#[must_use]
pub fn daily_tip(date: NaiveDate) -> WellnessTip {
    TIPS[date.day() as usize % TIPS.len()]
}

/// A random tip for the "show me another" action
pub fn alternative_tip<R: Rng + ?Sized>(rng: &mut R) -> WellnessTip {
    TIPS[rng.gen_range(0..TIPS.len())]
}
