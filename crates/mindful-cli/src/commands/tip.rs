use chrono::Local;
use mindful_core::tips::{alternative_tip, daily_tip, WellnessTip};

pub fn run_tip(another: bool) {
    let tip = if another {
        alternative_tip(&mut rand::thread_rng())
    } else {
        daily_tip(Local::now().date_naive())
    };
    println!("{}", format_tip(&tip));
}

pub fn format_tip(tip: &WellnessTip) -> String {
    format!("\"{}\"\n  - {}", tip.quote, tip.author)
}
