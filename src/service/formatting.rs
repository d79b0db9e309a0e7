use chrono::{DateTime, Datelike, FixedOffset};

/// "Saturday the 17th of October, 2026 at 13:00"
pub fn readable_time(at: &DateTime<FixedOffset>) -> String {
    let day = at.day();
    format!(
        "{} the {}{} of {}",
        at.format("%A"),
        day,
        ordinal_suffix(day),
        at.format("%B, %Y at %H:%M")
    )
}

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

/// "Saturday, 2026-10-17 13:00", used when telling the model what "now" is.
pub fn prompt_timestamp(at: &DateTime<FixedOffset>) -> String {
    at.format("%A, %Y-%m-%d %H:%M").to_string()
}
