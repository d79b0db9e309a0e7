use chrono::{DateTime, FixedOffset};
use chrono_tz::Tz;

use super::event::parse_timestamp;

pub const SCRY_COUNT: i64 = 5;

/// Reserved words typed at any prompt. They never reach a command; the
/// top-level loop handles them and returns to the main menu.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlSignal {
    Scry,
    Regret,
    GetNext(i64),
    GetBetween {
        start: Option<DateTime<FixedOffset>>,
        end: Option<DateTime<FixedOffset>>,
    },
    Exit,
}

/// Applies the prompt default and recognises control words.
///
/// `next` and `between` only count as control words when the rest of the
/// line has their shape, so a plan such as "next tuesday lunch" still
/// reaches the commands as text.
pub fn parse_reply(raw: &str, default: Option<&str>, tz: &Tz) -> Result<String, ControlSignal> {
    let trimmed = raw.trim();
    let reply = if trimmed.is_empty() {
        default.unwrap_or("").trim()
    } else {
        trimmed
    };

    match reply {
        "exit" | "quit" => return Err(ControlSignal::Exit),
        "scry" => return Err(ControlSignal::Scry),
        "regret" => return Err(ControlSignal::Regret),
        _ => {}
    }

    if let Some(rest) = keyword_rest(reply, "next") {
        if rest.is_empty() {
            return Err(ControlSignal::GetNext(1));
        }
        if let Ok(count) = rest.parse::<i64>() {
            return Err(ControlSignal::GetNext(count));
        }
    }

    if let Some(rest) = keyword_rest(reply, "between") {
        if rest.is_empty() {
            return Err(ControlSignal::GetBetween {
                start: None,
                end: None,
            });
        }
        if let Some((start, end)) = split_bounds(rest, tz) {
            return Err(ControlSignal::GetBetween {
                start: Some(start),
                end: Some(end),
            });
        }
    }

    Ok(reply.to_string())
}

fn keyword_rest<'a>(reply: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = reply.strip_prefix(keyword)?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}

// "YYYY-MM-DD HH:MM YYYY-MM-DD HH:MM", an optional "to" between the bounds.
fn split_bounds(rest: &str, tz: &Tz) -> Option<(DateTime<FixedOffset>, DateTime<FixedOffset>)> {
    let parts: Vec<&str> = rest
        .split_whitespace()
        .filter(|part| *part != "to")
        .collect();
    let [start_date, start_time, end_date, end_time] = parts.as_slice() else {
        return None;
    };
    let start = parse_timestamp(&format!("{start_date} {start_time}"), tz)?;
    let end = parse_timestamp(&format!("{end_date} {end_time}"), tz)?;
    Some((start, end))
}
