//! Text layout for records and console lines
//!
//! Header: one line per field, every line led by the mood symbol.
//! Body: a blank line, then labelled sections, then two blank lines.
//! Each body section marks its lines with its own leader:
//! - `##` state
//! - `!!` exception
//! - `>>` traceback
//! - `$$` locals

use chrono::{DateTime, TimeZone};
use colored::*;
use serde::Serialize;

use super::entry::Grumble;
use crate::errors::GrumbleResult;

/// Timestamp format used in headers and console lines
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Marks the log path on the console line
pub const DISK_MARKER: &str = "💾";

/// Everything the header needs besides the entry itself
#[derive(Debug, Clone)]
pub struct HeaderFields<'a> {
    pub mood: &'a str,
    pub fingerprint: &'a str,
    pub clock: &'a str,
    pub timestamp: &'a str,
}

pub fn format_timestamp<Tz>(now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    now.format(TIMESTAMP_FORMAT).to_string()
}

/// Render a value to pretty-printed text
pub fn render_value<S: Serialize + ?Sized>(value: &S) -> GrumbleResult<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Prefix every line of `text` with `leader`
pub fn prefix_lines(text: &str, leader: &str) -> String {
    text.lines()
        .map(|line| format!("{}{}", leader, line))
        .collect::<Vec<String>>()
        .join("\n")
}

pub fn build_header(fields: &HeaderFields<'_>, entry: &Grumble) -> String {
    let mood = fields.mood;
    let mut lines = vec![
        mood.to_string(),
        format!("{}  Grumble ID:  {}", mood, fields.fingerprint),
        format!("{}   Timestamp:  {} {}", mood, fields.clock, fields.timestamp),
    ];

    if let Some(category) = &entry.category {
        lines.push(format!("{}    Category:  {}", mood, category));
    }

    if let Some(message) = &entry.message {
        lines.push(format!("{}     Message:  {}", mood, message));
    }

    lines.push(mood.to_string());
    lines.join("\n")
}

pub fn build_body(entry: &Grumble) -> GrumbleResult<String> {
    let mut lines: Vec<String> = vec![String::new()];

    if let Some(state) = &entry.state {
        lines.push("## State:".to_string());
        lines.push(prefix_lines(&render_value(state)?, "##   "));
        lines.push("##".to_string());
        lines.push(String::new());
    }

    if let Some(error) = &entry.error {
        lines.push("!! Exception:".to_string());
        lines.push(format!("!!   Type: {}", error.type_name));
        lines.push(format!("!!   Value: {}", error.value));
        lines.push(format!("!!   String: {}", error.text));
        lines.push("!!   Attributes:".to_string());
        lines.push(prefix_lines(&render_value(&error.attributes)?, "!!     "));
        lines.push("!!".to_string());
        lines.push(String::new());
    }

    if let Some(context) = &entry.context {
        lines.push(">> Traceback:".to_string());
        lines.push(prefix_lines(&context.traceback, ">> "));
        lines.push(">>".to_string());
        lines.push(String::new());

        lines.push("$$ Locals:".to_string());
        lines.push(prefix_lines(&render_value(&context.locals.visible())?, "$$  "));
        lines.push("$$".to_string());
        lines.push(String::new());
    }

    lines.push(String::new());
    lines.push(String::new());
    Ok(lines.join("\n"))
}

/// One-line console summary pointing at the record on disk
///
/// With `styled`, the category is bold and the file reference dimmed; the
/// visible text is the same either way.
pub fn build_summary(
    fields: &HeaderFields<'_>,
    entry: &Grumble,
    shown_path: &str,
    styled: bool,
) -> String {
    let mut parts = vec![fields.mood.to_string()];

    if let Some(category) = &entry.category {
        let category = format!("[{}]", category);
        parts.push(if styled { category.bold().to_string() } else { category });
    }

    if let Some(message) = &entry.message {
        parts.push(message.clone());
    }

    let location = format!("{} {} [{}]", DISK_MARKER, shown_path, fields.fingerprint);
    let location = if styled { location.dimmed().to_string() } else { location };

    parts.push(format!("  {} {}  {}", fields.clock, fields.timestamp, location));

    parts.join(" ")
}
