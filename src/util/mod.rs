//! Shared utilities for `bug_trends`.
//!
//! - Calendar-day parsing, sentinels and window arithmetic
//! - Display-width aware text truncation

pub mod time;

pub use time::{DateSpec, RECENT_WINDOW_DAYS, format_day, parse_day, today_utc};

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Truncate `text` to at most `max_width` terminal columns, appending `...`
/// when anything was cut.
#[must_use]
pub fn truncate_display(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    if max_width <= 3 {
        return ".".repeat(max_width);
    }

    let budget = max_width - 3;
    let mut width = 0;
    let mut out = String::new();
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if width + w > budget {
            break;
        }
        width += w;
        out.push(ch);
    }
    out.push_str("...");
    out
}

/// Pad `text` with spaces to `width` terminal columns.
#[must_use]
pub fn pad_display(text: &str, width: usize) -> String {
    let current = text.width();
    if current >= width {
        return text.to_string();
    }
    format!("{text}{}", " ".repeat(width - current))
}
