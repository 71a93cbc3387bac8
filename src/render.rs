//! Terminal rendering for exchcal types using owo_colors.

use std::fmt::Write;

use chrono::NaiveDate;
use exchcal_core::SimpleEvent;
use owo_colors::OwoColorize;

pub trait Render {
    fn render(&self) -> String;
}

impl Render for SimpleEvent {
    fn render(&self) -> String {
        let time = if self.is_all_day {
            format!("{:>13}", "all-day")
        } else {
            format!(
                "{} - {}",
                self.start.format("%H:%M"),
                self.end.format("%H:%M")
            )
        };

        let mut line = format!("  {} {}", time, self.subject);
        if let Some(kind) = &self.kind {
            let tag = format!("[{kind}]");
            let _ = write!(line, " {}", tag.yellow());
        }
        if let Some(location) = &self.location {
            let _ = write!(line, " {}", location.dimmed());
        }
        line
    }
}

/// Human label for a day relative to `today` (e.g. "Today", "Yesterday", "Wed Feb 25")
pub fn date_label(date: NaiveDate, today: NaiveDate) -> String {
    match (date - today).num_days() {
        0 => "Today".to_string(),
        -1 => "Yesterday".to_string(),
        1 => "Tomorrow".to_string(),
        _ => date.format("%a %b %-d %Y").to_string(),
    }
}

/// Seconds as hours and minutes (e.g. "7h 30m", "45m", "24h")
pub fn format_seconds(secs: i64) -> String {
    let minutes = (secs + 30) / 60;
    let (hours, minutes) = (minutes / 60, minutes % 60);

    match (hours, minutes) {
        (0, m) => format!("{m}m"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h {m}m"),
    }
}
