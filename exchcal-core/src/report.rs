//! Per-day time accounting for classified events.

use std::collections::BTreeMap;

use chrono::{DateTime, Days, NaiveDate, TimeZone, Timelike};

use crate::event::SimpleEvent;

const SECS_PER_DAY: i64 = 86_400;

/// Seconds spent per class on one day.
pub type DayTotals = BTreeMap<String, i64>;

/// `date -> class -> seconds`, ordered by date.
pub type DailyReport = BTreeMap<NaiveDate, DayTotals>;

/// Seconds an event occupies on each day it touches, starting with the
/// day it starts on.
///
/// Events lasting a day or less are booked entirely to their start day.
/// Longer events give the first day the time left until midnight and every
/// following day at most a full day. Days are counted on the wall clock, so
/// a daylight-saving change does not shift or repeat dates.
pub fn daily_seconds(event: &SimpleEvent) -> Vec<(NaiveDate, i64)> {
    split_by_day(&event.start, &event.end)
}

/// Wall-clock split of `[start, end)` in the zone both ends are given in.
pub fn split_by_day<Tz: TimeZone>(
    start: &DateTime<Tz>,
    end: &DateTime<Tz>,
) -> Vec<(NaiveDate, i64)> {
    let start = start.naive_local();
    let mut remaining = (end.naive_local() - start).num_seconds().max(0);

    let first_day = if remaining > SECS_PER_DAY {
        SECS_PER_DAY - i64::from(start.time().num_seconds_from_midnight())
    } else {
        remaining
    };

    let mut chunks = vec![first_day];
    remaining -= first_day;
    while remaining > 0 {
        chunks.push(remaining.min(SECS_PER_DAY));
        remaining -= SECS_PER_DAY;
    }

    chunks
        .into_iter()
        .enumerate()
        .map(|(offset, secs)| (start.date() + Days::new(offset as u64), secs))
        .collect()
}

/// Sum labelled events into a per-day report. Unlabelled events are skipped.
pub fn per_day_report<'a, I>(events: I) -> DailyReport
where
    I: IntoIterator<Item = &'a SimpleEvent>,
{
    let mut report = DailyReport::new();

    for event in events {
        let Some(kind) = event.kind.as_deref() else {
            continue;
        };
        for (date, secs) in daily_seconds(event) {
            *report
                .entry(date)
                .or_default()
                .entry(kind.to_string())
                .or_insert(0) += secs;
        }
    }

    report
}
