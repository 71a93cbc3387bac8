//! Calendar event types.
//!
//! `RawEvent` is the provider's event as it comes off the wire. `SimpleEvent`
//! wraps one with local start/end times and the regex class its subject
//! matched. `NewEvent` describes an event to create.

use chrono::{
    DateTime, Duration, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta,
    TimeZone, Utc,
};
use serde::{Deserialize, Serialize};

use crate::error::{ExchError, ExchResult};

const WIRE_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Wall-clock time plus the zone it is expressed in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateTimeTimeZone {
    pub date_time: String,
    #[serde(default)]
    pub time_zone: Option<String>,
}

impl DateTimeTimeZone {
    pub fn naive(&self) -> ExchResult<NaiveDateTime> {
        NaiveDateTime::parse_from_str(self.date_time.trim_end_matches('Z'), WIRE_DATETIME_FORMAT)
            .map_err(|e| ExchError::Time(format!("Invalid dateTime '{}': {}", self.date_time, e)))
    }

    /// The instant this value denotes, in the local time zone.
    pub fn to_local(&self) -> ExchResult<DateTime<Local>> {
        let naive = self.naive()?;

        match self.time_zone.as_deref().map(str::trim) {
            None | Some("") | Some("UTC") | Some("Etc/UTC") | Some("tzone://Microsoft/Utc") => {
                Ok(naive.and_utc().with_timezone(&Local))
            }
            Some(name) => {
                let tz: chrono_tz::Tz = name
                    .parse()
                    .map_err(|_| ExchError::Time(format!("Unsupported time zone '{name}'")))?;
                localize(&tz, naive).map(|dt| dt.with_timezone(&Local))
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailAddress {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    pub email_address: EmailAddress,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// A calendar event as returned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    pub id: String,
    #[serde(default)]
    pub subject: Option<String>,
    pub start: DateTimeTimeZone,
    pub end: DateTimeTimeZone,
    #[serde(default)]
    pub is_all_day: bool,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub show_as: Option<String>,
    #[serde(default)]
    pub attendees: Vec<Attendee>,
}

impl RawEvent {
    pub fn subject(&self) -> &str {
        self.subject.as_deref().unwrap_or_default()
    }

    pub fn location_name(&self) -> Option<&str> {
        self.location
            .as_ref()
            .and_then(|l| l.display_name.as_deref())
            .filter(|name| !name.trim().is_empty())
    }
}

/// A fetched event with local times and its regex class.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleEvent {
    pub start: DateTime<Local>,
    pub end: DateTime<Local>,
    pub elapsed: TimeDelta,
    pub is_all_day: bool,
    /// Label of the first regex class the subject matched
    pub kind: Option<String>,
    pub location: Option<String>,
    pub subject: String,
    pub raw: RawEvent,
}

impl SimpleEvent {
    /// Wrap `raw`. All-day events are read as local dates spanning 00:00:00
    /// of the first day to 23:59:59 of the last day.
    pub fn from_raw(raw: RawEvent, kind: Option<String>) -> ExchResult<Self> {
        let (start, end) = if raw.is_all_day {
            let first = raw.start.naive()?.date();
            let mut last = raw.end.naive()?.date();
            // The service reports all-day ends as the following midnight.
            if last > first && raw.end.naive()?.time() == NaiveTime::MIN {
                last = last.pred_opt().unwrap_or(last);
            }
            (
                localize(&Local, first.and_time(NaiveTime::MIN))?,
                localize(&Local, last.and_time(end_of_day()))?,
            )
        } else {
            (raw.start.to_local()?, raw.end.to_local()?)
        };

        Ok(SimpleEvent {
            start,
            end,
            elapsed: end - start,
            is_all_day: raw.is_all_day,
            kind,
            location: raw.location_name().map(str::to_string),
            subject: raw.subject().to_string(),
            raw,
        })
    }
}

/// A point in time given either with or without a zone.
/// Zone-less values are read as local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Moment {
    Naive(NaiveDateTime),
    Zoned(DateTime<FixedOffset>),
}

impl Moment {
    pub fn resolve(self) -> ExchResult<DateTime<Local>> {
        match self {
            Moment::Naive(naive) => localize(&Local, naive),
            Moment::Zoned(dt) => Ok(dt.with_timezone(&Local)),
        }
    }

    pub fn now() -> Self {
        Moment::Zoned(Local::now().fixed_offset())
    }
}

impl From<NaiveDateTime> for Moment {
    fn from(naive: NaiveDateTime) -> Self {
        Moment::Naive(naive)
    }
}

impl From<NaiveDate> for Moment {
    fn from(date: NaiveDate) -> Self {
        Moment::Naive(date.and_time(NaiveTime::MIN))
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for Moment {
    fn from(dt: DateTime<Tz>) -> Self {
        Moment::Zoned(dt.fixed_offset())
    }
}

/// An event to be created on the calendar.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub start: Moment,
    pub end: Moment,
    pub subject: String,
    /// Required attendees (email addresses)
    pub attendees: Vec<String>,
    /// Usually the URL of an online meeting
    pub location: Option<String>,
    pub is_all_day: bool,
    pub categories: Vec<String>,
    /// Show as free instead of blocking the calendar
    pub free: bool,
}

impl NewEvent {
    pub fn new(start: impl Into<Moment>, end: impl Into<Moment>, subject: impl Into<String>) -> Self {
        NewEvent {
            start: start.into(),
            end: end.into(),
            subject: subject.into(),
            attendees: Vec::new(),
            location: None,
            is_all_day: false,
            categories: Vec::new(),
            free: false,
        }
    }

    /// An all-day event covering `date` (local midnight to the next midnight).
    pub fn all_day(date: NaiveDate, subject: impl Into<String>) -> Self {
        let next = date.succ_opt().unwrap_or(date);
        NewEvent {
            is_all_day: true,
            ..NewEvent::new(date, next, subject)
        }
    }

    pub fn attendees<I, S>(mut self, attendees: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attendees = attendees.into_iter().map(Into::into).collect();
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn free(mut self, free: bool) -> Self {
        self.free = free;
        self
    }

    /// Start and end resolved to local time, checked for order.
    pub fn window(&self) -> ExchResult<(DateTime<Local>, DateTime<Local>)> {
        let start = self.start.resolve()?;
        let end = self.end.resolve()?;
        if end <= start {
            return Err(ExchError::Time(format!(
                "Event end {end} is not after its start {start}"
            )));
        }
        Ok((start, end))
    }
}

/// Attach `tz` to a wall-clock time. Ambiguous times (DST fall-back) take
/// the earlier instant; non-existent times (DST spring-forward) are errors.
pub(crate) fn localize<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> ExchResult<DateTime<Tz>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| ExchError::Time(format!("{naive} does not exist in the local time zone")))
}

fn end_of_day() -> NaiveTime {
    NaiveTime::MIN + Duration::seconds(86_399)
}

/// Format a UTC instant the way the calendar API expects `dateTime` values.
pub(crate) fn wire_datetime(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S").to_string()
}
