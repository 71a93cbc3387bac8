//! Calendar service backed by the Microsoft Graph REST API.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::{ExchError, ExchResult};
use crate::event::{
    Attendee, DateTimeTimeZone, EmailAddress, Location, NewEvent, RawEvent, wire_datetime,
};

/// Ask the service to report every time in UTC.
const PREFER_UTC: &str = r#"outlook.timezone="UTC""#;
const PAGE_SIZE: &str = "100";

/// Remote calendar operations exchcal relies on.
#[async_trait]
pub trait CalendarService: Send + Sync {
    /// Every event overlapping `[start, end)`, recurring instances expanded.
    async fn list_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ExchResult<Vec<RawEvent>>;

    /// Create `event` and send invitations to its attendees.
    async fn create_event(&self, event: &NewEvent) -> ExchResult<RawEvent>;
}

pub struct GraphCalendar {
    http: reqwest::Client,
    api_base: String,
    account: String,
    access_token: String,
}

#[derive(Deserialize)]
struct EventPage {
    value: Vec<RawEvent>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

#[derive(Deserialize)]
struct GraphErrorBody {
    error: GraphError,
}

#[derive(Deserialize)]
struct GraphError {
    code: String,
    message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EventPayload {
    subject: String,
    start: DateTimeTimeZone,
    end: DateTimeTimeZone,
    is_all_day: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<Location>,
    attendees: Vec<Attendee>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    categories: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    show_as: Option<&'static str>,
}

impl GraphCalendar {
    pub fn new(
        api_base: impl Into<String>,
        account: impl Into<String>,
        access_token: impl Into<String>,
    ) -> ExchResult<Self> {
        Ok(Self {
            http: reqwest::Client::builder().build()?,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            account: account.into(),
            access_token: access_token.into(),
        })
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    /// `{api_base}/users/{account}/{tail}` with the account escaped as one
    /// path segment.
    fn mailbox_url(&self, tail: &str) -> ExchResult<Url> {
        let invalid = || ExchError::Config(format!("Invalid calendar API URL: {}", self.api_base));

        let mut url = Url::parse(&self.api_base).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .push("users")
            .push(&self.account)
            .extend(tail.split('/'));
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> ExchResult<T> {
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .header("Prefer", PREFER_UTC)
            .send()
            .await?;

        Self::read_json(response).await
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> ExchResult<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, &body));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            ExchError::Serialization(format!("Unexpected response from calendar API: {e}"))
        })
    }
}

#[async_trait]
impl CalendarService for GraphCalendar {
    async fn list_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ExchResult<Vec<RawEvent>> {
        let mut first = self.mailbox_url("calendarView")?;
        first
            .query_pairs_mut()
            .append_pair("startDateTime", &start.to_rfc3339_opts(SecondsFormat::Secs, true))
            .append_pair("endDateTime", &end.to_rfc3339_opts(SecondsFormat::Secs, true))
            .append_pair("$top", PAGE_SIZE);

        let mut events = Vec::new();
        let mut next = Some(first.to_string());

        while let Some(url) = next.take() {
            let page: EventPage = self.get_json(&url).await?;
            debug!(count = page.value.len(), more = page.next_link.is_some(), "fetched event page");
            events.extend(page.value);
            next = page.next_link;
        }

        Ok(events)
    }

    async fn create_event(&self, event: &NewEvent) -> ExchResult<RawEvent> {
        let payload = payload(event)?;

        let response = self
            .http
            .post(self.mailbox_url("calendar/events")?)
            .bearer_auth(&self.access_token)
            .header("Prefer", PREFER_UTC)
            .json(&payload)
            .send()
            .await?;

        let created: RawEvent = Self::read_json(response).await?;
        debug!(id = %created.id, subject = %created.subject(), "created event");

        Ok(created)
    }
}

fn payload(event: &NewEvent) -> ExchResult<EventPayload> {
    let (start, end) = event.window()?;

    let (start, end) = if event.is_all_day {
        // All-day events are pinned to local midnights in the local zone.
        let zone = local_zone_name();
        let midnight = |dt: DateTime<chrono::Local>| DateTimeTimeZone {
            date_time: format!("{}T00:00:00", dt.date_naive().format("%Y-%m-%d")),
            time_zone: Some(zone.clone()),
        };
        (midnight(start), midnight(end))
    } else {
        let utc = |dt: DateTime<chrono::Local>| DateTimeTimeZone {
            date_time: wire_datetime(dt.with_timezone(&Utc)),
            time_zone: Some("UTC".to_string()),
        };
        (utc(start), utc(end))
    };

    Ok(EventPayload {
        subject: event.subject.clone(),
        start,
        end,
        is_all_day: event.is_all_day,
        location: event.location.as_ref().map(|name| Location {
            display_name: Some(name.clone()),
        }),
        attendees: event
            .attendees
            .iter()
            .map(|address| Attendee {
                email_address: EmailAddress {
                    address: address.clone(),
                    name: None,
                },
                kind: Some("required".to_string()),
            })
            .collect(),
        categories: event.categories.clone(),
        show_as: event.free.then_some("free"),
    })
}

fn local_zone_name() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

fn api_error(status: StatusCode, body: &str) -> ExchError {
    let message = match serde_json::from_str::<GraphErrorBody>(body) {
        Ok(parsed) => format!("{}: {}", parsed.error.code, parsed.error.message),
        Err(_) if body.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string(),
        Err(_) => body.trim().to_string(),
    };

    ExchError::Api {
        status: status.as_u16(),
        message,
    }
}
