//! The `Exchange` handle: an authenticated calendar plus the regex classes
//! used to label its events.

use chrono::{DateTime, Local, NaiveDate, Utc};
use tracing::{debug, info};

use crate::auth::{AuthPrompt, Authenticator};
use crate::classes::RegexMap;
use crate::config::Settings;
use crate::error::ExchResult;
use crate::event::{Moment, NewEvent, RawEvent, SimpleEvent};
use crate::graph::{CalendarService, GraphCalendar};
use crate::report::{self, DailyReport};
use crate::token::TokenStore;

pub struct Exchange {
    service: Box<dyn CalendarService>,
    regex_map: RegexMap,
}

impl Exchange {
    /// Log in (reusing or refreshing the stored token where possible) and
    /// open the configured account's calendar.
    pub async fn connect(settings: &Settings, prompt: &dyn AuthPrompt) -> ExchResult<Self> {
        let auth = Authenticator::new(&settings.oauth, TokenStore::new(&settings.token_file))?;
        let token = auth.login(prompt).await?;

        let calendar = GraphCalendar::new(
            settings.oauth.api_base.as_str(),
            settings.account.as_str(),
            token.access_token,
        )?;
        info!(account = %settings.account, "connected to calendar");

        Ok(Self::with_service(calendar, settings.regex_map.clone()))
    }

    pub fn with_service(service: impl CalendarService + 'static, regex_map: RegexMap) -> Self {
        Self {
            service: Box::new(service),
            regex_map,
        }
    }

    pub fn regex_map(&self) -> &RegexMap {
        &self.regex_map
    }

    /// Every event overlapping `[start, end)`, labelled where a class
    /// matches. `end` defaults to now.
    pub async fn get_events(
        &self,
        start: impl Into<Moment>,
        end: Option<Moment>,
    ) -> ExchResult<Vec<SimpleEvent>> {
        let raw = self.fetch(start.into(), end).await?;

        raw.into_iter()
            .map(|event| {
                let kind = self.regex_map.classify(event.subject()).map(str::to_string);
                SimpleEvent::from_raw(event, kind)
            })
            .collect()
    }

    /// Events in `[start, end)` whose subject matches one of the regex
    /// classes, each labelled with the first class it matched. `end`
    /// defaults to now.
    ///
    /// Events are fetched up front; wrapping and filtering happen as the
    /// returned iterator is consumed.
    pub async fn get_events_filtered(
        &self,
        start: impl Into<Moment>,
        end: Option<Moment>,
    ) -> ExchResult<FilteredEvents<'_>> {
        let raw = self.fetch(start.into(), end).await?;

        Ok(FilteredEvents {
            raw: raw.into_iter(),
            regex_map: &self.regex_map,
        })
    }

    /// Seconds per day and class for the filtered events in range.
    pub async fn per_day_report(
        &self,
        start: impl Into<Moment>,
        end: Option<Moment>,
    ) -> ExchResult<DailyReport> {
        let events = self
            .get_events_filtered(start, end)
            .await?
            .collect::<ExchResult<Vec<_>>>()?;

        Ok(report::per_day_report(&events))
    }

    /// Create `event` on the calendar, inviting its attendees.
    pub async fn new_event(&self, event: NewEvent) -> ExchResult<RawEvent> {
        event.window()?;
        let created = self.service.create_event(&event).await?;
        info!(subject = %event.subject, all_day = event.is_all_day, "created event");
        Ok(created)
    }

    /// Create an all-day event on `date`.
    pub async fn new_all_day_event(
        &self,
        date: NaiveDate,
        subject: impl Into<String>,
        attendees: Vec<String>,
        location: Option<String>,
        categories: Vec<String>,
        free: bool,
    ) -> ExchResult<RawEvent> {
        let mut event = NewEvent::all_day(date, subject)
            .attendees(attendees)
            .categories(categories)
            .free(free);
        event.location = location;

        self.new_event(event).await
    }

    async fn fetch(&self, start: Moment, end: Option<Moment>) -> ExchResult<Vec<RawEvent>> {
        let start: DateTime<Local> = start.resolve()?;
        let end: DateTime<Local> = end.unwrap_or_else(Moment::now).resolve()?;

        debug!(%start, %end, "listing events");
        let events = self
            .service
            .list_events(start.with_timezone(&Utc), end.with_timezone(&Utc))
            .await?;
        debug!(count = events.len(), "listed events");

        Ok(events)
    }
}

/// Labelled events, produced on demand from one fetched batch.
pub struct FilteredEvents<'a> {
    raw: std::vec::IntoIter<RawEvent>,
    regex_map: &'a RegexMap,
}

impl Iterator for FilteredEvents<'_> {
    type Item = ExchResult<SimpleEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        for event in self.raw.by_ref() {
            match self.regex_map.classify(event.subject()) {
                Some(label) => {
                    let label = label.to_string();
                    return Some(SimpleEvent::from_raw(event, Some(label)));
                }
                None => debug!(subject = %event.subject(), "no class matched"),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExchError;
    use crate::event::DateTimeTimeZone;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorded {
        ranges: Vec<(DateTime<Utc>, DateTime<Utc>)>,
        created: Vec<NewEvent>,
    }

    #[derive(Clone)]
    struct FakeCalendar {
        events: Vec<RawEvent>,
        recorded: Arc<Mutex<Recorded>>,
    }

    impl FakeCalendar {
        fn new(events: Vec<RawEvent>) -> Self {
            Self {
                events,
                recorded: Arc::default(),
            }
        }
    }

    #[async_trait]
    impl CalendarService for FakeCalendar {
        async fn list_events(
            &self,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
        ) -> ExchResult<Vec<RawEvent>> {
            self.recorded.lock().unwrap().ranges.push((start, end));
            Ok(self.events.clone())
        }

        async fn create_event(&self, event: &NewEvent) -> ExchResult<RawEvent> {
            self.recorded.lock().unwrap().created.push(event.clone());
            Ok(raw("new", &event.subject, "2024-06-03T09:00:00", "2024-06-03T10:00:00"))
        }
    }

    fn raw(id: &str, subject: &str, start: &str, end: &str) -> RawEvent {
        RawEvent {
            id: id.into(),
            subject: Some(subject.into()),
            start: DateTimeTimeZone {
                date_time: start.into(),
                time_zone: Some("UTC".into()),
            },
            end: DateTimeTimeZone {
                date_time: end.into(),
                time_zone: Some("UTC".into()),
            },
            is_all_day: false,
            location: None,
            categories: vec![],
            show_as: None,
            attendees: vec![],
        }
    }

    fn calendar() -> FakeCalendar {
        FakeCalendar::new(vec![
            raw("1", "Standup", "2024-06-03T09:00:00", "2024-06-03T09:15:00"),
            raw("2", "Doctor appointment", "2024-06-03T13:00:00", "2024-06-03T14:00:00"),
            raw("3", "OOO - beach", "2024-06-04T08:00:00", "2024-06-04T16:00:00"),
            raw("4", "Sick and out of office", "2024-06-05T08:00:00", "2024-06-05T09:00:00"),
        ])
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[tokio::test]
    async fn filtered_events_keep_only_matches() {
        let exchange = Exchange::with_service(calendar(), RegexMap::default());

        let events = exchange
            .get_events_filtered(day(1), Some(day(30).into()))
            .await
            .unwrap()
            .collect::<ExchResult<Vec<_>>>()
            .unwrap();

        let labelled: Vec<_> = events
            .iter()
            .map(|e| (e.raw.id.as_str(), e.kind.as_deref()))
            .collect();
        assert_eq!(
            labelled,
            vec![("2", Some("SICK")), ("3", Some("VACATION")), ("4", Some("SICK"))]
        );
    }

    #[tokio::test]
    async fn unfiltered_events_include_unlabelled() {
        let exchange = Exchange::with_service(calendar(), RegexMap::default());

        let events = exchange.get_events(day(1), Some(day(30).into())).await.unwrap();

        assert_eq!(events.len(), 4);
        assert_eq!(events[0].kind, None);
        assert_eq!(events[0].subject, "Standup");
    }

    #[tokio::test]
    async fn custom_classes_decide_labels() {
        let classes = RegexMap::from_pairs([("MEETING", "standup")]).unwrap();
        let exchange = Exchange::with_service(calendar(), classes);

        let events: Vec<_> = exchange
            .get_events_filtered(day(1), Some(day(30).into()))
            .await
            .unwrap()
            .collect::<ExchResult<_>>()
            .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind.as_deref(), Some("MEETING"));
    }

    #[tokio::test]
    async fn end_defaults_to_now() {
        let fake = calendar();
        let exchange = Exchange::with_service(fake.clone(), RegexMap::default());

        let before = Utc::now();
        exchange.get_events_filtered(day(1), None).await.unwrap();
        let after = Utc::now();

        let (_, end) = fake.recorded.lock().unwrap().ranges[0];
        assert!(end >= before - chrono::TimeDelta::seconds(1) && end <= after);
    }

    #[tokio::test]
    async fn report_totals_labelled_time() {
        let exchange = Exchange::with_service(calendar(), RegexMap::default());

        let report = exchange
            .per_day_report(day(1), Some(day(30).into()))
            .await
            .unwrap();

        let total: i64 = report.values().flat_map(|d| d.values()).sum();
        assert_eq!(total, 3600 + 8 * 3600 + 3600);
        assert!(
            report
                .values()
                .flat_map(|d| d.keys())
                .all(|k| k == "SICK" || k == "VACATION")
        );
    }

    #[tokio::test]
    async fn all_day_event_is_forwarded() {
        let fake = calendar();
        let exchange = Exchange::with_service(fake.clone(), RegexMap::default());

        exchange
            .new_all_day_event(
                day(10),
                "Vacation",
                vec!["boss@example.com".into()],
                None,
                vec!["PTO".into()],
                true,
            )
            .await
            .unwrap();

        let created = &fake.recorded.lock().unwrap().created[0];
        assert!(created.is_all_day);
        assert!(created.free);
        assert_eq!(created.attendees, vec!["boss@example.com".to_string()]);
        assert_eq!(created.categories, vec!["PTO".to_string()]);
        assert_eq!(created.start, Moment::from(day(10)));
        assert_eq!(created.end, Moment::from(day(11)));
    }

    #[tokio::test]
    async fn inverted_event_is_rejected_locally() {
        let fake = calendar();
        let exchange = Exchange::with_service(fake.clone(), RegexMap::default());

        let result = exchange
            .new_event(NewEvent::new(day(2), day(1), "Backwards"))
            .await;

        assert!(matches!(result, Err(ExchError::Time(_))));
        assert!(fake.recorded.lock().unwrap().created.is_empty());
    }
}
