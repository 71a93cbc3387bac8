use anyhow::Result;
use chrono::{Duration, Local, NaiveTime};
use exchcal_core::{Moment, Settings, SimpleEvent};
use owo_colors::OwoColorize;

use super::DEFAULT_LOOKBACK_DAYS;
use crate::render::{Render, date_label};
use crate::utils::dates::{parse_moment, parse_range_end};

pub async fn run(settings: &Settings, from: Option<&str>, to: Option<&str>, all: bool) -> Result<()> {
    let start = match from {
        Some(s) => parse_moment(s)?,
        None => {
            let day = Local::now().date_naive() - Duration::days(DEFAULT_LOOKBACK_DAYS);
            Moment::from(day.and_time(NaiveTime::MIN))
        }
    };
    let end = to.map(parse_range_end).transpose()?;

    let exchange = super::connect(settings).await?;

    let mut events: Vec<SimpleEvent> = if all {
        exchange.get_events(start, end).await?
    } else {
        exchange
            .get_events_filtered(start, end)
            .await?
            .collect::<Result<_, _>>()?
    };

    if events.is_empty() {
        println!("{}", "No events found".dimmed());
        return Ok(());
    }

    events.sort_by_key(|e| e.start);

    let today = Local::now().date_naive();
    let mut current_date = None;

    for event in &events {
        let date = event.start.date_naive();

        if current_date != Some(date) {
            if current_date.is_some() {
                println!();
            }
            println!("{}", date_label(date, today).bold());
            current_date = Some(date);
        }

        println!("{}", event.render());
    }

    Ok(())
}
