use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{Datelike, Local};
use exchcal_core::{Moment, Settings};
use owo_colors::OwoColorize;

use crate::render::format_seconds;
use crate::utils::dates::{parse_moment, parse_range_end};

pub async fn run(settings: &Settings, from: Option<&str>, to: Option<&str>) -> Result<()> {
    let start = match from {
        Some(s) => parse_moment(s)?,
        None => {
            let today = Local::now().date_naive();
            let first = today
                .with_day(1)
                .ok_or_else(|| anyhow::anyhow!("No first day for {today}"))?;
            Moment::from(first)
        }
    };
    let end = to.map(parse_range_end).transpose()?;

    let exchange = super::connect(settings).await?;
    let report = exchange.per_day_report(start, end).await?;

    if report.is_empty() {
        println!("{}", "No matching events".dimmed());
        return Ok(());
    }

    let mut totals: BTreeMap<&str, i64> = BTreeMap::new();

    for (date, classes) in &report {
        println!("{}", date.format("%a %Y-%m-%d").bold());
        for (class, secs) in classes {
            println!("  {:<12} {:>8}", class, format_seconds(*secs));
            *totals.entry(class.as_str()).or_insert(0) += secs;
        }
    }

    println!();
    println!("{}", "Total".bold());
    for (class, secs) in totals {
        println!("  {:<12} {:>8}", class, format_seconds(secs));
    }

    Ok(())
}
