use anyhow::Result;
use exchcal_core::Settings;
use owo_colors::OwoColorize;

use super::EventDetails;
use crate::utils::dates::parse_date;

pub async fn run(settings: &Settings, date: &str, details: EventDetails) -> Result<()> {
    let date = parse_date(date)?;

    let exchange = super::connect(settings).await?;
    let created = exchange
        .new_all_day_event(
            date,
            details.subject,
            details.attendees,
            details.location,
            details.categories,
            details.free,
        )
        .await?;

    println!("{}", format!("  Created: {}", created.subject()).green());
    println!("  {} (all day)", date.format("%a %Y-%m-%d"));

    Ok(())
}
