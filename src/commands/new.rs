use anyhow::Result;
use exchcal_core::{NewEvent, Settings};
use owo_colors::OwoColorize;

use super::EventDetails;
use crate::utils::dates::parse_moment;

pub async fn run(settings: &Settings, start: &str, end: &str, details: EventDetails) -> Result<()> {
    let mut event = NewEvent::new(parse_moment(start)?, parse_moment(end)?, details.subject)
        .attendees(details.attendees)
        .categories(details.categories)
        .free(details.free);
    event.location = details.location;

    // Fail on bad dates before going through sign-in.
    let (from, to) = event.window()?;

    let exchange = super::connect(settings).await?;
    let created = exchange.new_event(event).await?;

    println!("{}", format!("  Created: {}", created.subject()).green());
    println!(
        "  {} - {}",
        from.format("%Y-%m-%d %H:%M"),
        to.format("%Y-%m-%d %H:%M")
    );

    Ok(())
}
