use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use exchcal_core::Moment;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
];

/// Parse YYYY-MM-DD
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| anyhow::anyhow!("Invalid date '{}'. Expected YYYY-MM-DD", input))
}

/// Parse a date or date/time. A bare date means local midnight, a value
/// without offset is local time, an RFC 3339 value keeps its offset.
pub fn parse_moment(input: &str) -> Result<Moment> {
    let input = input.trim();

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(date.into());
    }

    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(naive.into());
        }
    }

    if let Ok(zoned) = DateTime::parse_from_rfc3339(input) {
        return Ok(zoned.into());
    }

    anyhow::bail!(
        "Could not parse date/time '{}'. Expected YYYY-MM-DD or YYYY-MM-DDTHH:MM",
        input
    )
}

/// Like `parse_moment`, but a bare date means the end of that day.
pub fn parse_range_end(input: &str) -> Result<Moment> {
    match parse_date(input) {
        Ok(date) => {
            let next = date
                .succ_opt()
                .ok_or_else(|| anyhow::anyhow!("Date '{}' is out of range", input))?;
            Ok(next.into())
        }
        Err(_) => parse_moment(input),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    #[test]
    fn bare_date_is_midnight() {
        assert_eq!(
            parse_moment("2025-03-20").unwrap(),
            Moment::Naive(day(3, 20).and_hms_opt(0, 0, 0).unwrap())
        );
    }

    #[test]
    fn date_and_time_is_local() {
        let expected = Moment::Naive(day(3, 20).and_hms_opt(15, 30, 0).unwrap());

        assert_eq!(parse_moment("2025-03-20T15:30").unwrap(), expected);
        assert_eq!(parse_moment("2025-03-20 15:30").unwrap(), expected);
        assert_eq!(parse_moment("2025-03-20T15:30:00").unwrap(), expected);
    }

    #[test]
    fn offset_is_kept() {
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let expected = offset.with_ymd_and_hms(2025, 3, 20, 15, 30, 0).unwrap();

        assert_eq!(
            parse_moment("2025-03-20T15:30:00+02:00").unwrap(),
            Moment::Zoned(expected)
        );
    }

    #[test]
    fn range_end_date_covers_whole_day() {
        assert_eq!(parse_range_end("2025-03-20").unwrap(), Moment::from(day(3, 21)));
        assert_eq!(
            parse_range_end("2025-03-20T12:00").unwrap(),
            Moment::Naive(day(3, 20).and_hms_opt(12, 0, 0).unwrap())
        );
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_moment("next tuesday").is_err());
        assert!(parse_date("2025-13-01").is_err());
    }
}
