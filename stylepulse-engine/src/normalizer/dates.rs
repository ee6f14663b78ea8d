//! Date cell parsing.
//!
//! Exports mix ISO timestamps, US slash dates, named months and raw
//! spreadsheet serial numbers, sometimes within one file. Parsers are tried
//! in [`DATE_PARSERS`] order and the first success wins, so month-first
//! always beats day-first for ambiguous values like `03/04/2024`.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

use crate::thresholds::MAX_SPREADSHEET_SERIAL;

/// One named entry in the parser list.
pub struct DateParser {
    pub name: &'static str,
    pub parse: fn(&str) -> Option<NaiveDate>,
}

/// Ordered parser list.
pub const DATE_PARSERS: &[DateParser] = &[
    DateParser {
        name: "iso-date",
        parse: parse_iso_date,
    },
    DateParser {
        name: "iso-datetime",
        parse: parse_iso_datetime,
    },
    DateParser {
        name: "rfc3339",
        parse: parse_rfc3339,
    },
    DateParser {
        name: "us",
        parse: parse_us,
    },
    DateParser {
        name: "named-month",
        parse: parse_named_month,
    },
    DateParser {
        name: "day-first",
        parse: parse_day_first,
    },
    DateParser {
        name: "spreadsheet-serial",
        parse: parse_spreadsheet_serial,
    },
];

/// Parse a date cell. Surrounding whitespace is ignored; time-of-day and
/// offsets are dropped.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }
    DATE_PARSERS.iter().find_map(|parser| (parser.parse)(value))
}

fn plausible(date: NaiveDate) -> Option<NaiveDate> {
    (1900..=9999).contains(&date.year()).then_some(date)
}

fn first_date(value: &str, formats: &[&str]) -> Option<NaiveDate> {
    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok().and_then(plausible))
}

fn first_datetime(value: &str, formats: &[&str]) -> Option<NaiveDate> {
    formats
        .iter()
        .find_map(|fmt| {
            NaiveDateTime::parse_from_str(value, fmt)
                .ok()
                .and_then(|dt| plausible(dt.date()))
        })
}

fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    first_date(value, &["%Y-%m-%d", "%Y/%m/%d"])
}

fn parse_iso_datetime(value: &str) -> Option<NaiveDate> {
    first_datetime(
        value,
        &[
            "%Y-%m-%d %H:%M:%S",
            "%Y-%m-%dT%H:%M:%S",
            "%Y-%m-%d %H:%M:%S%.f",
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%d %H:%M",
        ],
    )
}

fn parse_rfc3339(value: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.naive_local().date())
        .and_then(plausible)
}

fn parse_us(value: &str) -> Option<NaiveDate> {
    first_date(value, &["%m/%d/%Y", "%m-%d-%Y"])
        .or_else(|| {
            first_datetime(
                value,
                &[
                    "%m/%d/%Y %H:%M:%S",
                    "%m/%d/%Y %H:%M",
                    "%m/%d/%Y %I:%M:%S %p",
                    "%m/%d/%Y %I:%M %p",
                ],
            )
        })
        .or_else(|| first_date(value, &["%m/%d/%y"]))
}

fn parse_named_month(value: &str) -> Option<NaiveDate> {
    first_date(
        value,
        &[
            "%d-%b-%Y",
            "%d %b %Y",
            "%d %B %Y",
            "%b %d, %Y",
            "%B %d, %Y",
            "%d-%b-%y",
        ],
    )
}

fn parse_day_first(value: &str) -> Option<NaiveDate> {
    first_date(value, &["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"])
}

/// Spreadsheet day numbers counted from 1899-12-30; fractions are times.
fn parse_spreadsheet_serial(value: &str) -> Option<NaiveDate> {
    let serial: f64 = value.parse().ok()?;
    if !serial.is_finite() || !(1.0..=MAX_SPREADSHEET_SERIAL).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_days(chrono::Days::new(serial.floor() as u64))
}
