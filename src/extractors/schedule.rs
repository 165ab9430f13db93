// src/extractors/schedule.rs

// --- Imports ---
use chrono::{Datelike, Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::lines::find_first_index;

// --- Constants ---
const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June",
    "July", "August", "September", "October", "November", "December",
];

// Lines after the heading that may still hold the date.
const DATE_LOOKAHEAD: usize = 3;

// --- Regex Patterns (Lazy Static) ---
static REQUESTED_START_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)requested\s+start\s+date").expect("Failed to compile REQUESTED_START_RE")
});

static NUMERIC_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([0-9]{1,2})[/\-]([0-9]{1,2})[/\-]([0-9]{4})").expect("Failed to compile NUMERIC_DATE_RE")
});

static WRITTEN_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(January|February|March|April|May|June|July|August|September|October|November|December)\s+([0-9]{1,2})(?:,?\s+([0-9]{4}))?",
    )
    .expect("Failed to compile WRITTEN_DATE_RE")
});

// --- Data Structures ---
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RequestedStart {
    pub date: Option<NaiveDate>,
    pub start_month: Option<String>,
}

/// Reads the requested start date; written dates without a year use the current year.
pub fn extract_requested_start(lines: &[String]) -> RequestedStart {
    extract_requested_start_in_year(lines, Local::now().year())
}

pub fn extract_requested_start_in_year(lines: &[String], default_year: i32) -> RequestedStart {
    let Some(idx) = find_first_index(lines, |l| REQUESTED_START_RE.is_match(l)) else {
        return RequestedStart::default();
    };

    let date = lines
        .iter()
        .skip(idx)
        .take(DATE_LOOKAHEAD + 1)
        .find_map(|line| parse_date_line(line, default_year));

    if let Some(date) = date {
        tracing::debug!("Requested start date {}", date);
        return RequestedStart {
            date: Some(date),
            start_month: Some(MONTH_NAMES[date.month0() as usize].to_string()),
        };
    }

    // No full date; a bare month name on the next line still sets the start month.
    RequestedStart {
        date: None,
        start_month: lines.get(idx + 1).and_then(|line| month_name_in(line)),
    }
}

/// Parses "MM/DD/YYYY", "MM-DD-YYYY" or "Month D[, YYYY]".
pub fn parse_date_line(line: &str, default_year: i32) -> Option<NaiveDate> {
    if let Some(caps) = NUMERIC_DATE_RE.captures(line) {
        let month = caps.get(1)?.as_str().parse().ok()?;
        let day = caps.get(2)?.as_str().parse().ok()?;
        let year = caps.get(3)?.as_str().parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    let caps = WRITTEN_DATE_RE.captures(line)?;
    let month = month_index(caps.get(1)?.as_str())? as u32 + 1;
    let day = caps.get(2)?.as_str().parse().ok()?;
    let year = match caps.get(3) {
        Some(m) => m.as_str().parse().ok()?,
        None => default_year,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

fn month_index(name: &str) -> Option<usize> {
    MONTH_NAMES.iter().position(|m| m.eq_ignore_ascii_case(name))
}

fn month_name_in(line: &str) -> Option<String> {
    let lower = line.to_lowercase();
    MONTH_NAMES
        .iter()
        .find(|m| lower.contains(&m.to_lowercase()))
        .map(|m| m.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_numeric_date_after_heading() {
        let lines = owned(&["Requested Start Date", "Week of", "3/1/2025"]);
        let start = extract_requested_start_in_year(&lines, 2024);
        assert_eq!(start.date, NaiveDate::from_ymd_opt(2025, 3, 1));
        assert_eq!(start.start_month.as_deref(), Some("March"));
    }

    #[test]
    fn test_written_date_defaults_year() {
        let lines = owned(&["Requested Start Date: june 15"]);
        let start = extract_requested_start_in_year(&lines, 2026);
        assert_eq!(start.date, NaiveDate::from_ymd_opt(2026, 6, 15));
        assert_eq!(start.start_month.as_deref(), Some("June"));
    }

    #[test]
    fn test_month_only_sets_start_month() {
        let lines = owned(&["Requested Start Date", "Early September"]);
        let start = extract_requested_start_in_year(&lines, 2026);
        assert_eq!(start.date, None);
        assert_eq!(start.start_month.as_deref(), Some("September"));
    }

    #[test]
    fn test_invalid_date_is_absent() {
        assert_eq!(parse_date_line("13/45/2025", 2025), None);
        assert_eq!(extract_requested_start_in_year(&owned(&["Timeline"]), 2025), RequestedStart::default());
    }
}
