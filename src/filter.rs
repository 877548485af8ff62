use chrono::{NaiveDate, NaiveDateTime};
use std::cmp::Ordering;

use crate::records::{Case, HistoryEntry, PLACEHOLDER};
use crate::session::Session;

// Two-digit-year formats come first: "%Y" would happily read "24" as year 24.
const DATE_FORMATS: &[&str] = &[
    "%d/%m/%y", "%d/%m/%Y", "%d-%m-%y", "%d-%m-%Y", "%d.%m.%y", "%d.%m.%Y", "%Y-%m-%d",
    "%Y/%m/%d",
];

// Same ordering rule as DATE_FORMATS.
const DATETIME_FORMATS: &[&str] = &[
    "%d/%m/%y %H:%M:%S",
    "%d/%m/%y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%y %H:%M:%S",
    "%d-%m-%y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%d.%m.%y %H:%M:%S",
    "%d.%m.%y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Cases the session may see, in table order.
///
/// Lawyers see every case. Clients see the cases whose client id matches their
/// user id once both sides are trimmed. A logged-out session, or a client with a
/// blank id, sees nothing.
///
/// # Arguments
/// * `cases` - Every row of the Processes table
/// * `session` - The requesting visitor's session
///
/// # Returns
/// * `Vec<&Case>` - The visible cases, borrowed from `cases`
pub fn filter_cases<'a>(cases: &'a [Case], session: &Session) -> Vec<&'a Case> {
    let Some(identity) = session.identity() else {
        return Vec::new();
    };

    if identity.is_lawyer() {
        return cases.iter().collect();
    }

    let user_id = identity.user_id.trim();
    if user_id.is_empty() {
        return Vec::new();
    }
    cases
        .iter()
        .filter(|case| case.client_id.trim() == user_id)
        .collect()
}

/// First visible case with the given number
///
/// Only searches what [`filter_cases`] returned, so a client cannot open another
/// client's case by naming it.
pub fn find_case<'a>(visible: &[&'a Case], case_number: &str) -> Option<&'a Case> {
    let wanted = case_number.trim();
    visible
        .iter()
        .copied()
        .find(|case| case.number.trim() == wanted)
}

/// History of one case, newest first.
///
/// Entries whose date cannot be parsed are kept and placed after all dated ones,
/// in their original order.
pub fn history<'a>(entries: &'a [HistoryEntry], case_number: &str) -> Vec<&'a HistoryEntry> {
    let wanted = case_number.trim();
    let mut matched: Vec<(&HistoryEntry, Option<NaiveDateTime>)> = entries
        .iter()
        .filter(|entry| entry.case_number.trim() == wanted)
        .map(|entry| (entry, parse_update_date(&entry.updated)))
        .collect();

    // sort_by is stable, ties keep table order
    matched.sort_by(|(_, a), (_, b)| match (a, b) {
        (Some(a), Some(b)) => b.cmp(a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    matched.into_iter().map(|(entry, _)| entry).collect()
}

/// Parse a day-first date, with or without a time of day
pub fn parse_update_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(parsed);
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// `dd/mm/yyyy` for parseable dates, the raw text otherwise
pub fn display_date(raw: &str) -> String {
    match parse_update_date(raw) {
        Some(parsed) => parsed.format("%d/%m/%Y").to_string(),
        None if raw.trim().is_empty() => PLACEHOLDER.to_string(),
        None => raw.trim().to_string(),
    }
}
