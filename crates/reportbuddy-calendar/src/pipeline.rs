//! Event filtering: calendar selection, deduplication, all-day and keyword
//! filters, ordering.
//!
//! Everything here is pure so it can run on the service's owning task without
//! touching the store.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::settings::Settings;
use crate::types::{CalendarRef, Event};

/// Keep reportable calendars and order them by source, then title.
pub fn reportable_calendars(calendars: Vec<CalendarRef>) -> Vec<CalendarRef> {
    let mut calendars: Vec<CalendarRef> =
        calendars.into_iter().filter(CalendarRef::is_reportable).collect();
    calendars.sort_by(|a, b| {
        standard_compare(&a.source_title, &b.source_title)
            .then_with(|| standard_compare(&a.title, &b.title))
    });
    calendars
}

/// Identifiers of available calendars the user has selected, in display order.
pub fn selected_calendar_ids(calendars: &[CalendarRef], settings: &Settings) -> Vec<String> {
    calendars
        .iter()
        .filter(|c| settings.selected_calendar_ids.contains(&c.id))
        .map(|c| c.id.clone())
        .collect()
}

/// Drop repeated occurrences of the same event, keeping the first one seen.
///
/// Two events are the same when identifier and start instant match. Events
/// without an identifier get a fresh placeholder, so they are never merged.
pub fn dedupe(events: Vec<Event>) -> Vec<Event> {
    let mut seen = HashSet::with_capacity(events.len());
    events
        .into_iter()
        .filter(|event| {
            let id = event
                .id
                .clone()
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            seen.insert(format!("{}_{}", id, event.start.timestamp_millis()))
        })
        .collect()
}

/// Case-insensitive substring match of any keyword against the title.
///
/// `keywords` must already be lowercased. An empty keyword set matches
/// nothing, and untitled events never match.
pub fn matches_keywords(title: Option<&str>, keywords: &HashSet<String>) -> bool {
    let Some(title) = title else {
        return false;
    };
    if keywords.is_empty() {
        return false;
    }
    let title = title.to_lowercase();
    keywords.iter().any(|k| title.contains(k.as_str()))
}

/// Dedupe, filter and sort raw store output.
pub fn filter_events(
    raw: Vec<Event>,
    only_all_day: bool,
    keywords: &HashSet<String>,
) -> Vec<Event> {
    let fetched = raw.len();
    let mut events: Vec<Event> = dedupe(raw)
        .into_iter()
        .filter(|e| !only_all_day || e.all_day)
        .filter(|e| matches_keywords(e.title.as_deref(), keywords))
        .collect();
    // stable: equal starts keep dedupe order
    events.sort_by_key(|e| e.start);

    tracing::debug!("Filtered {} unique events from {} fetched", events.len(), fetched);
    events
}

/// Case-insensitive comparison that orders embedded digit runs numerically,
/// so "Project 2" sorts before "Project 10".
pub fn standard_compare(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let ln = take_number(&mut left);
                let rn = take_number(&mut right);
                let ord = ln
                    .trim_start_matches('0')
                    .len()
                    .cmp(&rn.trim_start_matches('0').len())
                    .then_with(|| ln.trim_start_matches('0').cmp(rn.trim_start_matches('0')));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(l), Some(r)) => {
                let ord = l.to_lowercase().cmp(r.to_lowercase());
                if ord != Ordering::Equal {
                    return ord;
                }
                left.next();
                right.next();
            }
        }
    }
}

fn take_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(c) = chars.peek().copied() {
        if !c.is_ascii_digit() {
            break;
        }
        digits.push(c);
        chars.next();
    }
    digits
}
