//! In-memory caches for the filtered event list and the processed keywords.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use chrono::{DateTime, Datelike, Local};

use crate::types::Event;

/// How long a processed keyword set stays valid.
pub const KEYWORD_CACHE_TTL: Duration = Duration::from_secs(300);

/// Last computed report, valid until the local month rolls over.
#[derive(Debug, Clone)]
pub struct EventCache {
    events: Vec<Event>,
    month: u32,
    year: i32,
}

impl EventCache {
    pub fn new(events: Vec<Event>, built_at: DateTime<Local>) -> Self {
        Self {
            events,
            month: built_at.month(),
            year: built_at.year(),
        }
    }

    /// True while `now` falls in the same local month and year as the build time.
    pub fn is_valid_at(&self, now: DateTime<Local>) -> bool {
        now.month() == self.month && now.year() == self.year
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }
}

/// Lowercased keyword set with a fixed TTL.
#[derive(Debug, Clone)]
pub struct KeywordCache {
    keywords: HashSet<String>,
    built_at: Instant,
}

impl KeywordCache {
    pub fn build<S: AsRef<str>>(keywords: &[S], built_at: Instant) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.as_ref().to_lowercase()).collect(),
            built_at,
        }
    }

    pub fn is_valid_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.built_at) < KEYWORD_CACHE_TTL
    }

    pub fn keywords(&self) -> &HashSet<String> {
        &self.keywords
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use chrono::{TimeZone, Utc};

    fn event(title: &str) -> Event {
        Event {
            id: Some(title.to_string()),
            title: Some(title.to_string()),
            start: Utc::now(),
            all_day: true,
            calendar_id: "work".into(),
        }
    }

    #[test]
    fn test_event_cache_valid_within_month() {
        let built = Local.with_ymd_and_hms(2025, 3, 2, 9, 0, 0).unwrap();
        let cache = EventCache::new(vec![event("Lunch")], built);

        let later = Local.with_ymd_and_hms(2025, 3, 30, 22, 0, 0).unwrap();
        assert!(cache.is_valid_at(later));
        assert_eq!(cache.events().len(), 1);
    }

    #[test]
    fn test_event_cache_invalid_after_month_rollover() {
        let built = Local.with_ymd_and_hms(2025, 3, 31, 23, 59, 30).unwrap();
        let cache = EventCache::new(vec![], built);

        let next_minute = Local.with_ymd_and_hms(2025, 4, 1, 0, 0, 10).unwrap();
        assert!(!cache.is_valid_at(next_minute));
    }

    #[test]
    fn test_event_cache_invalid_same_month_other_year() {
        let built = Local.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap();
        let cache = EventCache::new(vec![], built);
        let next_year = Local.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        assert!(!cache.is_valid_at(next_year));
    }

    #[test]
    fn test_keyword_cache_ttl() {
        let t = Instant::now();
        let cache = KeywordCache::build(&["Lunch"], t);

        assert!(cache.is_valid_at(t + Duration::from_secs(299)));
        assert!(!cache.is_valid_at(t + Duration::from_secs(301)));
    }

    #[test]
    fn test_keyword_cache_lowercases_and_collapses() {
        let cache = KeywordCache::build(&["MTG", "mtg", "Lunch"], Instant::now());
        assert_eq!(cache.keywords().len(), 2);
        assert!(cache.keywords().contains("mtg"));
        assert!(cache.keywords().contains("lunch"));
    }
}
