//! Calendar store backed by a JSON export of the user's calendars.
//!
//! Lets the application run where no platform calendar framework is available.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::CalendarError;
use crate::store::CalendarStore;
use crate::types::{AuthorizationStatus, CalendarRef, DateRange, Event};

/// On-disk layout of a calendar export.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotDocument {
    pub authorization: AuthorizationStatus,
    /// Answer given when access is requested.
    pub grant_on_request: bool,
    pub calendars: Vec<CalendarRef>,
    pub events: Vec<Event>,
}

pub struct SnapshotStore {
    document: RwLock<SnapshotDocument>,
}

impl SnapshotStore {
    pub fn new(document: SnapshotDocument) -> Self {
        Self {
            document: RwLock::new(document),
        }
    }

    /// Load an export from disk.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not a valid export.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read calendar export {}", path.display()))?;
        let document: SnapshotDocument =
            serde_json::from_str(&contents).context("Failed to parse calendar export")?;
        tracing::info!(
            "Loaded calendar export with {} calendars and {} events",
            document.calendars.len(),
            document.events.len()
        );
        Ok(Self::new(document))
    }
}

#[async_trait]
impl CalendarStore for SnapshotStore {
    fn authorization_status(&self) -> AuthorizationStatus {
        self.document.read().authorization
    }

    async fn request_access(&self) -> Result<bool, CalendarError> {
        let mut document = self.document.write();
        let granted = document.grant_on_request;
        document.authorization = if granted {
            AuthorizationStatus::FullAccess
        } else {
            AuthorizationStatus::Denied
        };
        Ok(granted)
    }

    async fn list_calendars(&self) -> Result<Vec<CalendarRef>, CalendarError> {
        Ok(self.document.read().calendars.clone())
    }

    async fn query_events(
        &self,
        range: DateRange,
        calendar_ids: &[String],
    ) -> Result<Vec<Event>, CalendarError> {
        if !self.authorization_status().is_granted() {
            return Err(CalendarError::AccessDenied);
        }
        let document = self.document.read();
        Ok(document
            .events
            .iter()
            .filter(|e| range.contains(e.start) && calendar_ids.contains(&e.calendar_id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::types::CalendarKind;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn document() -> SnapshotDocument {
        SnapshotDocument {
            authorization: AuthorizationStatus::NotDetermined,
            grant_on_request: true,
            calendars: vec![CalendarRef {
                id: "work".into(),
                title: "Work".into(),
                source_title: "iCloud".into(),
                is_subscribed: false,
                kind: CalendarKind::CalDav,
            }],
            events: vec![
                Event {
                    id: Some("a".into()),
                    title: Some("Lunch".into()),
                    start: Utc.with_ymd_and_hms(2025, 3, 5, 12, 0, 0).unwrap(),
                    all_day: false,
                    calendar_id: "work".into(),
                },
                Event {
                    id: Some("b".into()),
                    title: Some("Lunch".into()),
                    start: Utc.with_ymd_and_hms(2025, 5, 5, 12, 0, 0).unwrap(),
                    all_day: false,
                    calendar_id: "work".into(),
                },
                Event {
                    id: Some("c".into()),
                    title: Some("Gym".into()),
                    start: Utc.with_ymd_and_hms(2025, 3, 6, 18, 0, 0).unwrap(),
                    all_day: false,
                    calendar_id: "home".into(),
                },
            ],
        }
    }

    fn march() -> DateRange {
        DateRange::custom(
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_request_access_updates_status() {
        let store = SnapshotStore::new(document());
        assert_eq!(store.authorization_status(), AuthorizationStatus::NotDetermined);
        assert!(store.request_access().await.unwrap());
        assert_eq!(store.authorization_status(), AuthorizationStatus::FullAccess);
    }

    #[tokio::test]
    async fn test_query_requires_access() {
        let store = SnapshotStore::new(document());
        let result = store.query_events(march(), &["work".to_string()]).await;
        assert!(matches!(result, Err(CalendarError::AccessDenied)));
    }

    #[tokio::test]
    async fn test_query_filters_range_and_calendars() {
        let store = SnapshotStore::new(document());
        store.request_access().await.unwrap();

        let events = store
            .query_events(march(), &["work".to_string()])
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id.as_deref(), Some("a"));
    }

    #[test]
    fn test_open_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calendars.json");
        std::fs::write(
            &path,
            r#"{
                "authorization": "full_access",
                "calendars": [{"id": "work", "title": "Work", "kind": "caldav"}],
                "events": [{"id": "e1", "title": "Lunch", "start": "2025-03-05T12:00:00Z", "all_day": true, "calendar_id": "work"}]
            }"#,
        )
        .unwrap();

        let store = SnapshotStore::open(&path).unwrap();
        assert_eq!(store.authorization_status(), AuthorizationStatus::FullAccess);
    }

    #[test]
    fn test_open_missing_file_fails() {
        assert!(SnapshotStore::open("/definitely/not/here.json").is_err());
    }
}
