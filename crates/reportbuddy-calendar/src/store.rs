//! Seams to the platform collaborators: calendar store, settings persistence and
//! the wall clock.

use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Local};

use crate::error::CalendarError;
use crate::settings::Settings;
use crate::types::{AuthorizationStatus, CalendarRef, DateRange, Event};

/// Read access to the system calendar database.
#[async_trait]
pub trait CalendarStore: Send + Sync {
    /// Current permission state. Cheap, never prompts.
    fn authorization_status(&self) -> AuthorizationStatus;

    /// Ask the user for full access. Suspends until they answer.
    ///
    /// # Errors
    /// Returns `AccessRequestFailed` when the platform could not present the request.
    async fn request_access(&self) -> Result<bool, CalendarError>;

    /// Every calendar visible to the application, unfiltered.
    ///
    /// # Errors
    /// Returns `Store` when the backend cannot be read.
    async fn list_calendars(&self) -> Result<Vec<CalendarRef>, CalendarError>;

    /// Events starting inside `range` that belong to one of `calendar_ids`.
    ///
    /// # Errors
    /// Returns `Store` when the backend cannot be read.
    async fn query_events(
        &self,
        range: DateRange,
        calendar_ids: &[String],
    ) -> Result<Vec<Event>, CalendarError>;
}

/// Persistence for [`Settings`].
pub trait SettingsStore: Send + Sync {
    /// # Errors
    /// Returns an error if stored settings exist but cannot be read.
    fn load(&self) -> anyhow::Result<Settings>;

    /// # Errors
    /// Returns an error if the settings cannot be written.
    fn save(&self, settings: &Settings) -> anyhow::Result<()>;
}

/// Source of wall-clock and monotonic time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
    fn instant(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }

    fn instant(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    inner: parking_lot::Mutex<(DateTime<Local>, Instant)>,
}

impl ManualClock {
    pub fn new(now: DateTime<Local>) -> Self {
        Self {
            inner: parking_lot::Mutex::new((now, Instant::now())),
        }
    }

    /// Move both the wall clock and the monotonic clock forward.
    pub fn advance(&self, by: std::time::Duration) {
        let mut guard = self.inner.lock();
        let delta = chrono::Duration::from_std(by).unwrap_or_else(|_| chrono::Duration::zero());
        guard.0 += delta;
        guard.1 += by;
    }

    /// Jump the wall clock without touching the monotonic clock.
    pub fn set_now(&self, now: DateTime<Local>) {
        self.inner.lock().0 = now;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        self.inner.lock().0
    }

    fn instant(&self) -> Instant {
        self.inner.lock().1
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    #[test]
    fn test_manual_clock_advance() {
        let start = Local.with_ymd_and_hms(2025, 3, 31, 23, 59, 30).unwrap();
        let clock = ManualClock::new(start);
        let t0 = clock.instant();

        clock.advance(Duration::from_secs(60));

        assert_eq!(clock.instant().duration_since(t0), Duration::from_secs(60));
        assert_eq!(clock.now(), start + chrono::Duration::seconds(60));
    }

    #[test]
    fn test_manual_clock_set_now_keeps_instant() {
        let clock = ManualClock::new(Local.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap());
        let t0 = clock.instant();
        clock.set_now(Local.with_ymd_and_hms(2025, 4, 1, 8, 0, 0).unwrap());
        assert_eq!(clock.instant(), t0);
    }
}
