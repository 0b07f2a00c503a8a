//! Calendar data model shared by the store, pipeline and service.

use chrono::{DateTime, Datelike, Local, LocalResult, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CalendarError;

/// Calendar event as returned by a [`CalendarStore`](crate::store::CalendarStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Store identifier. Some backends omit it for detached occurrences.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    pub start: DateTime<Utc>,
    #[serde(default)]
    pub all_day: bool,
    pub calendar_id: String,
}

/// Calendar backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CalendarKind {
    #[default]
    Local,
    CalDav,
    Exchange,
    Subscription,
    Birthday,
}

/// Calendar metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarRef {
    pub id: String,
    pub title: String,
    /// Title of the account/source the calendar belongs to (e.g. "iCloud").
    #[serde(default)]
    pub source_title: String,
    #[serde(default)]
    pub is_subscribed: bool,
    #[serde(default)]
    pub kind: CalendarKind,
}

impl CalendarRef {
    /// Whether events from this calendar can appear in a report.
    ///
    /// Subscribed, birthday and subscription calendars are read-only feeds
    /// the user does not own.
    pub fn is_reportable(&self) -> bool {
        !self.is_subscribed
            && self.kind != CalendarKind::Birthday
            && self.kind != CalendarKind::Subscription
    }
}

/// Permission state granted to the application for reading calendar data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    FullAccess,
    WriteOnly,
    #[default]
    NotDetermined,
    Denied,
    Restricted,
}

impl AuthorizationStatus {
    pub fn is_granted(self) -> bool {
        matches!(self, AuthorizationStatus::FullAccess)
    }
}

/// User-selected report period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DateRangeMode {
    #[default]
    CurrentMonth,
    Custom { start: NaiveDate, end: NaiveDate },
}

/// Half-open instant range `[start, end)` passed to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// Range covering every day of the local month containing `now`.
    pub fn current_month(now: DateTime<Local>) -> Result<Self, CalendarError> {
        let first = NaiveDate::from_ymd_opt(now.year(), now.month(), 1)
            .ok_or(CalendarError::InvalidDateRange)?;
        let next = first
            .checked_add_months(chrono::Months::new(1))
            .ok_or(CalendarError::InvalidDateRange)?;
        Ok(Self {
            start: local_midnight(first)?,
            end: local_midnight(next)?,
        })
    }

    /// Range covering the local days `start..=end`.
    pub fn custom(start: NaiveDate, end: NaiveDate) -> Result<Self, CalendarError> {
        if start > end {
            return Err(CalendarError::InvalidDateRange);
        }
        let after_end = end.succ_opt().ok_or(CalendarError::InvalidDateRange)?;
        Ok(Self {
            start: local_midnight(start)?,
            end: local_midnight(after_end)?,
        })
    }

    /// Resolve the configured mode against the current wall-clock time.
    pub fn resolve(mode: DateRangeMode, now: DateTime<Local>) -> Result<Self, CalendarError> {
        match mode {
            DateRangeMode::CurrentMonth => Self::current_month(now),
            DateRangeMode::Custom { start, end } => Self::custom(start, end),
        }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }
}

fn local_midnight(date: NaiveDate) -> Result<DateTime<Utc>, CalendarError> {
    let naive = date
        .and_hms_opt(0, 0, 0)
        .ok_or(CalendarError::InvalidDateRange)?;
    match Local.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        // DST transitions at midnight: take the earlier instant
        LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
        LocalResult::None => Err(CalendarError::InvalidDateRange),
    }
}
