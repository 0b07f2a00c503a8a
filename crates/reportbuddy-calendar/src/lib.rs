//! Calendar reporting core for ReportBuddy.
//!
//! Resolves calendar access, filters events by keyword and date, and keeps the
//! result in a single-writer service the UI observes.

pub mod cache;
pub mod error;
pub mod gate;
pub mod pipeline;
pub mod service;
pub mod settings;
pub mod snapshot;
pub mod state;
pub mod store;
pub mod types;

pub use cache::{EventCache, KeywordCache, KEYWORD_CACHE_TTL};
pub use error::CalendarError;
pub use gate::{AccessDecision, AccessGate};
pub use service::{CalendarService, ServiceSnapshot};
pub use settings::{JsonSettingsStore, Settings};
pub use snapshot::{SnapshotDocument, SnapshotStore};
pub use state::ViewState;
pub use store::{CalendarStore, Clock, ManualClock, SettingsStore, SystemClock};
pub use types::{
    AuthorizationStatus, CalendarKind, CalendarRef, DateRange, DateRangeMode, Event,
};
