//! Report settings and their JSON persistence.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::store::SettingsStore;
use crate::types::DateRangeMode;

pub const DEFAULT_EMAIL_SUBJECT: &str = "Meal voucher attendance report - $month $year";

/// User-editable report settings.
///
/// The keyword list is kept exactly as entered: duplicates and empty entries
/// are preserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub selected_calendar_ids: BTreeSet<String>,
    pub event_keywords: Vec<String>,
    pub email_language: String,
    pub email_subject: String,
    pub email_recipient: String,
    pub only_all_day_events: bool,
    pub date_range: DateRangeMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            selected_calendar_ids: BTreeSet::new(),
            event_keywords: Vec::new(),
            email_language: "en".to_string(),
            email_subject: DEFAULT_EMAIL_SUBJECT.to_string(),
            email_recipient: String::new(),
            only_all_day_events: true,
            date_range: DateRangeMode::CurrentMonth,
        }
    }
}

impl Settings {
    /// Append a keyword. Empty input is ignored. Returns whether anything changed.
    pub fn add_keyword(&mut self, keyword: &str) -> bool {
        if keyword.is_empty() {
            return false;
        }
        self.event_keywords.push(keyword.to_string());
        true
    }

    /// Remove every entry equal to `keyword`. Returns whether anything changed.
    pub fn remove_keyword(&mut self, keyword: &str) -> bool {
        let before = self.event_keywords.len();
        self.event_keywords.retain(|k| k != keyword);
        before != self.event_keywords.len()
    }

    /// Flip the selection of a calendar. Returns the new selection state.
    pub fn toggle_calendar(&mut self, calendar_id: &str) -> bool {
        if self.selected_calendar_ids.remove(calendar_id) {
            false
        } else {
            self.selected_calendar_ids.insert(calendar_id.to_string());
            true
        }
    }
}

/// Settings stored as a JSON blob on disk.
#[derive(Debug, Clone)]
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Store at `settings.json` inside `config_dir`.
    pub fn in_dir(config_dir: &Path) -> Self {
        Self::new(config_dir.join("settings.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonSettingsStore {
    fn load(&self) -> Result<Settings> {
        if !self.path.exists() {
            tracing::debug!("No settings at {}, using defaults", self.path.display());
            return Ok(Settings::default());
        }

        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;

        match serde_json::from_str(&contents) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                tracing::warn!("Settings file is malformed ({}), using defaults", e);
                Ok(Settings::default())
            }
        }
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create settings directory")?;
        }

        let contents =
            serde_json::to_string_pretty(settings).context("Failed to serialize settings")?;
        std::fs::write(&self.path, contents).context("Failed to write settings file")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert!(settings.only_all_day_events);
        assert!(settings.event_keywords.is_empty());
        assert!(settings.email_subject.contains("$month"));
        assert_eq!(settings.date_range, DateRangeMode::CurrentMonth);
    }

    #[test]
    fn test_add_keyword_ignores_empty() {
        let mut settings = Settings::default();
        assert!(!settings.add_keyword(""));
        assert!(settings.add_keyword("lunch"));
        assert!(settings.add_keyword("lunch"));
        assert_eq!(settings.event_keywords, vec!["lunch", "lunch"]);
    }

    #[test]
    fn test_remove_keyword_removes_all_copies() {
        let mut settings = Settings::default();
        settings.event_keywords = vec!["a".into(), "b".into(), "a".into()];
        assert!(settings.remove_keyword("a"));
        assert_eq!(settings.event_keywords, vec!["b"]);
        assert!(!settings.remove_keyword("missing"));
    }

    #[test]
    fn test_toggle_calendar() {
        let mut settings = Settings::default();
        assert!(settings.toggle_calendar("work"));
        assert!(settings.selected_calendar_ids.contains("work"));
        assert!(!settings.toggle_calendar("work"));
        assert!(settings.selected_calendar_ids.is_empty());
    }

    #[test]
    fn test_json_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSettingsStore::in_dir(dir.path());

        let mut settings = Settings::default();
        settings.selected_calendar_ids.insert("work".into());
        settings.event_keywords = vec!["Lunch".into(), String::new()];
        settings.date_range = DateRangeMode::Custom {
            start: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
        };

        store.save(&settings).unwrap();
        assert_eq!(store.load().unwrap(), settings);
    }

    #[test]
    fn test_json_store_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSettingsStore::in_dir(dir.path());
        assert_eq!(store.load().unwrap(), Settings::default());
    }

    #[test]
    fn test_json_store_malformed_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSettingsStore::in_dir(dir.path());
        std::fs::write(store.path(), "{ not json").unwrap();
        assert_eq!(store.load().unwrap(), Settings::default());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let json = r#"{"event_keywords": ["mtg"]}"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.event_keywords, vec!["mtg"]);
        assert!(settings.only_all_day_events);
    }
}
