//! Centralized error types for the ReportBuddy application.
//!
//! Every crate-level error converts into [`AppError`], which keeps the full
//! context for logging and offers `user_message()` for display.

use reportbuddy_calendar::CalendarError;
use reportbuddy_services::{EmailError, UpdateError};
use thiserror::Error;

/// Top-level application error type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Calendar error: {0}")]
    Calendar(#[from] CalendarError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Update check failed: {0}")]
    Update(#[from] UpdateError),

    #[error("Email error: {0}")]
    Email(#[from] EmailError),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Returns a user-friendly message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Calendar(e) => e.user_message(),
            AppError::Config(e) => e.user_message().to_string(),
            AppError::Update(e) => e.user_message().to_string(),
            AppError::Email(e) => e.user_message().to_string(),
            AppError::Other(_) => "An unexpected error occurred. Please try again.".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::NotFound(_) => {
                "Calendar export not found. Set calendar.snapshot_path in your config."
            }
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_app_error_conversion() {
        let app_err: AppError = CalendarError::NoCalendarsFound.into();
        assert!(matches!(
            app_err,
            AppError::Calendar(CalendarError::NoCalendarsFound)
        ));
    }

    #[test]
    fn test_user_message_propagation() {
        let app_err = AppError::Calendar(CalendarError::AccessDenied);
        assert_eq!(app_err.user_message(), "Calendar access denied");

        let app_err = AppError::Config(ConfigError::ParseError("x".into()));
        assert_eq!(
            app_err.user_message(),
            "Configuration file is malformed. Check your settings."
        );
    }

    #[test]
    fn test_access_request_failure_keeps_detail() {
        let app_err = AppError::Calendar(CalendarError::AccessRequestFailed("TCC".into()));
        assert!(app_err.user_message().contains("Details: TCC"));
    }

    #[test]
    fn test_update_error_message() {
        let app_err = AppError::Update(UpdateError::Http {
            status: 502,
            message: "bad gateway".into(),
        });
        assert_eq!(
            app_err.user_message(),
            "Could not check for updates. Please try again later."
        );
    }
}
