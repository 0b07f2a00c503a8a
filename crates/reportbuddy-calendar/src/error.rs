//! Calendar-specific error types.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    #[error("No calendars found")]
    NoCalendarsFound,

    #[error("Calendar access denied")]
    AccessDenied,

    #[error("Invalid date range")]
    InvalidDateRange,

    #[error("Calendar access request failed: {0}")]
    AccessRequestFailed(String),

    #[error("Calendar store error: {0}")]
    Store(String),

    #[error("Calendar service stopped")]
    ServiceStopped,
}

impl CalendarError {
    /// User-friendly error message for UI display.
    pub fn user_message(&self) -> String {
        match self {
            Self::NoCalendarsFound => "No calendars found".to_string(),
            Self::AccessDenied => "Calendar access denied".to_string(),
            Self::InvalidDateRange => "Invalid date".to_string(),
            Self::AccessRequestFailed(detail) => format!(
                "Error while requesting calendar access.\n\n\
                 Details: {}\n\n\
                 Suggestions:\n\
                 1. Check the calendar permissions in System Settings\n\
                 2. Restart the application\n\
                 3. If the problem persists, restart the system",
                detail
            ),
            Self::Store(msg) => format!("Calendar error: {}", msg),
            Self::ServiceStopped => "Calendar service is not running".to_string(),
        }
    }

    /// Whether the user can recover by resetting and retrying.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::ServiceStopped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_user_messages() {
        let err = CalendarError::NoCalendarsFound;
        assert!(err.user_message().contains("No calendars"));

        let err = CalendarError::AccessRequestFailed("sandbox refused".into());
        assert!(err.user_message().contains("sandbox refused"));
        assert!(err.user_message().contains("System Settings"));

        let err = CalendarError::InvalidDateRange;
        assert!(err.user_message().contains("date"));
    }

    #[test]
    fn test_is_recoverable() {
        assert!(CalendarError::AccessDenied.is_recoverable());
        assert!(CalendarError::Store("io".into()).is_recoverable());
        assert!(!CalendarError::ServiceStopped.is_recoverable());
    }
}
