//! View state machine for the calendar service.
//!
//! Drives what the UI shows and whether the filter pipeline may run.

/// Instructions shown when the user has denied calendar access.
pub const UNAUTHORIZED_MESSAGE: &str = "Calendar access denied.\n\n\
To grant access:\n\
1. Open System Settings\n\
2. Go to Privacy & Security > Calendars\n\
3. Enable \"Full calendar access\" for ReportBuddy\n\
4. Restart the application";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ViewState {
    #[default]
    Initial,
    Loading,
    Authorized,
    Unauthorized,
    Error(String),
}

impl ViewState {
    /// Text to show for states that carry one.
    pub fn message(&self) -> Option<&str> {
        match self {
            ViewState::Error(message) => Some(message),
            ViewState::Unauthorized => Some(UNAUTHORIZED_MESSAGE),
            _ => None,
        }
    }

    pub fn is_authorized(&self) -> bool {
        matches!(self, ViewState::Authorized)
    }

    /// True once no work is pending: authorized, unauthorized or failed.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            ViewState::Authorized | ViewState::Unauthorized | ViewState::Error(_)
        )
    }

    /// True if a reset may restart the authorization sequence.
    pub fn can_reset(&self) -> bool {
        matches!(self, ViewState::Unauthorized | ViewState::Error(_))
    }

    /// State after a reset request. Other states are left untouched.
    pub fn on_reset(self) -> Self {
        if self.can_reset() {
            ViewState::Initial
        } else {
            self
        }
    }

    /// State after the user dismisses an error.
    pub fn on_clear_error(self) -> Self {
        match self {
            ViewState::Error(_) => ViewState::Authorized,
            other => other,
        }
    }
}
