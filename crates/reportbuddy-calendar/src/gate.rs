//! Calendar access resolution.

use std::sync::Arc;

use crate::error::CalendarError;
use crate::store::CalendarStore;
use crate::types::AuthorizationStatus;

/// Outcome of an access check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Granted,
    /// Denied or restricted, either up front or by the user's answer.
    Denied,
}

/// Resolves calendar permission before any store read.
///
/// Each call to [`AccessGate::ensure_access`] issues at most one access
/// request, so a single refresh never prompts the user twice.
#[derive(Clone)]
pub struct AccessGate {
    store: Arc<dyn CalendarStore>,
}

impl AccessGate {
    pub fn new(store: Arc<dyn CalendarStore>) -> Self {
        Self { store }
    }

    /// Check the current status and request access when it is undetermined.
    ///
    /// # Errors
    /// Returns `AccessRequestFailed` when the request itself fails.
    pub async fn ensure_access(&self) -> Result<AccessDecision, CalendarError> {
        let status = self.store.authorization_status();
        tracing::debug!("Calendar authorization status: {:?}", status);

        match status {
            AuthorizationStatus::FullAccess => Ok(AccessDecision::Granted),
            AuthorizationStatus::Denied | AuthorizationStatus::Restricted => {
                tracing::warn!("Calendar access denied or restricted");
                Ok(AccessDecision::Denied)
            }
            AuthorizationStatus::NotDetermined => {
                tracing::info!("Calendar access not determined yet, requesting it");
                self.request().await
            }
            AuthorizationStatus::WriteOnly => {
                tracing::warn!("Only write access granted, requesting full access");
                self.request().await
            }
        }
    }

    async fn request(&self) -> Result<AccessDecision, CalendarError> {
        match self.store.request_access().await {
            Ok(true) => {
                tracing::info!("Calendar access granted");
                Ok(AccessDecision::Granted)
            }
            Ok(false) => {
                tracing::warn!("Calendar access denied by the user");
                Ok(AccessDecision::Denied)
            }
            Err(e) => {
                tracing::error!(error = ?e, "Calendar access request failed: {}", e);
                let detail = match e {
                    CalendarError::AccessRequestFailed(detail) => detail,
                    other => other.to_string(),
                };
                Err(CalendarError::AccessRequestFailed(detail))
            }
        }
    }
}
