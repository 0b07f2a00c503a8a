use std::sync::Arc;

use reportbuddy_calendar::{
    CalendarService, CalendarStore, Clock, JsonSettingsStore, SettingsStore, SnapshotStore,
    SystemClock,
};
use reportbuddy_services::{
    compose_report, ComposedEmail, EmailTemplate, MailLauncher, SystemMailLauncher, UpdateChecker,
    UpdateInfo,
};

use crate::error::{AppError, ConfigError};
use crate::{Config, VERSION};

/// Application root: owns the config and every service, wired together.
pub struct App {
    config: Arc<Config>,
    calendar: CalendarService,
    updates: Option<UpdateChecker>,
    mailer: Arc<dyn MailLauncher>,
    clock: Arc<dyn Clock>,
}

impl App {
    /// Build the application from the calendar export and settings named in `config`.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// Returns `ConfigError` if the calendar export is missing or unreadable.
    pub fn new(config: Config) -> Result<Self, AppError> {
        let snapshot_path = &config.calendar.snapshot_path;
        if !snapshot_path.exists() {
            return Err(ConfigError::NotFound(snapshot_path.display().to_string()).into());
        }
        let store = SnapshotStore::open(snapshot_path)
            .map_err(|e| ConfigError::ParseError(format!("{:#}", e)))?;
        let settings_store = JsonSettingsStore::in_dir(&config.config_dir);

        Ok(Self::with_parts(
            config,
            Arc::new(store),
            Arc::new(settings_store),
            Arc::new(SystemClock),
            Arc::new(SystemMailLauncher),
        ))
    }

    /// Build the application around explicit collaborators.
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_parts(
        config: Config,
        store: Arc<dyn CalendarStore>,
        settings_store: Arc<dyn SettingsStore>,
        clock: Arc<dyn Clock>,
        mailer: Arc<dyn MailLauncher>,
    ) -> Self {
        let updates = if config.updates.enabled {
            match UpdateChecker::new(
                &config.updates.api_base_url,
                config.updates.repository.clone(),
                VERSION,
            ) {
                Ok(checker) => Some(checker),
                Err(e) => {
                    tracing::warn!("Update checks disabled: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let calendar = CalendarService::spawn(store, settings_store, clock.clone());

        Self {
            config: Arc::new(config),
            calendar,
            updates,
            mailer,
            clock,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn calendar(&self) -> &CalendarService {
        &self.calendar
    }

    /// Latest release if newer than this build. `Ok(None)` when update checks are disabled.
    ///
    /// # Errors
    /// Returns `AppError::Update` if the release could not be fetched. Callers log it
    /// and carry on.
    pub async fn check_for_updates(&self) -> Result<Option<UpdateInfo>, AppError> {
        let Some(checker) = self.updates.as_ref() else {
            return Ok(None);
        };
        Ok(checker.check_for_updates().await?)
    }

    /// Compose the report email from the current settings and events.
    ///
    /// # Errors
    /// Returns the calendar error that prevents an export.
    pub async fn compose_report(&self) -> Result<ComposedEmail, AppError> {
        let events = self.calendar.export().await?;
        let settings = self.calendar.snapshot().settings;
        Ok(compose_report(
            &events,
            &EmailTemplate::from(&settings),
            self.clock.now(),
        ))
    }

    /// Compose the report and hand it to the mail client.
    ///
    /// # Errors
    /// Returns an error if the export fails or the mail client cannot be opened.
    pub async fn send_report(&self) -> Result<ComposedEmail, AppError> {
        let email = self.compose_report().await?;
        self.mailer.launch(&email)?;
        tracing::info!("Report with subject {:?} handed to mail client", email.subject);
        Ok(email)
    }

    /// Shutdown the application and all services
    pub fn shutdown(&self) {
        tracing::info!("Shutting down application");
        self.calendar.shutdown();
    }
}
