//! Calendar service: a single task owns every piece of mutable state.
//!
//! Callers talk to it through [`CalendarService`], which sends commands over an
//! mpsc channel and observes published [`ServiceSnapshot`]s through a watch
//! channel. Store access runs on spawned jobs; their results come back over an
//! internal channel and are only committed if they belong to the latest job.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Local};
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;

use crate::cache::{EventCache, KeywordCache};
use crate::error::CalendarError;
use crate::gate::{AccessDecision, AccessGate};
use crate::pipeline;
use crate::settings::Settings;
use crate::state::ViewState;
use crate::store::{CalendarStore, Clock, SettingsStore};
use crate::types::{CalendarRef, DateRange, DateRangeMode, Event};

/// Everything the UI needs to render, published after every change.
#[derive(Debug, Clone, Default)]
pub struct ServiceSnapshot {
    pub state: ViewState,
    pub calendars: Vec<CalendarRef>,
    pub events: Vec<Event>,
    pub settings: Settings,
    /// Error behind the current `ViewState::Error`, if any.
    pub last_error: Option<CalendarError>,
}

#[derive(Debug)]
enum Command {
    Refresh,
    Reload,
    Export,
    AddKeyword(String),
    RemoveKeyword(String),
    SetOnlyAllDay(bool),
    ToggleCalendar(String),
    SetDateRange(DateRangeMode),
    UpdateSettings(Settings),
    Reset,
    ClearError,
    WhenSettled(oneshot::Sender<ServiceSnapshot>),
    Shutdown,
}

/// Handle to the running calendar service. Cheap to clone.
#[derive(Clone)]
pub struct CalendarService {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<ServiceSnapshot>,
}

impl CalendarService {
    /// Load settings, spawn the owning task and start the authorization sequence.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        store: Arc<dyn CalendarStore>,
        settings_store: Arc<dyn SettingsStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let settings = match settings_store.load() {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("Failed to load settings: {:#}. Using defaults.", e);
                Settings::default()
            }
        };

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(ServiceSnapshot {
            settings: settings.clone(),
            ..ServiceSnapshot::default()
        });

        let worker = Worker {
            gate: AccessGate::new(store.clone()),
            store,
            settings_store,
            clock,
            state: ViewState::Initial,
            last_error: None,
            calendars: Vec::new(),
            events: Vec::new(),
            settings,
            event_cache: None,
            keyword_cache: None,
            generation: 0,
            in_flight: None,
            waiters: Vec::new(),
            done_tx,
            snapshot_tx,
        };

        tokio::spawn(worker.run(commands_rx, done_rx));
        tracing::info!("Calendar service started");

        Self {
            commands: commands_tx,
            snapshots: snapshot_rx,
        }
    }

    fn send(&self, command: Command) -> Result<(), CalendarError> {
        self.commands
            .send(command)
            .map_err(|_| CalendarError::ServiceStopped)
    }

    /// Recompute the report for the current settings.
    ///
    /// # Errors
    /// Returns `ServiceStopped` if the service task has exited.
    pub fn refresh(&self) -> Result<(), CalendarError> {
        self.send(Command::Refresh)
    }

    /// Drop all caches, re-enumerate calendars and recompute.
    ///
    /// # Errors
    /// Returns `ServiceStopped` if the service task has exited.
    pub fn reload(&self) -> Result<(), CalendarError> {
        self.send(Command::Reload)
    }

    /// # Errors
    /// Returns `ServiceStopped` if the service task has exited.
    pub fn add_keyword(&self, keyword: impl Into<String>) -> Result<(), CalendarError> {
        self.send(Command::AddKeyword(keyword.into()))
    }

    /// # Errors
    /// Returns `ServiceStopped` if the service task has exited.
    pub fn remove_keyword(&self, keyword: impl Into<String>) -> Result<(), CalendarError> {
        self.send(Command::RemoveKeyword(keyword.into()))
    }

    /// # Errors
    /// Returns `ServiceStopped` if the service task has exited.
    pub fn set_only_all_day(&self, only_all_day: bool) -> Result<(), CalendarError> {
        self.send(Command::SetOnlyAllDay(only_all_day))
    }

    /// # Errors
    /// Returns `ServiceStopped` if the service task has exited.
    pub fn toggle_calendar(&self, calendar_id: impl Into<String>) -> Result<(), CalendarError> {
        self.send(Command::ToggleCalendar(calendar_id.into()))
    }

    /// # Errors
    /// Returns `ServiceStopped` if the service task has exited.
    pub fn set_date_range(&self, mode: DateRangeMode) -> Result<(), CalendarError> {
        self.send(Command::SetDateRange(mode))
    }

    /// Replace the settings wholesale, persist them and recompute.
    ///
    /// # Errors
    /// Returns `ServiceStopped` if the service task has exited.
    pub fn update_settings(&self, settings: Settings) -> Result<(), CalendarError> {
        self.send(Command::UpdateSettings(settings))
    }

    /// Restart the authorization sequence after a denial or an error.
    ///
    /// # Errors
    /// Returns `ServiceStopped` if the service task has exited.
    pub fn reset(&self) -> Result<(), CalendarError> {
        self.send(Command::Reset)
    }

    /// # Errors
    /// Returns `ServiceStopped` if the service task has exited.
    pub fn clear_error(&self) -> Result<(), CalendarError> {
        self.send(Command::ClearError)
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> ServiceSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver notified on every published change.
    pub fn subscribe(&self) -> watch::Receiver<ServiceSnapshot> {
        self.snapshots.clone()
    }

    /// Wait until every command sent so far has been handled and no job is running.
    ///
    /// # Errors
    /// Returns `ServiceStopped` if the service task has exited.
    pub async fn wait_until_settled(&self) -> Result<ServiceSnapshot, CalendarError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::WhenSettled(tx))?;
        rx.await.map_err(|_| CalendarError::ServiceStopped)
    }

    /// Events for the report, served from the month cache when still valid.
    ///
    /// # Errors
    /// Returns the error that left the service unauthorized or failed.
    pub async fn export(&self) -> Result<Vec<Event>, CalendarError> {
        self.send(Command::Export)?;
        let snapshot = self.wait_until_settled().await?;
        match snapshot.state {
            ViewState::Authorized => Ok(snapshot.events),
            ViewState::Unauthorized => Err(CalendarError::AccessDenied),
            _ => Err(snapshot
                .last_error
                .unwrap_or_else(|| CalendarError::Store("calendar not ready".to_string()))),
        }
    }

    /// Cancel in-flight work and stop the service task.
    pub fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown);
    }
}

struct JobRequest {
    enumerate: bool,
    calendars: Vec<CalendarRef>,
    settings: Settings,
    now: DateTime<Local>,
}

#[derive(Debug)]
enum JobOutcome {
    Unauthorized,
    Failed(CalendarError),
    Loaded {
        /// Freshly enumerated calendars, when the job enumerated them.
        calendars: Option<Vec<CalendarRef>>,
        /// Raw store output; `None` when nothing was selected and the store was not queried.
        events: Option<Vec<Event>>,
    },
}

struct JobDone {
    generation: u64,
    /// `None` when the job observed its cancellation.
    outcome: Option<JobOutcome>,
}

struct Worker {
    store: Arc<dyn CalendarStore>,
    settings_store: Arc<dyn SettingsStore>,
    clock: Arc<dyn Clock>,
    gate: AccessGate,
    state: ViewState,
    last_error: Option<CalendarError>,
    calendars: Vec<CalendarRef>,
    events: Vec<Event>,
    settings: Settings,
    event_cache: Option<EventCache>,
    keyword_cache: Option<KeywordCache>,
    generation: u64,
    in_flight: Option<CancellationToken>,
    waiters: Vec<oneshot::Sender<ServiceSnapshot>>,
    done_tx: mpsc::UnboundedSender<JobDone>,
    snapshot_tx: watch::Sender<ServiceSnapshot>,
}

impl Worker {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut done: mpsc::UnboundedReceiver<JobDone>,
    ) {
        self.start_job(true);
        self.publish();

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle(command),
                },
                Some(finished) = done.recv() => self.on_job_done(finished),
            }
            self.publish();
            self.notify_waiters();
        }

        if let Some(token) = self.in_flight.take() {
            token.cancel();
        }
        tracing::info!("Calendar service stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Refresh => self.start_job(false),
            Command::Reload => {
                self.event_cache = None;
                self.keyword_cache = None;
                self.start_job(true);
            }
            Command::Export => self.export(),
            Command::AddKeyword(keyword) => {
                let changed = self.settings.add_keyword(&keyword);
                self.settings_changed(changed, true);
            }
            Command::RemoveKeyword(keyword) => {
                let changed = self.settings.remove_keyword(&keyword);
                self.settings_changed(changed, true);
            }
            Command::SetOnlyAllDay(only_all_day) => {
                let changed = self.settings.only_all_day_events != only_all_day;
                self.settings.only_all_day_events = only_all_day;
                self.settings_changed(changed, false);
            }
            Command::ToggleCalendar(id) => {
                self.settings.toggle_calendar(&id);
                self.settings_changed(true, false);
            }
            Command::SetDateRange(mode) => {
                let changed = self.settings.date_range != mode;
                self.settings.date_range = mode;
                self.settings_changed(changed, false);
            }
            Command::UpdateSettings(settings) => {
                let keywords_changed = settings.event_keywords != self.settings.event_keywords;
                self.settings = settings;
                self.settings_changed(true, keywords_changed);
            }
            Command::Reset => {
                if self.state.can_reset() {
                    tracing::info!("Resetting calendar access from {:?}", self.state);
                    self.state = std::mem::take(&mut self.state).on_reset();
                    self.last_error = None;
                    self.publish();
                    self.start_job(true);
                }
            }
            Command::ClearError => {
                self.state = std::mem::take(&mut self.state).on_clear_error();
                self.last_error = None;
            }
            Command::WhenSettled(tx) => self.waiters.push(tx),
            Command::Shutdown => {}
        }
    }

    fn settings_changed(&mut self, changed: bool, keywords_changed: bool) {
        if !changed {
            return;
        }
        if keywords_changed {
            self.keyword_cache = None;
        }
        if let Err(e) = self.settings_store.save(&self.settings) {
            tracing::error!("Failed to save settings: {:#}", e);
        }
        self.start_job(false);
    }

    fn export(&mut self) {
        let now = self.clock.now();
        if let Some(cache) = self.event_cache.as_ref().filter(|c| c.is_valid_at(now)) {
            tracing::debug!("Serving {} events from cache", cache.events().len());
            self.events = cache.events().to_vec();
            return;
        }
        self.start_job(false);
    }

    /// Cancel any running job and start a new one.
    fn start_job(&mut self, enumerate: bool) {
        if let Some(token) = self.in_flight.take() {
            token.cancel();
            tracing::debug!("Cancelled in-flight refresh (generation {})", self.generation);
        }

        self.generation += 1;
        let generation = self.generation;
        let token = CancellationToken::new();
        self.in_flight = Some(token.clone());
        self.state = ViewState::Loading;

        let request = JobRequest {
            enumerate: enumerate || self.calendars.is_empty(),
            calendars: self.calendars.clone(),
            settings: self.settings.clone(),
            now: self.clock.now(),
        };
        let gate = self.gate.clone();
        let store = self.store.clone();
        let done = self.done_tx.clone();

        tokio::spawn(async move {
            let outcome = run_job(&gate, store.as_ref(), request, &token).await;
            let _ = done.send(JobDone { generation, outcome });
        });
    }

    fn on_job_done(&mut self, finished: JobDone) {
        if finished.generation != self.generation {
            tracing::debug!("Discarding result of superseded job {}", finished.generation);
            return;
        }
        self.in_flight = None;

        let Some(outcome) = finished.outcome else {
            return;
        };

        match outcome {
            JobOutcome::Unauthorized => {
                self.state = ViewState::Unauthorized;
                self.events.clear();
                self.event_cache = None;
            }
            JobOutcome::Failed(e) => {
                tracing::warn!("Calendar refresh failed: {}", e);
                self.event_cache = None;
                self.state = ViewState::Error(e.user_message());
                self.last_error = Some(e);
            }
            JobOutcome::Loaded { calendars, events } => {
                if let Some(calendars) = calendars {
                    tracing::debug!("Loaded {} reportable calendars", calendars.len());
                    self.calendars = calendars;
                }
                match events {
                    None => {
                        tracing::debug!("No calendar selected, clearing events");
                        self.events.clear();
                        self.event_cache = Some(EventCache::new(Vec::new(), self.clock.now()));
                    }
                    Some(raw) => {
                        let keywords = self.processed_keywords();
                        let filtered = pipeline::filter_events(
                            raw,
                            self.settings.only_all_day_events,
                            &keywords,
                        );
                        self.event_cache =
                            Some(EventCache::new(filtered.clone(), self.clock.now()));
                        self.events = filtered;
                    }
                }
                self.state = ViewState::Authorized;
                self.last_error = None;
            }
        }
    }

    fn processed_keywords(&mut self) -> HashSet<String> {
        let now = self.clock.instant();
        if let Some(cache) = self.keyword_cache.as_ref().filter(|c| c.is_valid_at(now)) {
            return cache.keywords().clone();
        }
        let cache = KeywordCache::build(&self.settings.event_keywords, now);
        let keywords = cache.keywords().clone();
        self.keyword_cache = Some(cache);
        keywords
    }

    fn snapshot(&self) -> ServiceSnapshot {
        ServiceSnapshot {
            state: self.state.clone(),
            calendars: self.calendars.clone(),
            events: self.events.clone(),
            settings: self.settings.clone(),
            last_error: self.last_error.clone(),
        }
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }

    fn notify_waiters(&mut self) {
        if self.in_flight.is_some() || self.waiters.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(snapshot.clone());
        }
    }
}

/// Race `fut` against cancellation of `token`.
async fn until_cancelled<F: Future>(token: &CancellationToken, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = token.cancelled() => None,
        output = fut => Some(output),
    }
}

async fn run_job(
    gate: &AccessGate,
    store: &dyn CalendarStore,
    request: JobRequest,
    token: &CancellationToken,
) -> Option<JobOutcome> {
    match until_cancelled(token, gate.ensure_access()).await? {
        Ok(AccessDecision::Granted) => {}
        Ok(AccessDecision::Denied) => return Some(JobOutcome::Unauthorized),
        Err(e) => return Some(JobOutcome::Failed(e)),
    }

    let enumerated = if request.enumerate {
        let started = std::time::Instant::now();
        match until_cancelled(token, store.list_calendars()).await? {
            Ok(all) => {
                let calendars = pipeline::reportable_calendars(all);
                tracing::debug!("Calendar enumeration took {:?}", started.elapsed());
                if calendars.is_empty() {
                    return Some(JobOutcome::Failed(CalendarError::NoCalendarsFound));
                }
                Some(calendars)
            }
            Err(e) => return Some(JobOutcome::Failed(e)),
        }
    } else {
        None
    };

    let available = enumerated
        .as_deref()
        .unwrap_or(request.calendars.as_slice());
    let selected = pipeline::selected_calendar_ids(available, &request.settings);
    if selected.is_empty() {
        return Some(JobOutcome::Loaded {
            calendars: enumerated,
            events: None,
        });
    }

    let range = match DateRange::resolve(request.settings.date_range, request.now) {
        Ok(range) => range,
        Err(e) => return Some(JobOutcome::Failed(e)),
    };

    match until_cancelled(token, store.query_events(range, &selected)).await? {
        Ok(raw) => Some(JobOutcome::Loaded {
            calendars: enumerated,
            events: Some(raw),
        }),
        Err(e) => Some(JobOutcome::Failed(e)),
    }
}
