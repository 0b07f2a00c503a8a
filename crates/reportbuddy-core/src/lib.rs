pub mod app;
pub mod config;
pub mod error;

pub use app::App;
pub use config::{CalendarConfig, Config, LoggingConfig, UpdateConfig, ValidationResult};
pub use error::{AppError, ConfigError};

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Version of the running build, compared against published releases.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging. `RUST_LOG` wins over the configured filter.
pub fn init(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("ReportBuddy {} initialized", VERSION);
    Ok(())
}
