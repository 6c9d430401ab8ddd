//! Single-device poll
//!
//! A fixed set of options collects votes, state is kept in a local
//! key-value store, each device votes at most once, and results are
//! projected into a ranked, percentage-annotated summary.

pub mod ballot;
pub mod config;
pub mod errors;
pub mod identity;
pub mod projector;
pub mod session;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use ballot::{BallotStore, CastOutcome, Persistence};
pub use config::PollConfig;
pub use errors::{Error, Result};
pub use identity::VoterId;
pub use projector::{Projection, ResultRow, ResultsProjector, RoundingMode, project};
pub use session::{Notice, NoticeLevel, PollSession};
pub use storage::{FileStore, MemoryStore, PersistedStore};
pub use types::{PollOption, PollOptions, Tally};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging, honouring `RUST_LOG` and defaulting to `poll=info`
pub fn init() -> Result<()> {
    install_subscriber("poll=info", config::LogFormat::Full)
}

/// Initialize logging with the level and format named in `config`
pub fn init_with(config: &config::LoggingConfig) -> Result<()> {
    install_subscriber(&format!("poll={}", config.level), config.format)
}

fn install_subscriber(default_filter: &str, format: config::LogFormat) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match format {
        config::LogFormat::Full => builder.try_init(),
        config::LogFormat::Pretty => builder.pretty().try_init(),
        config::LogFormat::Compact => builder.compact().try_init(),
        config::LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| config_error!("logging already initialized: {}", e))?;

    tracing::info!("🗳️  Poll v{} initialized", VERSION);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_installs_once() {
        let config = PollConfig::for_testing();
        assert!(init_with(&config.logging).is_ok());
        assert!(matches!(init(), Err(Error::Config { .. })));
    }
}
