//! Logging setup
//!
//! Installs a `tracing` subscriber writing to stderr or to daily-rolling
//! files. `RUST_LOG` overrides the configured level.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;
use crate::core::{AgentsError, AgentsResult};

/// Install the global subscriber
///
/// When logging to files, the returned guard flushes buffered lines on drop
/// and must be held for the life of the program.
pub fn init_logging(config: &LoggingConfig) -> AgentsResult<Option<WorkerGuard>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => level_filter(&config.level)?,
    };

    let (writer, guard) = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, &config.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(writer), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stderr), None),
    };
    let ansi = config.ansi && config.log_dir.is_none();

    let result = if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(writer))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(writer).with_ansi(ansi))
            .try_init()
    };
    result.map_err(|e| AgentsError::InvalidConfig(format!("failed to initialize logging: {e}")))?;

    Ok(guard)
}

/// Parse a filter directive
fn level_filter(level: &str) -> AgentsResult<EnvFilter> {
    EnvFilter::try_new(level)
        .map_err(|e| AgentsError::InvalidConfig(format!("invalid log level {level:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_filter() {
        assert!(level_filter("info").is_ok());
        assert!(level_filter("shadow_agents=debug,warn").is_ok());
        assert!(matches!(
            level_filter("shadow_agents=loudest"),
            Err(AgentsError::InvalidConfig(_))
        ));
    }
}
