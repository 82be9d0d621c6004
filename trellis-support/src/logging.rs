//! `tracing` subscriber bootstrap.
//!
//! The container crates only emit events; binaries, demos and tests call
//! [`init`] once to see them. `TRELLIS_LOG` overrides the default filter
//! using the usual `EnvFilter` directive syntax.

use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable consulted for the log filter.
pub const LOG_ENV: &str = "TRELLIS_LOG";

/// Failure to install the global subscriber.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// The fallback filter directive could not be parsed.
    #[error("invalid log filter {directive:?}: {source}")]
    InvalidFilter {
        directive: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },

    /// Another global subscriber is already installed.
    #[error("a global tracing subscriber is already installed")]
    AlreadyInstalled,
}

/// Builds the filter: `TRELLIS_LOG` when set and valid, `default_directive` otherwise.
pub fn filter(default_directive: &str) -> Result<EnvFilter, LoggingError> {
    match EnvFilter::try_from_env(LOG_ENV) {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(default_directive).map_err(|source| {
            LoggingError::InvalidFilter {
                directive: default_directive.to_string(),
                source,
            }
        }),
    }
}

/// Installs a compact fmt subscriber as the global default.
///
/// ```no_run
/// trellis_support::logging::init("trellis_container=debug").ok();
/// ```
pub fn init(default_directive: &str) -> Result<(), LoggingError> {
    fmt()
        .with_env_filter(filter(default_directive)?)
        .with_target(true)
        .compact()
        .finish()
        .try_init()
        .map_err(|_| LoggingError::AlreadyInstalled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_default_directive_is_reported() {
        if std::env::var_os(LOG_ENV).is_some() {
            return;
        }
        let err = filter("trellis=notalevel").unwrap_err();
        assert!(matches!(err, LoggingError::InvalidFilter { .. }));
        assert!(err.to_string().contains("notalevel"));
    }

    #[test]
    fn second_init_is_rejected() {
        let _ = init("warn");
        assert!(matches!(init("warn"), Err(LoggingError::AlreadyInstalled)));
    }
}
