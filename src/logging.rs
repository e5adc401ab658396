//! Log subscriber setup for the binary.
//!
//! Logs go to stderr so stdout stays free for command output. The filter
//! comes from `WAVEFRONT_LOG` (default `wavefront=info`); `WAVEFRONT_LOG_JSON=1`
//! switches to JSON lines.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "WAVEFRONT_LOG";

const DEFAULT_FILTER: &str = "wavefront=info";

fn filter(raw: Option<&str>) -> EnvFilter {
    match raw {
        Some(directives) if !directives.trim().is_empty() => EnvFilter::try_new(directives)
            .unwrap_or_else(|e| {
                eprintln!("ignoring invalid {LOG_ENV}={directives}: {e}");
                EnvFilter::new(DEFAULT_FILTER)
            }),
        _ => EnvFilter::new(DEFAULT_FILTER),
    }
}

/// Installs the global subscriber. Calling it twice is harmless.
pub fn init() {
    let json = std::env::var("WAVEFRONT_LOG_JSON").unwrap_or_default() == "1";
    let filter = filter(std::env::var(LOG_ENV).ok().as_deref());
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    let installed = if json { builder.json().try_init() } else { builder.try_init() };
    if installed.is_err() {
        tracing::debug!("log subscriber already installed");
    }
}
