//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

use crate::config::{ClientConfig, DEFAULT_LOG_FILTER};

/// Install a global `fmt` subscriber filtered by `config.log_filter`.
///
/// An invalid directive falls back to the default filter. Safe to call more
/// than once; later calls leave the first subscriber in place.
pub fn init(config: &ClientConfig) {
    let filter = match EnvFilter::try_new(&config.log_filter) {
        Ok(filter) => filter,
        Err(e) => {
            eprintln!("invalid log filter {:?}: {e}; using {DEFAULT_LOG_FILTER}", config.log_filter);
            EnvFilter::new(DEFAULT_LOG_FILTER)
        }
    };
    if tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init().is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
