use crate::config::LogConfig;
use std::error::Error as StdError;
use std::sync::Arc;

/// Error reporting capability.
///
/// Both engines receive a reporter explicitly instead of writing into an ambient sink,
/// so an embedding application decides where failures that can not be returned
/// to a caller end up.
pub trait Reporter: Send + Sync {
    /// Report a failure that was handled locally (the operation continues).
    fn report_error(&self, target: &str, error: &dyn StdError);

    /// Report an unusual, but not erroneous situation.
    fn report_warning(&self, target: &str, message: &str);
}

/// Forward reports into the `log` facade.
#[derive(Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report_error(&self, target: &str, error: &dyn StdError) {
        match error.source() {
            None => log::error!(target: target, "{error}"),
            Some(source) => log::error!(target: target, "{error}: {source}"),
        }
    }

    fn report_warning(&self, target: &str, message: &str) {
        log::warn!(target: target, "{message}");
    }
}

/// Discard all reports.
#[derive(Default, Clone, Copy)]
pub struct NopReporter;

impl Reporter for NopReporter {
    fn report_error(&self, _: &str, _: &dyn StdError) {}

    fn report_warning(&self, _: &str, _: &str) {}
}

/// Return a shared default reporter.
pub fn default_reporter() -> Arc<dyn Reporter> {
    Arc::new(LogReporter)
}

/// Install `env_logger` as a `log` backend.
///
/// `RUST_LOG` takes precedence over `default_filter`. Does nothing if a logger is already installed.
pub fn init(default_filter: &str) -> bool {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .try_init()
        .is_ok()
}

/// Install `env_logger` with a default filter from the configuration.
pub fn init_from(config: &LogConfig) -> bool {
    init(&config.default_filter)
}
