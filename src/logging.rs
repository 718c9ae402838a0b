//! # Logging
//!
//! A `log` backend writing to stderr, so stdout stays free for tool results.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::io::Write;

use chrono::Local;
use log::{LevelFilter, Log, Metadata, Record};

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// Writes `timestamp [LEVEL] target - message` lines to stderr.
pub struct StderrLogger {
    level: LevelFilter,
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl StderrLogger {
    pub fn new(level: LevelFilter) -> Self {
        Self { level }
    }
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let stderr = std::io::stderr();
        let mut handle = stderr.lock();
        let _ = writeln!(
            handle,
            "{} [{}] {} - {}",
            Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {
        std::io::stderr().flush().ok();
    }
}

// -----------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Install a [`StderrLogger`] as the global logger.
///
/// Returns `false` if a logger was already installed, in which case nothing changes.
pub fn init(level: LevelFilter) -> bool {
    if log::set_boxed_logger(Box::new(StderrLogger::new(level))).is_ok() {
        log::set_max_level(level);
        true
    } else {
        false
    }
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_enabled_respects_level() {
        let logger = StderrLogger::new(LevelFilter::Info);

        let info = log::MetadataBuilder::new().level(log::Level::Info).build();
        let debug = log::MetadataBuilder::new().level(log::Level::Debug).build();

        assert!(logger.enabled(&info));
        assert!(!logger.enabled(&debug));
    }

    #[test]
    fn test_off_disables_everything() {
        let logger = StderrLogger::new(LevelFilter::Off);
        let error = log::MetadataBuilder::new().level(log::Level::Error).build();

        assert!(!logger.enabled(&error));
    }
}
