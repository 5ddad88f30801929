//! Console logging backend for the `log` facade.
//!
//! Two streams:
//! - records with target [`REPORT_TARGET`] are the user-facing per-file report
//!   and go to stdout as plain lines
//! - everything else is diagnostic output, timestamped, on stderr

use chrono::Local;
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;

/// Log target for report lines
pub const REPORT_TARGET: &str = "report";

/// Emit a report line through the `log` facade
#[macro_export]
macro_rules! report {
    ($($arg:tt)*) => {{
        $crate::log::info!(target: $crate::log_collector::REPORT_TARGET, $($arg)*);
    }}
}

/// Logger writing reports to stdout and diagnostics to stderr
pub struct ConsoleCollector {
    level: LevelFilter,
}

impl ConsoleCollector {
    pub fn new(level: LevelFilter) -> Self {
        ConsoleCollector { level }
    }

    /// Install as the global logger.
    ///
    /// The max level never drops below `Info` so report lines stay visible.
    pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let max_level = level.max(LevelFilter::Info);
        log::set_boxed_logger(Box::new(ConsoleCollector::new(level)))
            .map(|()| log::set_max_level(max_level))
    }

    /// Diagnostic line layout: `[HH:MM:SS.mmm] [LEVEL] message`
    pub fn format_line(timestamp: &str, level: log::Level, message: &str) -> String {
        format!("[{}] [{}] {}", timestamp, level, message)
    }
}

impl Log for ConsoleCollector {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.target() == REPORT_TARGET || metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let message = record.args().to_string();
        if record.target() == REPORT_TARGET {
            let _ = writeln!(std::io::stdout().lock(), "{}", message);
        } else {
            let timestamp = Local::now().format("%H:%M:%S%.3f").to_string();
            let line = Self::format_line(&timestamp, record.level(), &message);
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
        }
    }

    fn flush(&self) {
        let _ = std::io::stdout().flush();
        let _ = std::io::stderr().flush();
    }
}
