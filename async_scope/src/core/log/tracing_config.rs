// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use tracing_core::LevelFilter;

/// Log file used when none is given.
pub const DEFAULT_LOG_FILE_NAME: &str = "async_scope_log.txt";

/// Configure the tracing logging to suit your needs. You can display the logs to:
/// 1. a file,
/// 2. stdout or stderr,
/// 3. both.
///
/// This configuration also allows you to set the log level. Logging is **disabled** by
/// default ([`LevelFilter::OFF`]).
///
/// Use [`install_global()`] for apps, and [`install_thread_local()`] for tests.
///
/// ```no_run
/// use r3bl_async_scope::{DisplayPreference, TracingConfig};
/// use tracing_core::LevelFilter;
///
/// # fn it() -> miette::Result<()> {
/// TracingConfig::new_display(DisplayPreference::Stderr)
///     .with_level_filter(LevelFilter::DEBUG)
///     .install_global()?;
/// # Ok(())
/// # }
/// ```
///
/// [`install_global()`]: Self::install_global
/// [`install_thread_local()`]: Self::install_thread_local
#[derive(Debug, Clone, PartialEq)]
pub struct TracingConfig {
    pub writer_config: WriterConfig,
    pub level_filter: LevelFilter,
}

/// Where log output goes. The `String` is the path of the log file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriterConfig {
    None,
    Display(DisplayPreference),
    File(String /* log file path */),
    DisplayAndFile(DisplayPreference, String /* log file path */),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayPreference {
    Stdout,
    Stderr,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            writer_config: WriterConfig::None,
            level_filter: LevelFilter::OFF,
        }
    }
}

impl TracingConfig {
    /// Logs to both the given [`DisplayPreference`] and a file, at `DEBUG`.
    #[must_use]
    pub fn new_file_and_display(
        maybe_file_path: Option<String>,
        display_preference: DisplayPreference,
    ) -> Self {
        Self {
            writer_config: WriterConfig::DisplayAndFile(
                display_preference,
                maybe_file_path.unwrap_or_else(|| DEFAULT_LOG_FILE_NAME.to_owned()),
            ),
            level_filter: LevelFilter::DEBUG,
        }
    }

    #[must_use]
    pub fn new_display(display_preference: DisplayPreference) -> Self {
        Self {
            writer_config: WriterConfig::Display(display_preference),
            level_filter: LevelFilter::DEBUG,
        }
    }

    #[must_use]
    pub fn new_file(maybe_file_path: Option<String>) -> Self {
        Self {
            writer_config: WriterConfig::File(
                maybe_file_path.unwrap_or_else(|| DEFAULT_LOG_FILE_NAME.to_owned()),
            ),
            level_filter: LevelFilter::DEBUG,
        }
    }

    #[must_use]
    pub fn with_level_filter(mut self, level_filter: LevelFilter) -> Self {
        self.level_filter = level_filter;
        self
    }

    #[must_use]
    pub fn get_writer_config(&self) -> WriterConfig { self.writer_config.clone() }

    #[must_use]
    pub fn get_level_filter(&self) -> LevelFilter { self.level_filter }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.level_filter != LevelFilter::OFF && self.writer_config != WriterConfig::None
    }
}

impl From<LevelFilter> for TracingConfig {
    /// Display to stdout at the given level.
    fn from(level_filter: LevelFilter) -> Self {
        Self::new_display(DisplayPreference::Stdout).with_level_filter(level_filter)
    }
}

impl From<WriterConfig> for TracingConfig {
    fn from(writer_config: WriterConfig) -> Self {
        Self {
            writer_config,
            level_filter: LevelFilter::DEBUG,
        }
    }
}
