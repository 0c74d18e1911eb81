// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use super::{DisplayPreference, TracingConfig, WriterConfig, rolling_file_appender_impl};
use crate::ok;
use miette::IntoDiagnostic;
use tracing::subscriber::DefaultGuard;
use tracing_core::LevelFilter;
use tracing_subscriber::{Layer, Registry, layer::SubscriberExt, registry::LookupSpan,
                         util::SubscriberInitExt};

/// Avoid gnarly type annotations by using a macro to create the `fmt` layer.
#[macro_export]
macro_rules! create_fmt {
    () => {
        tracing_subscriber::fmt::layer()
            .compact()
            .with_thread_ids(true)
            .with_thread_names(false)
            .with_target(false)
            .with_file(false)
            .with_line_number(false)
    };
}

/// Type alias for a boxed layer.
pub type DynLayer<S> = dyn Layer<S> + Send + Sync + 'static;

/// Returns the layers. This does not initialize the tracing system. Use
/// [`TracingConfig::install_global()`] or [`TracingConfig::install_thread_local()`] for
/// that, or do it yourself:
/// `tracing_subscriber::registry().with(layers).init()`.
///
/// # Errors
///
/// Returns an error if the log file can't be created.
pub fn try_create_layers(
    tracing_config: &TracingConfig,
) -> miette::Result<Vec<Box<DynLayer<Registry>>>> {
    let level_filter = tracing_config.get_level_filter();
    let mut layers: Vec<Box<DynLayer<Registry>>> = vec![];

    // Also filters layers (added later) that have no filter of their own.
    layers.push(Box::new(level_filter));

    if let Some(layer) =
        try_create_display_layer(level_filter, tracing_config.get_writer_config())?
    {
        layers.push(layer);
    }

    if let Some(layer) =
        try_create_file_layer(level_filter, tracing_config.get_writer_config())?
    {
        layers.push(layer);
    }

    Ok(layers)
}

/// This erases the concrete type of the writer, and returns a boxed layer.
///
/// This is useful for composition of layers. There's more info in the docs
/// [here](https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/index.html#runtime-configuration-with-layers).
///
/// # Errors
///
/// Never fails today. Fallible for symmetry with [`try_create_file_layer()`].
pub fn try_create_display_layer<S>(
    level_filter: LevelFilter,
    writer_config: WriterConfig,
) -> miette::Result<Option<Box<DynLayer<S>>>>
where
    S: tracing_core::Subscriber,
    for<'a> S: LookupSpan<'a>,
{
    let fmt_layer = create_fmt!();

    Ok(match writer_config {
        WriterConfig::DisplayAndFile(display_preference, _)
        | WriterConfig::Display(display_preference) => match display_preference {
            DisplayPreference::Stdout => Some(Box::new(
                fmt_layer
                    .with_writer(std::io::stdout)
                    .with_filter(level_filter),
            )),
            DisplayPreference::Stderr => Some(Box::new(
                fmt_layer
                    .with_writer(std::io::stderr)
                    .with_filter(level_filter),
            )),
        },
        WriterConfig::None | WriterConfig::File(_) => None,
    })
}

/// Like [`try_create_display_layer()`], but writes to the log file, without colors.
///
/// # Errors
///
/// Returns an error if the log file can't be created.
pub fn try_create_file_layer<S>(
    level_filter: LevelFilter,
    writer_config: WriterConfig,
) -> miette::Result<Option<Box<DynLayer<S>>>>
where
    S: tracing_core::Subscriber,
    for<'a> S: LookupSpan<'a>,
{
    let fmt_layer = create_fmt!().with_ansi(false);

    Ok(match writer_config {
        WriterConfig::DisplayAndFile(_, file_path) | WriterConfig::File(file_path) => {
            let file = rolling_file_appender_impl::try_create(file_path.as_str())?;
            Some(Box::new(
                fmt_layer.with_writer(file).with_filter(level_filter),
            ))
        }
        WriterConfig::None | WriterConfig::Display(_) => None,
    })
}

impl TracingConfig {
    /// Global default subscriber, which once set, can't be unset or changed. This is
    /// great for apps.
    ///
    /// # Errors
    ///
    /// Returns an error if the log file can't be created, or if a global subscriber is
    /// already installed.
    pub fn install_global(&self) -> miette::Result<()> {
        let layers = try_create_layers(self)?;
        tracing_subscriber::registry()
            .with(layers)
            .try_init()
            .into_diagnostic()?;
        ok!()
    }

    /// Thread local subscriber, active until the returned guard is dropped. This is
    /// great for tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the log file can't be created.
    pub fn install_thread_local(&self) -> miette::Result<DefaultGuard> {
        let layers = try_create_layers(self)?;
        let subscriber = tracing_subscriber::registry().with(layers);
        Ok(tracing::subscriber::set_default(subscriber))
    }
}

/// Installs `options` as the global subscriber, unless logging is disabled.
///
/// # Errors
///
/// See [`TracingConfig::install_global()`].
pub fn try_initialize_logging_global(
    options: impl Into<TracingConfig>,
) -> miette::Result<()> {
    let it: TracingConfig = options.into();

    // Early return if logging is off.
    if !it.is_enabled() {
        return ok!();
    }

    it.install_global()
}

/// Installs `options` for the current thread, unless logging is disabled.
///
/// # Errors
///
/// See [`TracingConfig::install_thread_local()`].
pub fn try_initialize_logging_thread_local(
    options: impl Into<TracingConfig>,
) -> miette::Result<Option<DefaultGuard>> {
    let it: TracingConfig = options.into();

    // Early return if logging is off.
    if !it.is_enabled() {
        return Ok(None);
    }

    it.install_thread_local().map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_eq2;
    use serial_test::serial;

    #[test]
    fn test_try_create_display_layer() {
        let layer: Option<Box<DynLayer<Registry>>> = try_create_display_layer(
            LevelFilter::DEBUG,
            WriterConfig::Display(DisplayPreference::Stdout),
        )
        .unwrap();
        assert!(layer.is_some());

        let layer: Option<Box<DynLayer<Registry>>> =
            try_create_display_layer(LevelFilter::DEBUG, WriterConfig::None).unwrap();
        assert!(layer.is_none());
    }

    #[test]
    fn test_try_create_file_layer() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("file_layer.log");
        let file_path = file_path.to_str().unwrap().to_owned();

        let layer: Option<Box<DynLayer<Registry>>> = try_create_file_layer(
            LevelFilter::DEBUG,
            WriterConfig::File(file_path.clone()),
        )
        .unwrap();

        assert!(layer.is_some());
        assert!(std::path::Path::new(&file_path).exists());
    }

    #[test]
    fn test_try_create_both_layers() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("both_layers.log");
        let file_path = file_path.to_str().unwrap().to_owned();

        let tracing_config = TracingConfig {
            writer_config: WriterConfig::DisplayAndFile(
                DisplayPreference::Stderr,
                file_path.clone(),
            ),
            level_filter: LevelFilter::DEBUG,
        };

        let layers = try_create_layers(&tracing_config).unwrap();
        // Level filter, display, file.
        assert_eq2!(layers.len(), 3);
        assert!(std::path::Path::new(&file_path).exists());
    }

    #[test]
    fn thread_local_subscriber_writes_scope_events_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("thread_local.log");
        let file_path_str = file_path.to_str().unwrap().to_owned();

        let guard = TracingConfig::new_file(Some(file_path_str))
            .with_level_filter(LevelFilter::INFO)
            .install_thread_local()
            .unwrap();
        tracing::info!(message = "kept", scope_id = 42);
        tracing::debug!(message = "filtered out");
        drop(guard);

        let output = std::fs::read_to_string(&file_path).unwrap();
        assert!(output.contains("kept"));
        assert!(output.contains("scope_id=42"));
        assert!(!output.contains("filtered out"));
    }

    #[test]
    fn disabled_config_installs_nothing() {
        let maybe_guard = try_initialize_logging_thread_local(LevelFilter::OFF).unwrap();
        assert!(maybe_guard.is_none());
        try_initialize_logging_global(TracingConfig::default()).unwrap();
    }

    #[test]
    #[serial]
    fn global_subscriber_can_only_be_installed_once() {
        let config = TracingConfig::new_display(DisplayPreference::Stderr)
            .with_level_filter(LevelFilter::WARN);
        assert!(config.install_global().is_ok());
        assert!(config.install_global().is_err());
    }
}
