//! Tracing and logging support.
//!
//! The router logs through `tracing`: `debug` when a route is selected,
//! `trace` for every candidate that did not match and why, `warn` for
//! conversion failures. This module wires those events to a
//! `tracing-subscriber` output.

#[cfg(feature = "tracing")]
pub use tracing::{self, debug, error, info, instrument, trace, warn};

#[cfg(feature = "tracing")]
use tracing_subscriber::{
    filter::Directive, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

/// Tracing output format.
#[cfg(feature = "tracing")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable format with colors (default for development).
    Pretty,

    /// Compact single-line format.
    Compact,

    /// JSON format (recommended for production).
    Json,
}

/// Tracing configuration.
#[cfg(feature = "tracing")]
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Log level filter.
    ///
    /// If None, uses RUST_LOG environment variable or defaults to "info".
    pub level: Option<tracing::Level>,

    /// Extra filter directives, e.g. `"ruta=trace"`.
    pub directives: Vec<String>,

    /// Output format.
    pub format: TracingFormat,

    /// Include timestamps in output.
    pub timestamps: bool,

    /// Include target module names in output.
    pub target: bool,

    /// Include thread IDs in output.
    pub thread_ids: bool,

    /// Emit ANSI colors.
    pub ansi: bool,
}

#[cfg(feature = "tracing")]
impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: None,
            directives: Vec::new(),
            format: TracingFormat::Pretty,
            timestamps: true,
            target: true,
            thread_ids: false,
            ansi: true,
        }
    }
}

#[cfg(feature = "tracing")]
impl TracingConfig {
    /// Defaults adjusted to the output settings (colors follow `settings.color`).
    pub fn from_settings(settings: &crate::Settings) -> Self {
        Self {
            ansi: settings.color_enabled(),
            ..Self::default()
        }
    }

    /// Show the router's matching decisions.
    pub fn with_route_tracing(mut self) -> Self {
        self.directives.push("ruta=trace".to_string());
        self
    }

    fn filter(&self) -> EnvFilter {
        let mut filter = match self.level {
            Some(level) => EnvFilter::new(level.to_string()),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        };
        // Directives that do not parse are dropped.
        for directive in self.directives.iter().filter_map(|d| d.parse::<Directive>().ok()) {
            filter = filter.add_directive(directive);
        }
        filter
    }
}

/// Initialize tracing subscriber with default settings.
///
/// Uses RUST_LOG environment variable for level filtering.
/// Defaults to "info" level if RUST_LOG is not set. Calling it again after a
/// subscriber is installed does nothing.
///
/// # Example
///
/// ```no_run
/// use ruta::tracing_support::init_subscriber;
///
/// init_subscriber();
/// ```
///
/// # Environment Variables
///
/// - `RUST_LOG=debug` - Log each selected route
/// - `RUST_LOG=ruta=trace` - Also log every rejected candidate
#[cfg(feature = "tracing")]
pub fn init_subscriber() {
    init_subscriber_with_config(TracingConfig::default());
}

/// Initialize tracing subscriber with custom configuration.
///
/// # Example
///
/// ```no_run
/// use ruta::tracing_support::{init_subscriber_with_config, TracingConfig, TracingFormat};
///
/// let config = TracingConfig {
///     format: TracingFormat::Json,
///     timestamps: false,
///     ..Default::default()
/// };
///
/// init_subscriber_with_config(config.with_route_tracing());
/// ```
#[cfg(feature = "tracing")]
pub fn init_subscriber_with_config(config: TracingConfig) {
    let layer = tracing_subscriber::fmt::layer()
        .with_target(config.target)
        .with_thread_ids(config.thread_ids)
        .with_ansi(config.ansi);

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match (config.format, config.timestamps) {
        (TracingFormat::Pretty, true) => layer.pretty().boxed(),
        (TracingFormat::Pretty, false) => layer.pretty().without_time().boxed(),
        (TracingFormat::Compact, true) => layer.compact().boxed(),
        (TracingFormat::Compact, false) => layer.compact().without_time().boxed(),
        (TracingFormat::Json, true) => layer.json().boxed(),
        (TracingFormat::Json, false) => layer.json().without_time().boxed(),
    };

    let _ = tracing_subscriber::registry()
        .with(layer)
        .with(config.filter())
        .try_init();
}

// Fallback when tracing feature is disabled
#[cfg(not(feature = "tracing"))]
pub fn init_subscriber() {
    // No-op when tracing is disabled
}
