//! Handler results and their rendering.

use crate::convert::{format_duration, Value, DATETIME_FORMAT};
use crate::settings::{JsonStyle, Settings};
use crate::{CliError, CliResult};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::Serialize;
use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;
use url::Url;
use uuid::Uuid;

// ============================================================================
// Response Types
// ============================================================================

/// Response returned by handlers after execution.
///
/// Contains exit code and output to be displayed to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Exit code (0 = success, 1 = user error, 101 = system error).
    pub exit_code: i32,

    /// Output to display (text, JSON, or silent).
    pub output: Output,
}

impl Response {
    /// Create a successful response with text output.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            output: Output::Text(content.into()),
        }
    }

    /// Create a successful silent response.
    pub fn silent() -> Self {
        Self {
            exit_code: 0,
            output: Output::Silent,
        }
    }

    /// Create a successful JSON response.
    pub fn json(value: serde_json::Value) -> Self {
        Self {
            exit_code: 0,
            output: Output::Json(value),
        }
    }

    /// Create an error response.
    pub fn error(exit_code: i32, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            output: Output::Text(message.into()),
        }
    }

    /// Render an error, styling its headline according to `settings`.
    pub fn from_error(error: &CliError, settings: &Settings) -> Self {
        Self::error(error.exit_code(), render_error(&error.to_string(), settings))
    }

    /// Apply output settings (JSON layout).
    pub fn rendered(self, settings: &Settings) -> String {
        self.output.render(settings.json)
    }
}

/// Output type for responses.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    /// No output.
    Silent,

    /// Text output (printed to stdout).
    Text(String),

    /// JSON output (for machine-readable responses).
    Json(serde_json::Value),
}

impl Output {
    /// Check if output is empty.
    pub fn is_empty(&self) -> bool {
        matches!(self, Output::Silent)
    }

    /// Text form with JSON laid out per `style`.
    pub fn render(&self, style: JsonStyle) -> String {
        match (self, style) {
            (Output::Silent, _) => String::new(),
            (Output::Text(s), _) => s.clone(),
            (Output::Json(value), JsonStyle::Compact) => value.to_string(),
            (Output::Json(value), JsonStyle::Pretty) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
        }
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render(JsonStyle::Pretty))
    }
}

/// Style the first line of an error message.
fn render_error(message: &str, settings: &Settings) -> String {
    match message.split_once('\n') {
        Some((headline, rest)) => format!("{}\n{}", settings.error_headline(headline), rest),
        None => settings.error_headline(message),
    }
}

// ============================================================================
// Response Conversion Trait
// ============================================================================

/// Trait for converting handler return values into responses.
///
/// | return type | output |
/// |---|---|
/// | `()` | nothing |
/// | strings, numbers, `bool`, `char`, `Uuid` | raw text |
/// | dates and times | ISO-8601 |
/// | `TimeDelta` | `[-][d.]hh:mm:ss[.fffffffff]` |
/// | [`Json<T>`] | JSON, falling back to `Debug` text |
/// | `CliResult<T>` | `T`'s output, or the error |
pub trait IntoResponse {
    /// Convert into a response.
    fn into_response(self) -> Response;

    /// Convert into a response, keeping errors as errors.
    fn into_result(self) -> CliResult<Response>
    where
        Self: Sized,
    {
        Ok(self.into_response())
    }
}

impl IntoResponse for Response {
    fn into_response(self) -> Response {
        self
    }
}

impl IntoResponse for () {
    fn into_response(self) -> Response {
        Response::silent()
    }
}

impl IntoResponse for String {
    fn into_response(self) -> Response {
        Response::text(self)
    }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response {
        Response::text(self)
    }
}

macro_rules! impl_into_response_display {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoResponse for $ty {
                fn into_response(self) -> Response {
                    Response::text(self.to_string())
                }
            }
        )*
    };
}

impl_into_response_display!(
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, Url,
    IpAddr, Value,
);

impl IntoResponse for Uuid {
    fn into_response(self) -> Response {
        Response::text(self.hyphenated().to_string())
    }
}

impl IntoResponse for NaiveDateTime {
    fn into_response(self) -> Response {
        Response::text(self.format(DATETIME_FORMAT).to_string())
    }
}

impl IntoResponse for DateTime<FixedOffset> {
    fn into_response(self) -> Response {
        Response::text(self.to_rfc3339())
    }
}

impl IntoResponse for NaiveDate {
    fn into_response(self) -> Response {
        Response::text(self.format("%Y-%m-%d").to_string())
    }
}

impl IntoResponse for NaiveTime {
    fn into_response(self) -> Response {
        Response::text(self.format("%H:%M:%S%.f").to_string())
    }
}

impl IntoResponse for TimeDelta {
    fn into_response(self) -> Response {
        Response::text(format_duration(self))
    }
}

impl IntoResponse for PathBuf {
    fn into_response(self) -> Response {
        Response::text(self.display().to_string())
    }
}

impl<T: IntoResponse> IntoResponse for Option<T> {
    fn into_response(self) -> Response {
        match self {
            Some(value) => value.into_response(),
            None => Response::silent(),
        }
    }
}

impl<T: IntoResponse> IntoResponse for CliResult<T> {
    fn into_response(self) -> Response {
        match self {
            Ok(value) => value.into_response(),
            Err(e) => Response::error(e.exit_code(), e.to_string()),
        }
    }

    fn into_result(self) -> CliResult<Response> {
        self.map(IntoResponse::into_response)
    }
}

/// Serialize a handler result as JSON.
///
/// ```
/// use ruta::{IntoResponse, Json, Output};
///
/// #[derive(Debug, serde::Serialize)]
/// struct Status {
///     healthy: bool,
/// }
///
/// let response = Json(Status { healthy: true }).into_response();
/// assert!(matches!(response.output, Output::Json(_)));
/// ```
#[derive(Debug, Clone)]
pub struct Json<T>(pub T);

impl<T: Serialize + fmt::Debug> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        match serde_json::to_value(&self.0) {
            Ok(value) => Response::json(value),
            Err(e) => {
                tracing::error!(error = %e, "JSON serialization failed, falling back to debug output");
                Response::text(format!("{:?}", self.0))
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
