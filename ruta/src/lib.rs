//! # ruta: route-based CLI dispatch
//!
//! Declare command shapes as patterns, bind handlers to them, and let the
//! router pick the most specific match for an argument vector.
//!
//! ## Core Principles
//!
//! - **Declarative routes**: `"deploy {env} --dry-run?"` describes literals,
//!   parameters and options in one place
//! - **Deterministic selection**: routes are ranked by specificity, ties go to
//!   registration order
//! - **Safe conversion**: typed parameters never panic; failures name the
//!   offending argument
//! - **Axum-style handlers**: handler arguments are extracted by type
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ruta::{Args, CliResult, FromParams, Params, Router, State};
//!
//! struct AppState {
//!     region: String,
//! }
//!
//! struct DeployArgs {
//!     env: String,
//!     dry_run: bool,
//! }
//!
//! impl FromParams for DeployArgs {
//!     fn from_params(params: &Params) -> CliResult<Self> {
//!         Ok(Self {
//!             env: params.require("env")?,
//!             dry_run: params.flag("dry-run"),
//!         })
//!     }
//! }
//!
//! async fn deploy(state: State<AppState>, Args(args): Args<DeployArgs>) -> CliResult<String> {
//!     let mode = if args.dry_run { "dry run" } else { "live" };
//!     Ok(format!("{} to {} in {}", mode, args.env, state.get().region))
//! }
//!
//! async fn status() -> &'static str {
//!     "ok"
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let router = Router::new()
//!         .route("status", status)
//!         .route("deploy {env} --dry-run?", deploy)
//!         .with_state(AppState { region: "eu-west".into() });
//!
//!     let response = router.execute().await;
//!     if !response.output.is_empty() {
//!         println!("{}", response.output);
//!     }
//!     std::process::exit(response.exit_code);
//! }
//! ```

// Lets derive output refer to `::ruta` from inside this crate.
extern crate self as ruta;

use std::sync::Arc;

pub mod behavior;
pub mod binding;
pub mod convert;
pub mod handler;
mod matcher;
pub mod response;
pub mod route;
pub mod router;
pub mod services;
pub mod settings;
pub mod tracing_support;

pub use behavior::{Behavior, BehaviorContext, Next, TracingBehavior};
pub use binding::{ConversionFailure, FromParams, Params};
pub use convert::{
    ConversionError, CustomValue, EnumValue, FromStrConverter, FromValue, RouteEnum,
    TypeConverter, TypeRegistry, Value,
};
pub use handler::{Args, Command, FromInvocation, Handler, Inject, Invocation, Matched};
pub use response::{IntoResponse, Json, Output, Response};
pub use route::{
    Capability, CapabilityId, OptionDefinition, ParameterDefinition, PatternError,
    RouteDefinition, Segment, Specificity,
};
pub use router::{DispatchError, RouteSpec, Router};
pub use services::Services;
pub use settings::{ColorMode, JsonStyle, Settings};

// Re-export the derive macro
pub use ruta_macros::RouteEnum;

// Re-export tracing itself (required for #[instrument] macro)
#[cfg(feature = "tracing")]
pub use tracing_support::tracing;

#[cfg(feature = "tracing")]
pub use tracing_support::{
    debug, error, info, init_subscriber, init_subscriber_with_config, instrument, trace, warn,
    TracingConfig, TracingFormat,
};

// ============================================================================
// Core Types
// ============================================================================

/// Shared application state wrapper.
///
/// Wraps your application state in an `Arc` for cheap cloning across handlers.
///
/// # Example
///
/// ```
/// use ruta::State;
///
/// struct AppState {
///     config: String,
/// }
///
/// let state = State::new(AppState {
///     config: "production".to_string(),
/// });
///
/// assert_eq!(state.get().config, "production");
/// ```
pub struct State<T>(Arc<T>);

impl<T> State<T> {
    /// Create a new state wrapper.
    pub fn new(inner: T) -> Self {
        Self(Arc::new(inner))
    }

    /// Get a reference to the inner state.
    pub fn get(&self) -> &T {
        &self.0
    }
}

// Manual impl: cloning the Arc must not require `T: Clone`.
impl<T> Clone for State<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> std::ops::Deref for State<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

/// CLI result type.
///
/// Handlers return `CliResult<T>` where `T` implements `IntoResponse`.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Error Types
// ============================================================================

/// Top-level error type for CLI operations.
///
/// Distinguishes between user-fixable errors (exit code 1) and system failures (exit code 101).
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// User-fixable errors (exit code 1).
    #[error(transparent)]
    User(#[from] UserError),

    /// System-level failures (exit code 101).
    #[error(transparent)]
    System(#[from] SystemError),
}

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::User(_) => 1,
            CliError::System(_) => 101,
        }
    }

    /// Convenience constructor for user errors.
    pub fn user(message: impl Into<String>) -> Self {
        CliError::User(UserError::Generic(message.into()))
    }

    /// Convenience constructor for system errors.
    pub fn system(message: impl Into<String>) -> Self {
        CliError::System(SystemError::Internal(message.into()))
    }

    /// Convenience constructor for an invalid argument.
    pub fn invalid_argument(arg: impl Into<String>, reason: impl Into<String>) -> Self {
        CliError::User(UserError::InvalidArgument {
            arg: arg.into(),
            reason: reason.into(),
        })
    }
}

/// User-fixable errors (exit code 1).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserError {
    /// Generic user error with a message.
    #[error("Error: {0}")]
    Generic(String),

    /// Invalid argument provided.
    #[error("Error: Invalid argument '{arg}'\n\n{reason}")]
    InvalidArgument { arg: String, reason: String },

    /// A value the handler requires was not bound.
    #[error("Error: Missing argument '{0}'")]
    MissingArgument(String),

    /// Validation failed.
    #[error("Error: Validation failed\n\n{}", details.join("\n"))]
    ValidationFailed { details: Vec<String> },

    /// No route matched the input.
    #[error("Error: Unknown command '{input}'")]
    UnknownCommand { input: String },
}

/// System-level failures (exit code 101).
#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    /// Generic internal error.
    #[error("Internal Error: {0}\n\nThis is likely a bug.")]
    Internal(String),

    /// I/O error.
    #[error("Internal Error: I/O operation failed\n\n{0:?}\n\nThis is likely a bug.")]
    Io(#[from] std::io::Error),

    /// A handler asked for a service nobody registered.
    #[error("Internal Error: No service registered for '{0}'\n\nThis is likely a bug.")]
    ServiceUnavailable(String),
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::System(SystemError::Io(e))
    }
}

// ============================================================================
// Tests
// ============================================================================
