//! Route registration and dispatch.
//!
//! Routes are kept ranked by [`Specificity`](crate::Specificity), most
//! specific first, ties in registration order. Dispatch tries them in that
//! order: a shape mismatch moves on to the next route, a conversion failure
//! ends the dispatch.

use crate::behavior::{self, Behavior, BehaviorContext, BehaviorEntry, Endpoint};
use crate::binding::{self, ConversionFailure, Params};
use crate::convert::{ConversionError, RouteEnum, TypeConverter, TypeRegistry};
use crate::handler::{Command, ErasedHandler, Handler, HandlerFn, WithState};
use crate::matcher;
use crate::response::Response;
use crate::route::{Capability, CapabilityId, PatternError, RouteDefinition};
use crate::services::Services;
use crate::settings::Settings;
use crate::{CliError, State, UserError};
use std::any::Any;
use std::sync::Arc;

// ============================================================================
// Route registration
// ============================================================================

/// A pattern plus its registration metadata.
///
/// Plain strings convert into a `RouteSpec`, so `router.route("status", h)`
/// and `router.route(RouteSpec::new("status").alias("st"), h)` both work.
#[derive(Debug, Clone)]
pub struct RouteSpec {
    pattern: String,
    aliases: Vec<String>,
    description: Option<String>,
    capabilities: Vec<CapabilityId>,
}

impl RouteSpec {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            aliases: Vec::new(),
            description: None,
            capabilities: Vec::new(),
        }
    }

    /// Alternative spelling of the pattern's first literal.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attach capability `C` to the route.
    pub fn capability<C: Capability>(mut self) -> Self {
        self.capabilities.push(CapabilityId::of::<C>());
        self
    }
}

impl From<&str> for RouteSpec {
    fn from(pattern: &str) -> Self {
        Self::new(pattern)
    }
}

impl From<String> for RouteSpec {
    fn from(pattern: String) -> Self {
        Self::new(pattern)
    }
}

struct RouteEntry<S> {
    route: Arc<RouteDefinition>,
    handler: Arc<dyn ErasedHandler<S>>,
}

// ============================================================================
// Errors
// ============================================================================

/// Why a dispatch did not produce a successful response.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// No route matched the tokens.
    #[error("Error: Unknown command '{input}'")]
    NoRouteMatched { input: String },

    /// A route matched in shape but a value did not convert.
    #[error("Error: Invalid argument '{}'\n\n{}", .0.name, .0.reason())]
    Conversion(ConversionFailure),

    /// The handler, an extractor or a behavior failed.
    #[error(transparent)]
    Handler(#[from] CliError),
}

impl DispatchError {
    pub fn exit_code(&self) -> i32 {
        match self {
            DispatchError::NoRouteMatched { .. } | DispatchError::Conversion(_) => 1,
            DispatchError::Handler(e) => e.exit_code(),
        }
    }
}

impl From<DispatchError> for CliError {
    fn from(e: DispatchError) -> Self {
        match e {
            DispatchError::NoRouteMatched { input } => UserError::UnknownCommand { input }.into(),
            DispatchError::Conversion(failure) => failure.into(),
            DispatchError::Handler(e) => e,
        }
    }
}

// ============================================================================
// Router
// ============================================================================

/// Routes, behaviors, converters and services of one CLI.
///
/// # Example
///
/// ```
/// use ruta::{Output, Router};
///
/// async fn status() -> &'static str {
///     "ok"
/// }
///
/// # futures::executor::block_on(async {
/// let router: Router = Router::new().route("status", status);
/// let response = router.execute_with(["status"]).await;
/// assert_eq!(response.exit_code, 0);
/// assert_eq!(response.output, Output::Text("ok".into()));
/// # });
/// ```
pub struct Router<S = ()> {
    routes: Vec<RouteEntry<S>>,
    behaviors: Vec<BehaviorEntry>,
    types: TypeRegistry,
    services: Arc<Services>,
    settings: Settings,
    prefix: Vec<String>,
    next_order: usize,
}

impl<S> Router<S> {
    /// Create a router with settings read from the environment.
    ///
    /// The state type is inferred from the handlers; call
    /// [`Router::with_state`] to supply it.
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            behaviors: Vec::new(),
            types: TypeRegistry::new(),
            services: Arc::new(Services::new()),
            settings: Settings::from_env(),
            prefix: Vec::new(),
            next_order: 0,
        }
    }
}

impl Default for Router<()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Send + Sync + 'static> Router<S> {
    /// Register a route.
    ///
    /// # Panics
    ///
    /// Panics if the pattern is invalid. Use [`Router::try_route`] to handle
    /// the error instead.
    pub fn route<T, H>(self, spec: impl Into<RouteSpec>, handler: H) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        let spec = spec.into();
        let pattern = spec.pattern.clone();
        match self.try_route(spec, handler) {
            Ok(router) => router,
            Err(e) => panic!("invalid route pattern '{}': {}", pattern, e),
        }
    }

    /// Register a route, returning the pattern error if it is invalid.
    pub fn try_route<T, H>(self, spec: impl Into<RouteSpec>, handler: H) -> Result<Self, PatternError>
    where
        H: Handler<T, S>,
        T: 'static,
    {
        let handler: Arc<dyn ErasedHandler<S>> = Arc::new(HandlerFn::<H, T>::new(handler));
        self.insert(spec.into(), handler)
    }

    /// Register a typed command route; `C`'s capabilities are attached to it.
    ///
    /// ```
    /// use ruta::{Args, CliResult, Command, FromParams, Params, Router};
    ///
    /// struct Purge {
    ///     bucket: String,
    /// }
    ///
    /// impl FromParams for Purge {
    ///     fn from_params(params: &Params) -> CliResult<Self> {
    ///         Ok(Self { bucket: params.require("bucket")? })
    ///     }
    /// }
    ///
    /// impl Command for Purge {}
    ///
    /// async fn purge(Args(cmd): Args<Purge>) -> String {
    ///     format!("purged {}", cmd.bucket)
    /// }
    ///
    /// let router: Router = Router::new().command::<Purge, _, _>("purge {bucket}", purge);
    /// assert_eq!(router.routes().count(), 1);
    /// ```
    pub fn command<C, T, H>(self, spec: impl Into<RouteSpec>, handler: H) -> Self
    where
        C: Command,
        H: Handler<T, S>,
        T: 'static,
    {
        let mut spec = spec.into();
        spec.capabilities.extend(C::capabilities());
        self.route(spec, handler)
    }

    /// Register the routes built by `build` under the `prefix` words.
    ///
    /// Groups nest: a group inside a group adds its words after the outer
    /// ones.
    pub fn group<F>(mut self, prefix: &str, build: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        let outer = self.prefix.clone();
        self.prefix.extend(prefix.split_whitespace().map(String::from));
        let mut router = build(self);
        router.prefix = outer;
        router
    }

    fn insert(mut self, spec: RouteSpec, handler: Arc<dyn ErasedHandler<S>>) -> Result<Self, PatternError> {
        let route = RouteDefinition::parse(&spec.pattern)?
            .with_aliases(spec.aliases)?
            .with_group_prefix(self.prefix.clone())
            .with_description(spec.description)
            .with_capabilities(spec.capabilities)
            .with_order(self.next_order);

        tracing::debug!(route = %route, order = self.next_order, "Route registered");

        self.next_order += 1;
        self.routes.push(RouteEntry {
            route: Arc::new(route),
            handler,
        });
        // Stable: equal specificity keeps registration order.
        self.routes
            .sort_by(|a, b| b.route.specificity().cmp(&a.route.specificity()));
        Ok(self)
    }

    /// Add a behavior that wraps every dispatch.
    pub fn behavior<B: Behavior>(mut self, behavior: B) -> Self {
        self.behaviors.push(BehaviorEntry::new(Arc::new(behavior), None));
        self
    }

    /// Add a behavior that only wraps routes carrying capability `C`.
    pub fn behavior_for<C: Capability, B: Behavior>(mut self, behavior: B) -> Self {
        self.behaviors
            .push(BehaviorEntry::new(Arc::new(behavior), Some(CapabilityId::of::<C>())));
        self
    }

    /// Register a custom type converter.
    pub fn converter<C: TypeConverter>(mut self, converter: C) -> Self {
        self.types.register(converter);
        self
    }

    /// Register an enum for case-insensitive conversion.
    pub fn enum_type<E: RouteEnum>(mut self) -> Self {
        self.types.register_enum::<E>();
        self
    }

    /// Register a lazily built, shared service.
    pub fn singleton<T, F>(mut self, factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Services) -> T + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.services).singleton(factory);
        self
    }

    /// Register a service built on every resolve.
    pub fn transient<T, F>(mut self, factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Services) -> T + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.services).transient(factory);
        self
    }

    /// Register an already built service.
    pub fn instance<T: Any + Send + Sync>(mut self, value: T) -> Self {
        Arc::make_mut(&mut self.services).instance(value);
        self
    }

    /// Replace the output settings.
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Bind the application state, producing a router ready to dispatch.
    pub fn with_state(self, state: S) -> Router<()> {
        let state = State::new(state);
        let routes = self
            .routes
            .into_iter()
            .map(|entry| RouteEntry {
                route: entry.route,
                handler: Arc::new(WithState::new(entry.handler, state.clone())) as Arc<dyn ErasedHandler<()>>,
            })
            .collect();

        Router {
            routes,
            behaviors: self.behaviors,
            types: self.types,
            services: self.services,
            settings: self.settings,
            prefix: self.prefix,
            next_order: self.next_order,
        }
    }
}

impl<S> Router<S> {
    /// Registered routes, most specific first.
    pub fn routes(&self) -> impl Iterator<Item = &RouteDefinition> {
        self.routes.iter().map(|entry| entry.route.as_ref())
    }

    /// Type aliases used by routes that no converter answers to, sorted.
    pub fn unknown_types(&self) -> Vec<String> {
        let mut unknown: Vec<String> = self
            .routes()
            .flat_map(|route| {
                let params = route.parameters().map(|param| param.type_alias());
                let options = route
                    .options()
                    .filter_map(|option| option.value.as_ref())
                    .map(|value| value.type_alias());
                params.chain(options).collect::<Vec<_>>()
            })
            .filter(|alias| !self.types.knows(alias))
            .map(String::from)
            .collect();
        unknown.sort();
        unknown.dedup();
        unknown
    }

    /// Option defaults that do not convert to their declared type.
    ///
    /// Defaults of unknown types are left to [`Router::unknown_types`].
    pub fn invalid_defaults(&self) -> Vec<ConversionFailure> {
        self.routes()
            .flat_map(|route| route.options())
            .filter_map(|option| {
                let value = option.value.as_ref()?;
                let default = option.default_value.as_deref()?;
                match self.types.try_convert(default, value.type_alias()) {
                    Err(error @ ConversionError::Invalid { .. }) => {
                        Some(ConversionFailure::new(&value.name, default, None, error))
                    }
                    _ => None,
                }
            })
            .collect()
    }

    /// Output settings in effect.
    pub fn output_settings(&self) -> &Settings {
        &self.settings
    }
}

impl Router<()> {
    /// Dispatch the process arguments (program name skipped).
    pub async fn execute(&self) -> Response {
        self.execute_with(std::env::args().skip(1)).await
    }

    /// Dispatch `args`, rendering any error into the response.
    pub async fn execute_with<I, A>(&self, args: I) -> Response
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        match self.dispatch(args).await {
            Ok(response) => response,
            Err(e) => Response::from_error(&CliError::from(e), &self.settings),
        }
    }

    /// Dispatch `args`.
    pub async fn dispatch<I, A>(&self, args: I) -> Result<Response, DispatchError>
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        let tokens: Vec<String> = args.into_iter().map(Into::into).collect();
        let (entry, params) = self.select(&tokens)?;

        let context = Arc::new(BehaviorContext::new(
            Arc::clone(&entry.route),
            tokens,
            params,
            Arc::clone(&self.services),
        ));
        let chain = behavior::pipeline_for(&self.behaviors, &entry.route);

        let handler = Arc::clone(&entry.handler);
        let handler_context = Arc::clone(&context);
        let endpoint: Endpoint = Box::new(move || handler.call(State::new(()), handler_context));

        behavior::run(&chain, &context, endpoint)
            .await
            .map_err(DispatchError::Handler)
    }

    fn select(&self, tokens: &[String]) -> Result<(&RouteEntry<()>, Params), DispatchError> {
        for entry in &self.routes {
            let raw = match matcher::match_route(&entry.route, tokens) {
                Ok(raw) => raw,
                Err(mismatch) => {
                    tracing::trace!(route = %entry.route, reason = %mismatch, "Route skipped");
                    continue;
                }
            };

            tracing::debug!(route = %entry.route, "Route selected");

            return match binding::bind(&raw, &self.types) {
                Ok(params) => Ok((entry, params)),
                Err(failure) => {
                    tracing::warn!(
                        route = %entry.route,
                        argument = %failure.name,
                        value = %failure.raw,
                        expected = %failure.expected,
                        "Conversion failed"
                    );
                    Err(DispatchError::Conversion(failure))
                }
            };
        }

        Err(DispatchError::NoRouteMatched {
            input: tokens.join(" "),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CliResult, Matched, Output};
    use assert_matches::assert_matches;

    fn quiet() -> Settings {
        Settings {
            color: crate::ColorMode::Never,
            ..Default::default()
        }
    }

    fn router() -> Router {
        Router::new()
    }

    async fn which(matched: Matched) -> String {
        matched.route().to_string()
    }

    #[test]
    fn test_routes_are_ranked() {
        let router = router()
            .route("{*args}", which)
            .route("deploy {env}", which)
            .route("deploy {env} --dry-run", which)
            .route("deploy {env?}", which)
            .route("deploy prod", which);

        let order: Vec<String> = router.routes().map(ToString::to_string).collect();
        assert_eq!(
            order,
            vec![
                "deploy prod",
                "deploy {env} --dry-run",
                "deploy {env}",
                "deploy {env?}",
                "{*args}",
            ]
        );
    }

    #[test]
    fn test_ties_keep_registration_order() {
        let router = router()
            .route("get {id}", which)
            .route("get {name}", which);
        let orders: Vec<usize> = router.routes().map(RouteDefinition::order).collect();
        assert_eq!(orders, vec![0, 1]);
    }

    #[test]
    fn test_try_route_reports_pattern_errors() {
        let result = router().try_route("copy {*a} {*b}", which);
        assert_matches!(result.map(|_| ()), Err(PatternError::MultipleCatchAll));
    }

    #[test]
    #[should_panic(expected = "invalid route pattern")]
    fn test_route_panics_on_invalid_pattern() {
        let _ = router().route("copy {src", which);
    }

    #[tokio::test]
    async fn test_specific_route_wins_over_catch_all() {
        let router = router()
            .route("{*args}", which)
            .route("deploy {env}", which);

        let response = router.dispatch(["deploy", "prod"]).await.unwrap();
        assert_eq!(response.output, Output::Text("deploy {env}".into()));
    }

    #[tokio::test]
    async fn test_groups_nest() {
        let router = router().group("db", |g| {
            g.route("migrate", which)
                .group("user", |g| g.route("add {name}", which))
        });

        let patterns: Vec<String> = router.routes().map(ToString::to_string).collect();
        assert!(patterns.contains(&"db migrate".to_string()));
        assert!(patterns.contains(&"db user add {name}".to_string()));

        let response = router.dispatch(["db", "user", "add", "ada"]).await.unwrap();
        assert_eq!(response.output, Output::Text("db user add {name}".into()));

        assert_matches!(
            router.dispatch(["user", "add", "ada"]).await,
            Err(DispatchError::NoRouteMatched { .. })
        );
    }

    #[tokio::test]
    async fn test_group_prefix_does_not_leak() {
        let router = router()
            .group("db", |g| g.route("migrate", which))
            .route("status", which);

        let response = router.dispatch(["status"]).await.unwrap();
        assert_eq!(response.output, Output::Text("status".into()));
    }

    #[tokio::test]
    async fn test_alias_dispatch() {
        let router = router().route(RouteSpec::new("remove {name}").alias("rm"), which);

        for first in ["remove", "rm"] {
            let response = router.dispatch([first, "x"]).await.unwrap();
            assert_eq!(response.output, Output::Text("remove {name}".into()));
        }
    }

    #[test]
    fn test_alias_needs_literal() {
        let result = router().try_route(RouteSpec::new("{name}").alias("n"), which);
        assert_matches!(result.map(|_| ()), Err(PatternError::InvalidAlias(_)));
    }

    #[test]
    fn test_route_metadata() {
        struct Audited;
        impl Capability for Audited {}

        let router = router().route(
            RouteSpec::new("purge {bucket}")
                .description("Delete everything")
                .capability::<Audited>(),
            which,
        );
        let route = router.routes().next().unwrap();
        assert_eq!(route.description(), Some("Delete everything"));
        assert!(route.has_capability(CapabilityId::of::<Audited>()));
    }

    #[test]
    fn test_unknown_types() {
        let router = router()
            .route("wait {d:duration}", which)
            .route("paint {c:colour} --size {s:shape?}", which)
            .route("mix {a:colour} {b:colour}", which);
        assert_eq!(router.unknown_types(), vec!["colour", "shape"]);
    }

    #[test]
    fn test_invalid_defaults() {
        let router = router()
            .route("serve --port {p:int=abc} --host {h=localhost}", which)
            .route("wait --for {d:timespan=00:00:05}", which)
            .route("paint --with {c:colour=red}", which);

        let invalid = router.invalid_defaults();
        assert_eq!(invalid.len(), 1);
        assert_eq!(invalid[0].name, "p");
        assert_eq!(invalid[0].raw, "abc");
        assert_eq!(invalid[0].expected, "int");
        assert_eq!(router.unknown_types(), vec!["colour"]);
    }

    #[tokio::test]
    async fn test_no_route_message() {
        let router = router().route("status", which).settings(quiet());

        let response = router.execute_with(["frobnicate", "now"]).await;
        assert_eq!(response.exit_code, 1);
        assert_eq!(response.output.to_string(), "Error: Unknown command 'frobnicate now'");
    }

    #[tokio::test]
    async fn test_conversion_failure_stops_dispatch() {
        async fn counted(params: Params) -> String {
            format!("{:?}", params.get::<i32>("n"))
        }
        async fn fallback() -> &'static str {
            "fallback"
        }

        let router = router()
            .route("count {n:int}", counted)
            .route("count {*rest}", fallback)
            .settings(quiet());

        let err = router.dispatch(["count", "abc"]).await.unwrap_err();
        assert_matches!(&err, DispatchError::Conversion(failure) if failure.name == "n");
        assert_eq!(err.exit_code(), 1);
        assert_eq!(
            err.to_string(),
            "Error: Invalid argument 'n'\n\ncannot convert 'abc' to int"
        );
    }

    #[tokio::test]
    async fn test_handler_error_passes_through() {
        async fn broken() -> CliResult<()> {
            Err(CliError::system("disk on fire"))
        }

        let router = router().route("burn", broken).settings(quiet());
        let response = router.execute_with(["burn"]).await;
        assert_eq!(response.exit_code, 101);
        assert!(response.output.to_string().contains("disk on fire"));
    }

    #[tokio::test]
    async fn test_state_and_services() {
        struct App {
            name: &'static str,
        }
        struct Greeting(&'static str);

        async fn hello(state: State<App>, crate::Inject(greeting): crate::Inject<Greeting>) -> String {
            format!("{} {}", greeting.0, state.name)
        }

        let router = Router::new()
            .route("hello", hello)
            .instance(Greeting("hi"))
            .with_state(App { name: "ruta" });

        let response = router.dispatch(["hello"]).await.unwrap();
        assert_eq!(response.output, Output::Text("hi ruta".into()));
    }

    #[test]
    fn test_dispatch_error_into_cli_error() {
        let err: CliError = DispatchError::NoRouteMatched { input: "x".into() }.into();
        assert_matches!(err, CliError::User(UserError::UnknownCommand { input }) if input == "x");
    }
}
