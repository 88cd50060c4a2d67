//! Behavior pipeline.
//!
//! Behaviors wrap handler execution, outermost first in registration order.
//! Each one receives the matched route's [`BehaviorContext`] and a [`Next`]
//! continuation; it may act before or after calling `next.run()`, skip it to
//! short-circuit, or return an error.
//!
//! A behavior registered with a capability filter only joins the pipeline
//! when the selected route carries that capability.

use crate::binding::Params;
use crate::response::Response;
use crate::route::{Capability, CapabilityId, RouteDefinition};
use crate::services::Services;
use crate::CliResult;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

// ============================================================================
// Context
// ============================================================================

/// The matched route, its tokens and bound values.
#[derive(Debug)]
pub struct BehaviorContext {
    route: Arc<RouteDefinition>,
    tokens: Vec<String>,
    params: Params,
    services: Arc<Services>,
}

impl BehaviorContext {
    pub(crate) fn new(
        route: Arc<RouteDefinition>,
        tokens: Vec<String>,
        params: Params,
        services: Arc<Services>,
    ) -> Self {
        Self {
            route,
            tokens,
            params,
            services,
        }
    }

    /// The selected route.
    pub fn route(&self) -> &RouteDefinition {
        &self.route
    }

    pub(crate) fn route_arc(&self) -> &Arc<RouteDefinition> {
        &self.route
    }

    /// The full token vector as dispatched.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Whether the selected route carries capability `C`.
    pub fn has_capability<C: Capability>(&self) -> bool {
        self.route.has_capability(CapabilityId::of::<C>())
    }
}

// ============================================================================
// Behavior
// ============================================================================

/// Middleware around handler execution.
///
/// Behaviors are constructed once and shared by every dispatch, so they must
/// not keep per-invocation mutable state.
///
/// # Example
///
/// ```
/// use ruta::{Behavior, BehaviorContext, CliError, CliResult, Next, Response};
///
/// struct RequireConfirm;
///
/// #[async_trait::async_trait]
/// impl Behavior for RequireConfirm {
///     async fn handle(&self, ctx: &BehaviorContext, next: Next<'_>) -> CliResult<Response> {
///         if !ctx.params().flag("yes") {
///             return Err(CliError::user("pass --yes to confirm"));
///         }
///         next.run().await
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait Behavior: Send + Sync + 'static {
    async fn handle(&self, ctx: &BehaviorContext, next: Next<'_>) -> CliResult<Response>;
}

pub(crate) type Endpoint = Box<dyn FnOnce() -> BoxFuture<'static, CliResult<Response>> + Send>;

/// The rest of the pipeline, ending in the handler.
pub struct Next<'a> {
    chain: &'a [Arc<dyn Behavior>],
    ctx: &'a BehaviorContext,
    endpoint: Endpoint,
}

impl<'a> Next<'a> {
    /// Run the remaining behaviors and the handler.
    pub async fn run(self) -> CliResult<Response> {
        match self.chain.split_first() {
            Some((behavior, rest)) => {
                let next = Next {
                    chain: rest,
                    ctx: self.ctx,
                    endpoint: self.endpoint,
                };
                behavior.handle(self.ctx, next).await
            }
            None => (self.endpoint)().await,
        }
    }
}

// ============================================================================
// Registration
// ============================================================================

/// A registered behavior and its optional capability filter.
#[derive(Clone)]
pub(crate) struct BehaviorEntry {
    behavior: Arc<dyn Behavior>,
    filter: Option<CapabilityId>,
}

impl BehaviorEntry {
    pub(crate) fn new(behavior: Arc<dyn Behavior>, filter: Option<CapabilityId>) -> Self {
        Self { behavior, filter }
    }
}

/// Behaviors that apply to `route`, in registration order.
pub(crate) fn pipeline_for(entries: &[BehaviorEntry], route: &RouteDefinition) -> Vec<Arc<dyn Behavior>> {
    entries
        .iter()
        .filter(|entry| entry.filter.map_or(true, |capability| route.has_capability(capability)))
        .map(|entry| Arc::clone(&entry.behavior))
        .collect()
}

/// Run `chain` around `endpoint`.
pub(crate) async fn run(
    chain: &[Arc<dyn Behavior>],
    ctx: &BehaviorContext,
    endpoint: Endpoint,
) -> CliResult<Response> {
    Next {
        chain,
        ctx,
        endpoint,
    }
    .run()
    .await
}

// ============================================================================
// Built-in behaviors
// ============================================================================

/// Logs every dispatch inside a `command` span with its outcome and timing.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingBehavior;

#[async_trait::async_trait]
impl Behavior for TracingBehavior {
    async fn handle(&self, ctx: &BehaviorContext, next: Next<'_>) -> CliResult<Response> {
        let route = ctx.route().to_string();
        let span = tracing::info_span!("command", route = %route);
        let started = Instant::now();

        let result = next.run().instrument(span).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(response) => {
                tracing::info!(route = %route, exit_code = response.exit_code, elapsed_ms, "Command completed")
            }
            Err(e) => {
                tracing::warn!(route = %route, exit_code = e.exit_code(), error = %e, elapsed_ms, "Command failed")
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CliError;
    use std::sync::Mutex;

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait::async_trait]
    impl Behavior for Recorder {
        async fn handle(&self, _ctx: &BehaviorContext, next: Next<'_>) -> CliResult<Response> {
            self.log.lock().unwrap().push(format!("{} before", self.name));
            let result = next.run().await;
            self.log.lock().unwrap().push(format!("{} after", self.name));
            result
        }
    }

    struct Deny;

    #[async_trait::async_trait]
    impl Behavior for Deny {
        async fn handle(&self, _ctx: &BehaviorContext, _next: Next<'_>) -> CliResult<Response> {
            Err(CliError::user("denied"))
        }
    }

    struct Audited;
    impl Capability for Audited {}

    fn context(route: RouteDefinition) -> BehaviorContext {
        BehaviorContext::new(Arc::new(route), Vec::new(), Params::new(), Arc::new(Services::new()))
    }

    fn endpoint(log: Arc<Mutex<Vec<String>>>) -> Endpoint {
        Box::new(move || {
            Box::pin(async move {
                log.lock().unwrap().push("handler".to_string());
                Ok(Response::text("done"))
            })
        })
    }

    #[tokio::test]
    async fn test_registration_order_is_outermost_first() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain: Vec<Arc<dyn Behavior>> = vec![
            Arc::new(Recorder { name: "outer", log: Arc::clone(&log) }),
            Arc::new(Recorder { name: "inner", log: Arc::clone(&log) }),
        ];
        let ctx = context(RouteDefinition::parse("status").unwrap());

        let response = run(&chain, &ctx, endpoint(Arc::clone(&log))).await.unwrap();

        assert_eq!(response.output.to_string(), "done");
        assert_eq!(
            *log.lock().unwrap(),
            vec!["outer before", "inner before", "handler", "inner after", "outer after"]
        );
    }

    #[tokio::test]
    async fn test_short_circuit_skips_handler() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain: Vec<Arc<dyn Behavior>> = vec![
            Arc::new(Recorder { name: "outer", log: Arc::clone(&log) }),
            Arc::new(Deny),
        ];
        let ctx = context(RouteDefinition::parse("status").unwrap());

        let result = run(&chain, &ctx, endpoint(Arc::clone(&log))).await;

        assert!(result.is_err());
        assert_eq!(*log.lock().unwrap(), vec!["outer before", "outer after"]);
    }

    #[test]
    fn test_capability_filter() {
        let entries = vec![
            BehaviorEntry::new(Arc::new(TracingBehavior), None),
            BehaviorEntry::new(Arc::new(Deny), Some(CapabilityId::of::<Audited>())),
        ];

        let plain = RouteDefinition::parse("status").unwrap();
        assert_eq!(pipeline_for(&entries, &plain).len(), 1);

        let audited = RouteDefinition::parse("purge")
            .unwrap()
            .with_capabilities(vec![CapabilityId::of::<Audited>()]);
        assert_eq!(pipeline_for(&entries, &audited).len(), 2);
        assert!(context(audited).has_capability::<Audited>());
    }

    #[tokio::test]
    async fn test_tracing_behavior_passes_result_through() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain: Vec<Arc<dyn Behavior>> = vec![Arc::new(TracingBehavior)];
        let ctx = context(RouteDefinition::parse("status").unwrap());

        let response = run(&chain, &ctx, endpoint(log)).await.unwrap();
        assert_eq!(response.exit_code, 0);
    }
}
