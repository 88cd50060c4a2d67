//! Handlers and extractors.
//!
//! A handler is any async function whose arguments implement
//! [`FromInvocation`] and whose output implements [`IntoResponse`]:
//!
//! ```
//! use ruta::{Args, CliResult, FromParams, Inject, Matched, Params, State};
//! use std::sync::Arc;
//!
//! struct AppState;
//! struct Clock;
//!
//! struct Greet {
//!     name: String,
//! }
//!
//! impl FromParams for Greet {
//!     fn from_params(params: &Params) -> CliResult<Self> {
//!         Ok(Self { name: params.require("name")? })
//!     }
//! }
//!
//! async fn greet(
//!     _state: State<AppState>,
//!     Args(greet): Args<Greet>,
//!     Inject(_clock): Inject<Clock>,
//!     matched: Matched,
//! ) -> CliResult<String> {
//!     Ok(format!("hello {} via '{}'", greet.name, matched.route().pattern()))
//! }
//! ```

use crate::behavior::BehaviorContext;
use crate::binding::FromParams;
use crate::response::{IntoResponse, Response};
use crate::route::{CapabilityId, RouteDefinition};
use crate::{CliResult, State};
use futures::future::BoxFuture;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

// ============================================================================
// Invocation
// ============================================================================

/// Everything a handler can extract from: shared state plus the matched
/// route's context.
pub struct Invocation<S> {
    state: State<S>,
    context: Arc<BehaviorContext>,
}

impl<S> Invocation<S> {
    pub(crate) fn new(state: State<S>, context: Arc<BehaviorContext>) -> Self {
        Self { state, context }
    }

    pub fn state(&self) -> &State<S> {
        &self.state
    }

    pub fn context(&self) -> &BehaviorContext {
        &self.context
    }
}

/// Types that can be built from an [`Invocation`] to become handler arguments.
pub trait FromInvocation<S>: Sized {
    fn from_invocation(invocation: &Invocation<S>) -> CliResult<Self>;
}

impl<S> FromInvocation<S> for State<S> {
    fn from_invocation(invocation: &Invocation<S>) -> CliResult<Self> {
        Ok(invocation.state.clone())
    }
}

impl<S> FromInvocation<S> for crate::Params {
    fn from_invocation(invocation: &Invocation<S>) -> CliResult<Self> {
        Ok(invocation.context.params().clone())
    }
}

/// Typed arguments built through [`FromParams`].
#[derive(Debug, Clone)]
pub struct Args<T>(pub T);

impl<S, T: FromParams> FromInvocation<S> for Args<T> {
    fn from_invocation(invocation: &Invocation<S>) -> CliResult<Self> {
        T::from_params(invocation.context.params()).map(Args)
    }
}

/// A service resolved from [`Services`](crate::Services).
pub struct Inject<T>(pub Arc<T>);

impl<S, T: Send + Sync + 'static> FromInvocation<S> for Inject<T> {
    fn from_invocation(invocation: &Invocation<S>) -> CliResult<Self> {
        invocation.context.services().resolve::<T>().map(Inject)
    }
}

/// The selected route and the tokens it matched.
#[derive(Debug, Clone)]
pub struct Matched {
    route: Arc<RouteDefinition>,
    tokens: Vec<String>,
}

impl Matched {
    pub fn route(&self) -> &RouteDefinition {
        &self.route
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

impl<S> FromInvocation<S> for Matched {
    fn from_invocation(invocation: &Invocation<S>) -> CliResult<Self> {
        Ok(Matched {
            route: Arc::clone(invocation.context.route_arc()),
            tokens: invocation.context.tokens().to_vec(),
        })
    }
}

// ============================================================================
// Typed commands
// ============================================================================

/// A typed command: an argument struct that declares capabilities.
///
/// Registered with [`Router::command`](crate::Router::command), its
/// capabilities are attached to the route so capability-filtered behaviors
/// can select it.
///
/// ```
/// use ruta::{Capability, CapabilityId, CliResult, Command, FromParams, Params};
///
/// struct Destructive;
/// impl Capability for Destructive {}
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
/// impl Command for Purge {
///     fn capabilities() -> Vec<CapabilityId> {
///         vec![CapabilityId::of::<Destructive>()]
///     }
/// }
/// ```
pub trait Command: FromParams + Send + 'static {
    fn capabilities() -> Vec<CapabilityId> {
        Vec::new()
    }
}

// ============================================================================
// Handler
// ============================================================================

/// An async function usable as a route handler.
///
/// Implemented for `async fn`s (and closures returning futures) taking up to
/// six [`FromInvocation`] arguments and returning an [`IntoResponse`] value.
pub trait Handler<T, S>: Clone + Send + Sync + 'static {
    type Future: Future<Output = CliResult<Response>> + Send + 'static;

    fn call(self, invocation: Invocation<S>) -> Self::Future;
}

macro_rules! impl_handler {
    ($($ty:ident),*) => {
        #[allow(non_snake_case, unused_variables)]
        impl<F, Fut, R, S, $($ty,)*> Handler<($($ty,)*), S> for F
        where
            F: FnOnce($($ty,)*) -> Fut + Clone + Send + Sync + 'static,
            Fut: Future<Output = R> + Send + 'static,
            R: IntoResponse,
            S: Send + Sync + 'static,
            $($ty: FromInvocation<S> + Send + 'static,)*
        {
            type Future = BoxFuture<'static, CliResult<Response>>;

            fn call(self, invocation: Invocation<S>) -> Self::Future {
                Box::pin(async move {
                    $(let $ty = $ty::from_invocation(&invocation)?;)*
                    self($($ty,)*).await.into_result()
                })
            }
        }
    };
}

impl_handler!();
impl_handler!(T1);
impl_handler!(T1, T2);
impl_handler!(T1, T2, T3);
impl_handler!(T1, T2, T3, T4);
impl_handler!(T1, T2, T3, T4, T5);
impl_handler!(T1, T2, T3, T4, T5, T6);

// ============================================================================
// Type erasure
// ============================================================================

/// A handler with its extractor types erased, stored by the router.
pub(crate) trait ErasedHandler<S>: Send + Sync {
    fn call(&self, state: State<S>, context: Arc<BehaviorContext>) -> BoxFuture<'static, CliResult<Response>>;
}

pub(crate) struct HandlerFn<H, T> {
    handler: H,
    _marker: PhantomData<fn() -> T>,
}

impl<H, T> HandlerFn<H, T> {
    pub(crate) fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

impl<H, T, S> ErasedHandler<S> for HandlerFn<H, T>
where
    H: Handler<T, S>,
    S: Send + Sync + 'static,
    T: 'static,
{
    fn call(&self, state: State<S>, context: Arc<BehaviorContext>) -> BoxFuture<'static, CliResult<Response>> {
        Box::pin(self.handler.clone().call(Invocation::new(state, context)))
    }
}

/// Binds a handler written against `State<S>` to a concrete state, turning it
/// into a stateless handler.
pub(crate) struct WithState<S> {
    inner: Arc<dyn ErasedHandler<S>>,
    state: State<S>,
}

impl<S> WithState<S> {
    pub(crate) fn new(inner: Arc<dyn ErasedHandler<S>>, state: State<S>) -> Self {
        Self { inner, state }
    }
}

impl<S: Send + Sync + 'static> ErasedHandler<()> for WithState<S> {
    fn call(&self, _state: State<()>, context: Arc<BehaviorContext>) -> BoxFuture<'static, CliResult<Response>> {
        self.inner.call(self.state.clone(), context)
    }
}
