//! Interceptor chain
//!
//! An interceptor turns one [`Handler`] into another with the same
//! signature. It may short-circuit with its own reply, observe the call on
//! the way in and out, or contain a fault raised by the inner handler.
//!
//! Chains are plain ordered lists composed by [`wrap`]: given `[A, B]` and a
//! handler `H` the result behaves as `A(B(H))`.

pub mod recover;
pub mod logging;
pub mod auth;
pub mod rate_limit;

use std::sync::Arc;

use crate::routing::Handler;

pub use auth::HmacAuth;
pub use logging::Logging;
pub use rate_limit::RateLimit;
pub use recover::Recover;

/// Wraps a handler with cross-cutting behavior.
pub trait Interceptor: Send + Sync {
    fn wrap(&self, next: Handler) -> Handler;
}

impl<F> Interceptor for F
where
    F: Fn(Handler) -> Handler + Send + Sync,
{
    fn wrap(&self, next: Handler) -> Handler {
        self(next)
    }
}

/// An interceptor shared between every chain it appears in.
pub type SharedInterceptor = Arc<dyn Interceptor>;

/// Share an interceptor so it can be listed in group or route chains.
pub fn shared<I>(interceptor: I) -> SharedInterceptor
where
    I: Interceptor + 'static,
{
    Arc::new(interceptor)
}

/// Compose `interceptors` around `handler`, index 0 outermost.
pub fn wrap(handler: Handler, interceptors: &[SharedInterceptor]) -> Handler {
    interceptors
        .iter()
        .rev()
        .fold(handler, |inner, interceptor| interceptor.wrap(inner))
}
