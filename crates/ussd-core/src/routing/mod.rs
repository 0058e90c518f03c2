//! Screen routing
//!
//! Applications describe their dialog as screens: slash-delimited paths that
//! each carry a display handler (the prompt) and an input handler (what to
//! do with the caller's answer). [`Router`] collects those registrations at
//! startup and [`Router::build`] freezes them into a [`RouteTable`] the
//! engine resolves against on every call.

pub mod path;
pub mod table;
pub mod router;

use std::sync::Arc;

use crate::engine::Context;
use crate::types::Reply;

pub use router::{Group, Router};
pub use table::{ResolvedRoute, RouteTable};

/// A screen handler. Display and input handlers share this signature so the
/// same interceptors can wrap either.
pub type Handler = Arc<dyn Fn(&mut Context) -> Reply + Send + Sync>;

/// Box a closure as a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&mut Context) -> Reply + Send + Sync + 'static,
{
    Arc::new(f)
}
