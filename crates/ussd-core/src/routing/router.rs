//! Route registration surface

use tracing::debug;

use super::path::{clean_prefix, join};
use super::table::RouteTable;
use super::{handler, Handler};
use crate::engine::Context;
use crate::interceptors::{wrap, Interceptor, SharedInterceptor};
use crate::types::{HandlerKind, Reply};

struct Registration {
    pattern: String,
    kind: HandlerKind,
    handler: Handler,
    /// Group then route interceptors, outermost first
    scoped: Vec<SharedInterceptor>,
}

/// Collects screens and interceptors at startup.
///
/// Nothing is composed until [`Router::build`]: every route is then wrapped
/// as `global ++ group ++ route`, first-registered outermost, so global
/// interceptors apply to all routes whenever they were added.
///
/// ```ignore
/// let mut router = Router::new("/home");
/// router.intercept(Recover::new());
/// router.display("/home", |_ctx| Reply::con("1) Balance"));
/// router.input("/home", |ctx| {
///     if ctx.input() == "1" {
///         ctx.redirect("/balance");
///     }
///     Reply::con("")
/// });
/// let table = router.build();
/// ```
pub struct Router {
    start: String,
    global: Vec<SharedInterceptor>,
    registrations: Vec<Registration>,
}

impl Router {
    /// New router whose fresh sessions enter `start`.
    pub fn new(start: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            global: Vec::new(),
            registrations: Vec::new(),
        }
    }

    /// Add a global interceptor. Earlier calls wrap later ones.
    pub fn intercept<I>(&mut self, interceptor: I) -> &mut Self
    where
        I: Interceptor + 'static,
    {
        self.global.push(std::sync::Arc::new(interceptor));
        self
    }

    /// Add several global interceptors in order.
    pub fn intercept_all(&mut self, interceptors: impl IntoIterator<Item = SharedInterceptor>) -> &mut Self {
        self.global.extend(interceptors);
        self
    }

    /// Register the display handler for `path`.
    pub fn display<F>(&mut self, path: &str, f: F) -> &mut Self
    where
        F: Fn(&mut Context) -> Reply + Send + Sync + 'static,
    {
        self.register(path.trim(), HandlerKind::Display, handler(f), Vec::new());
        self
    }

    /// Register the input handler for `path`.
    pub fn input<F>(&mut self, path: &str, f: F) -> &mut Self
    where
        F: Fn(&mut Context) -> Reply + Send + Sync + 'static,
    {
        self.register(path.trim(), HandlerKind::Input, handler(f), Vec::new());
        self
    }

    /// Register a display handler with route-specific interceptors.
    pub fn display_with<F>(&mut self, path: &str, f: F, interceptors: Vec<SharedInterceptor>) -> &mut Self
    where
        F: Fn(&mut Context) -> Reply + Send + Sync + 'static,
    {
        self.register(path.trim(), HandlerKind::Display, handler(f), interceptors);
        self
    }

    /// Register an input handler with route-specific interceptors.
    pub fn input_with<F>(&mut self, path: &str, f: F, interceptors: Vec<SharedInterceptor>) -> &mut Self
    where
        F: Fn(&mut Context) -> Reply + Send + Sync + 'static,
    {
        self.register(path.trim(), HandlerKind::Input, handler(f), interceptors);
        self
    }

    /// Register an already-built handler of either kind.
    pub fn route(&mut self, path: &str, kind: HandlerKind, handler: Handler) -> &mut Self {
        self.register(path.trim(), kind, handler, Vec::new());
        self
    }

    /// Open a group of screens under `prefix` sharing `interceptors`.
    pub fn group(&mut self, prefix: &str, interceptors: Vec<SharedInterceptor>) -> Group<'_> {
        Group {
            router: self,
            prefix: clean_prefix(prefix),
            interceptors,
        }
    }

    fn register(&mut self, pattern: &str, kind: HandlerKind, handler: Handler, scoped: Vec<SharedInterceptor>) {
        self.registrations.push(Registration {
            pattern: pattern.to_string(),
            kind,
            handler,
            scoped,
        });
    }

    /// Compose every handler with its interceptor chain and freeze the table.
    pub fn build(self) -> RouteTable {
        let Router {
            start,
            global,
            registrations,
        } = self;

        let mut table = RouteTable::new(start);
        for registration in registrations {
            let chain: Vec<SharedInterceptor> = global
                .iter()
                .cloned()
                .chain(registration.scoped)
                .collect();
            debug!(
                pattern = %registration.pattern,
                kind = %registration.kind,
                interceptors = chain.len(),
                "Registering screen handler"
            );
            table.insert(&registration.pattern, registration.kind, wrap(registration.handler, &chain));
        }
        table
    }
}

/// Screens registered under a shared prefix with shared interceptors.
///
/// Groups nest: a subgroup's prefix is appended to its parent's and its
/// interceptors run inside the parent's.
pub struct Group<'r> {
    router: &'r mut Router,
    prefix: String,
    interceptors: Vec<SharedInterceptor>,
}

impl<'r> Group<'r> {
    /// The full prefix of this group, e.g. `/wallet/transfer`.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Open a nested group.
    pub fn group(&mut self, prefix: &str, interceptors: Vec<SharedInterceptor>) -> Group<'_> {
        let mut inherited = self.interceptors.clone();
        inherited.extend(interceptors);
        Group {
            prefix: join(&self.prefix, prefix),
            router: &mut *self.router,
            interceptors: inherited,
        }
    }

    pub fn display<F>(&mut self, path: &str, f: F) -> &mut Self
    where
        F: Fn(&mut Context) -> Reply + Send + Sync + 'static,
    {
        self.display_with(path, f, Vec::new())
    }

    pub fn input<F>(&mut self, path: &str, f: F) -> &mut Self
    where
        F: Fn(&mut Context) -> Reply + Send + Sync + 'static,
    {
        self.input_with(path, f, Vec::new())
    }

    pub fn display_with<F>(&mut self, path: &str, f: F, interceptors: Vec<SharedInterceptor>) -> &mut Self
    where
        F: Fn(&mut Context) -> Reply + Send + Sync + 'static,
    {
        self.add(path, HandlerKind::Display, handler(f), interceptors);
        self
    }

    pub fn input_with<F>(&mut self, path: &str, f: F, interceptors: Vec<SharedInterceptor>) -> &mut Self
    where
        F: Fn(&mut Context) -> Reply + Send + Sync + 'static,
    {
        self.add(path, HandlerKind::Input, handler(f), interceptors);
        self
    }

    fn add(&mut self, path: &str, kind: HandlerKind, handler: Handler, route: Vec<SharedInterceptor>) {
        let pattern = join(&self.prefix, path);
        let mut scoped = self.interceptors.clone();
        scoped.extend(route);
        self.router.register(&pattern, kind, handler, scoped);
    }
}
