use std::collections::HashMap;
use std::fmt;

use super::path::{is_parametrized, match_params};
use super::Handler;
use crate::types::HandlerKind;

/// One screen: a path pattern and its (already wrapped) handlers.
#[derive(Clone)]
pub(crate) struct Route {
    pub(crate) pattern: String,
    pub(crate) display: Option<Handler>,
    pub(crate) input: Option<Handler>,
}

impl Route {
    fn new(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            display: None,
            input: None,
        }
    }

    fn handler(&self, kind: HandlerKind) -> Option<&Handler> {
        match kind {
            HandlerKind::Display => self.display.as_ref(),
            HandlerKind::Input => self.input.as_ref(),
        }
    }

    fn set(&mut self, kind: HandlerKind, handler: Handler) {
        match kind {
            HandlerKind::Display => self.display = Some(handler),
            HandlerKind::Input => self.input = Some(handler),
        }
    }
}

/// Result of a successful lookup.
#[derive(Clone)]
pub struct ResolvedRoute {
    pub handler: Handler,
    /// The pattern that matched
    pub pattern: String,
    /// Values bound by parameter segments; empty for literal routes
    pub params: HashMap<String, String>,
}

impl fmt::Debug for ResolvedRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedRoute")
            .field("pattern", &self.pattern)
            .field("params", &self.params)
            .finish()
    }
}

/// Immutable screen registry built once by [`super::Router::build`].
///
/// Literal patterns are looked up by exact string first. On a miss the
/// parametrized patterns are scanned in registration order and the first
/// match wins.
#[derive(Clone)]
pub struct RouteTable {
    start: String,
    exact: HashMap<String, Route>,
    param: Vec<Route>,
}

impl RouteTable {
    pub(crate) fn new(start: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            exact: HashMap::new(),
            param: Vec::new(),
        }
    }

    /// Add or replace the handler of `kind` for `pattern`. Replacing keeps a
    /// parametrized pattern at its first scan position.
    pub(crate) fn insert(&mut self, pattern: &str, kind: HandlerKind, handler: Handler) {
        if is_parametrized(pattern) {
            match self.param.iter_mut().find(|route| route.pattern == pattern) {
                Some(route) => route.set(kind, handler),
                None => {
                    let mut route = Route::new(pattern);
                    route.set(kind, handler);
                    self.param.push(route);
                }
            }
        } else {
            self.exact
                .entry(pattern.to_string())
                .or_insert_with(|| Route::new(pattern))
                .set(kind, handler);
        }
    }

    /// Path of the screen every fresh session starts on.
    pub fn start_path(&self) -> &str {
        &self.start
    }

    /// Find the handler of `kind` for `path`.
    ///
    /// The first matching pattern decides: if it lacks a handler of `kind`
    /// the lookup is a miss, later patterns are not consulted.
    pub fn resolve(&self, path: &str, kind: HandlerKind) -> Option<ResolvedRoute> {
        if let Some(route) = self.exact.get(path) {
            return route.handler(kind).map(|handler| ResolvedRoute {
                handler: handler.clone(),
                pattern: route.pattern.clone(),
                params: HashMap::new(),
            });
        }

        let (route, params) = self
            .param
            .iter()
            .find_map(|route| match_params(&route.pattern, path).map(|params| (route, params)))?;
        route.handler(kind).map(|handler| ResolvedRoute {
            handler: handler.clone(),
            pattern: route.pattern.clone(),
            params,
        })
    }

    /// Number of distinct patterns registered.
    pub fn len(&self) -> usize {
        self.exact.len() + self.param.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All registered patterns: literals sorted, then parametrized in scan order.
    pub fn patterns(&self) -> Vec<&str> {
        let mut literals: Vec<&str> = self.exact.keys().map(String::as_str).collect();
        literals.sort_unstable();
        literals
            .into_iter()
            .chain(self.param.iter().map(|route| route.pattern.as_str()))
            .collect()
    }
}

impl fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteTable")
            .field("start", &self.start)
            .field("patterns", &self.patterns())
            .finish()
    }
}
