use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::session::{Session, Value};
use crate::types::Request;

/// What a handler sees during one invocation.
///
/// Owns the call's private session copy; the engine takes it back once the
/// handler returns. Path parameters and the input token live only for this
/// invocation.
#[derive(Debug)]
pub struct Context {
    session: Session,
    request: Arc<Request>,
    path: String,
    input: String,
    params: HashMap<String, String>,
    redirect: Option<String>,
    cancel: CancellationToken,
}

impl Context {
    pub(crate) fn new(
        session: Session,
        request: Arc<Request>,
        path: &str,
        input: &str,
        params: HashMap<String, String>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            session,
            request,
            path: path.to_string(),
            input: input.to_string(),
            params,
            redirect: None,
            cancel,
        }
    }

    /// A context outside any engine call, with an empty session named after
    /// the request's session id. Useful for exercising handlers directly.
    pub fn detached(request: Request, path: &str) -> Self {
        let session = Session::new(request.session_id.clone());
        Self::new(
            session,
            Arc::new(request),
            path,
            "",
            HashMap::new(),
            CancellationToken::new(),
        )
    }

    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = input.into();
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// The screen path being handled.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The input token; empty for display handlers.
    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Value bound to a `:name` segment of the matched pattern.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.session.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.session.set(key, value);
    }

    /// Ask the engine to move to `path` once this input handler returns.
    /// Ignored when the reply terminates the session.
    pub fn redirect(&mut self, path: impl Into<String>) {
        self.redirect = Some(path.into());
    }

    pub fn redirect_target(&self) -> Option<&str> {
        self.redirect.as_deref()
    }

    /// Whether the caller gave up on this call.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(crate) fn into_parts(self) -> (Session, Option<String>) {
        (self.session, self.redirect)
    }
}
