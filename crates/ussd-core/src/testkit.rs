//! Scripted handset for driving an [`Engine`] in tests
//!
//! The simulator behaves like a network aggregator: the first call carries
//! no text and every later call carries the whole `*`-joined history.
//!
//! ```ignore
//! let mut sim = Simulator::new(&engine);
//! sim.start("258840000000").await.expect("Welcome");
//! sim.send("1").await.expect("Balance");
//! sim.send("00").await.expect_end("Bye");
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use crate::engine::Engine;
use crate::types::{Reply, Request, INPUT_DELIMITER};

static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

pub struct Simulator<'e> {
    engine: &'e Engine,
    session_id: String,
    msisdn: String,
    service_code: Option<String>,
    text: String,
    last: Option<Reply>,
}

impl<'e> Simulator<'e> {
    pub fn new(engine: &'e Engine) -> Self {
        Self {
            engine,
            session_id: String::new(),
            msisdn: String::new(),
            service_code: None,
            text: String::new(),
            last: None,
        }
    }

    /// Use a fixed session id instead of a generated one.
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn with_service_code(mut self, code: impl Into<String>) -> Self {
        self.service_code = Some(code.into());
        self
    }

    /// Dial in: an empty first call for a new session.
    pub async fn start(&mut self, msisdn: &str) -> &mut Self {
        if self.session_id.is_empty() {
            let n = NEXT_SESSION.fetch_add(1, Ordering::Relaxed);
            self.session_id = format!("sim-{}", n);
        }
        self.msisdn = msisdn.to_string();
        self.text.clear();
        self.call().await
    }

    /// Type `token` and submit; it is appended to the accumulated text.
    pub async fn send(&mut self, token: &str) -> &mut Self {
        if !self.text.is_empty() {
            self.text.push(INPUT_DELIMITER);
        }
        self.text.push_str(token);
        self.call().await
    }

    /// Resubmit the accumulated text unchanged but with a trailing
    /// delimiter, as some handsets do on an empty answer.
    pub async fn send_empty(&mut self) -> &mut Self {
        self.text.push(INPUT_DELIMITER);
        self.call().await
    }

    async fn call(&mut self) -> &mut Self {
        let mut request = Request::new(self.session_id.clone(), self.msisdn.clone(), self.text.clone());
        request.service_code = self.service_code.clone();
        let reply = match self.engine.handle(request).await {
            Ok(reply) => reply,
            Err(e) => panic!("engine rejected simulated call: {}", e),
        };
        self.last = Some(reply);
        self
    }

    /// Assert the session is still open and the screen contains `substr`.
    #[track_caller]
    pub fn expect(&mut self, substr: &str) -> &mut Self {
        let reply = self.last();
        assert!(
            reply.continue_session,
            "expected CON containing {:?}, got END {:?}",
            substr, reply.message
        );
        assert!(
            reply.message.contains(substr),
            "expected {:?} in {:?}",
            substr, reply.message
        );
        self
    }

    /// Assert the session ended with a message containing `substr`.
    #[track_caller]
    pub fn expect_end(&mut self, substr: &str) -> &mut Self {
        let reply = self.last();
        assert!(
            !reply.continue_session,
            "expected END containing {:?}, got CON {:?}",
            substr, reply.message
        );
        assert!(
            reply.message.contains(substr),
            "expected end message to contain {:?}, got {:?}",
            substr, reply.message
        );
        self
    }

    #[track_caller]
    pub fn last(&self) -> &Reply {
        match &self.last {
            Some(reply) => reply,
            None => panic!("no call has been made yet"),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}
