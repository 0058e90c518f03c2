//! JSON aggregators (Vodacom and configurable shapes)

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use serde_json::{Map, Value};
use tracing::debug;

use rvoip_ussd_core::{Reply, Request};

use super::{peer_ip, tag, AdapterState};
use crate::codec::encode;

/// Keys read from the inbound JSON object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonFields {
    pub session_id: String,
    pub msisdn: String,
    pub text: String,
    pub service_code: Option<String>,
}

impl JsonFields {
    pub fn new(session_id: impl Into<String>, msisdn: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            msisdn: msisdn.into(),
            text: text.into(),
            service_code: None,
        }
    }

    pub fn with_service_code(mut self, key: impl Into<String>) -> Self {
        self.service_code = Some(key.into());
        self
    }
}

/// Shape of the outbound JSON object: the encoded reply under `text_key`,
/// plus an optional constant `wrapper_key: wrapper_value` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonReplyShape {
    pub text_key: String,
    pub wrapper: Option<(String, String)>,
}

impl JsonReplyShape {
    pub fn new(text_key: impl Into<String>) -> Self {
        Self {
            text_key: text_key.into(),
            wrapper: None,
        }
    }

    pub fn with_wrapper(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.wrapper = Some((key.into(), value.into()));
        self
    }
}

#[derive(Debug, Clone)]
pub struct JsonAdapter {
    vendor: String,
    fields: JsonFields,
    shape: JsonReplyShape,
}

impl JsonAdapter {
    /// `{"sessionId", "msisdn", "userInput"}` in,
    /// `{"type": "Response", "text": "CON ..."}` out.
    pub fn vodacom() -> Self {
        Self {
            vendor: "vodacom".to_string(),
            fields: JsonFields::new("sessionId", "msisdn", "userInput"),
            shape: JsonReplyShape::new("text").with_wrapper("type", "Response"),
        }
    }

    pub fn generic(fields: JsonFields, shape: JsonReplyShape) -> Self {
        Self {
            vendor: "generic-json".to_string(),
            fields,
            shape,
        }
    }

    /// Replace inbound keys; an empty name keeps the current one.
    pub fn with_fields(mut self, session_id: &str, msisdn: &str, text: &str) -> Self {
        for (slot, name) in [
            (&mut self.fields.session_id, session_id),
            (&mut self.fields.msisdn, msisdn),
            (&mut self.fields.text, text),
        ] {
            if !name.is_empty() {
                *slot = name.to_string();
            }
        }
        self
    }

    /// Replace outbound keys and wrapper value; empty strings keep the
    /// current ones.
    pub fn with_reply_keys(mut self, type_key: &str, text_key: &str, type_value: &str) -> Self {
        if !text_key.is_empty() {
            self.shape.text_key = text_key.to_string();
        }
        if let Some((key, value)) = self.shape.wrapper.as_mut() {
            if !type_key.is_empty() {
                *key = type_key.to_string();
            }
            if !type_value.is_empty() {
                *value = type_value.to_string();
            }
        } else if !type_key.is_empty() && !type_value.is_empty() {
            self.shape.wrapper = Some((type_key.to_string(), type_value.to_string()));
        }
        self
    }

    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = vendor.into();
        self
    }

    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    /// Build the engine request from a decoded JSON object. Missing or
    /// non-string values read as empty.
    pub fn to_request(&self, body: &Map<String, Value>, ip: String) -> Request {
        let field = |key: &str| body.get(key).and_then(Value::as_str).unwrap_or("");

        let mut request = Request::new(
            field(&self.fields.session_id),
            field(&self.fields.msisdn).trim(),
            field(&self.fields.text).trim(),
        );
        if let Some(key) = &self.fields.service_code {
            let code = field(key).trim();
            if !code.is_empty() {
                request = request.with_service_code(code);
            }
        }
        tag(request, &self.vendor, ip)
    }

    /// Render a reply in this vendor's response shape.
    pub fn render(&self, reply: &Reply) -> Value {
        let mut out = Map::new();
        if let Some((key, value)) = &self.shape.wrapper {
            out.insert(key.clone(), Value::String(value.clone()));
        }
        out.insert(self.shape.text_key.clone(), Value::String(encode(reply)));
        Value::Object(out)
    }
}

pub(crate) async fn handle(
    State(state): State<AdapterState<JsonAdapter>>,
    connect: Option<ConnectInfo<SocketAddr>>,
    body: Bytes,
) -> Response {
    let body: Map<String, Value> = match serde_json::from_slice(&body) {
        Ok(body) => body,
        Err(e) => {
            debug!(vendor = %state.adapter.vendor(), error = %e, "Rejected malformed JSON");
            return (StatusCode::BAD_REQUEST, "bad json").into_response();
        }
    };

    let request = state.adapter.to_request(&body, peer_ip(connect));
    let reply = state.dispatch(request).await;
    Json(state.adapter.render(&reply)).into_response()
}
