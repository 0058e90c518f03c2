//! Form-encoded aggregators (Africa's Talking, Infobip and lookalikes)

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::extract::rejection::FormRejection;
use axum::extract::{ConnectInfo, Form, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::debug;

use rvoip_ussd_core::Request;

use super::{peer_ip, tag, AdapterState};
use crate::codec::encode;

/// Field names read from the form, tried in order; the first non-empty
/// value wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormFields {
    pub session_id: Vec<String>,
    pub msisdn: Vec<String>,
    pub service_code: Vec<String>,
    pub text: Vec<String>,
}

fn keys(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

impl FormFields {
    fn exact(session_id: &str, msisdn: &str, service_code: &str, text: &str) -> Self {
        Self {
            session_id: keys(&[session_id]),
            msisdn: keys(&[msisdn]),
            service_code: keys(&[service_code]),
            text: keys(&[text]),
        }
    }
}

/// Adapter for aggregators posting `application/x-www-form-urlencoded`
/// bodies (or query strings on GET) and expecting a plain-text
/// `CON ...`/`END ...` body back.
#[derive(Debug, Clone)]
pub struct FormAdapter {
    vendor: String,
    fields: FormFields,
}

impl FormAdapter {
    /// Tolerates the key spellings seen across aggregators.
    pub fn generic() -> Self {
        Self {
            vendor: "generic".to_string(),
            fields: FormFields {
                session_id: keys(&["sessionId", "sessionid", "session_id", "sid"]),
                msisdn: keys(&["phoneNumber", "msisdn", "phone", "from"]),
                service_code: keys(&["serviceCode", "code", "service", "shortcode"]),
                text: keys(&["text", "message", "input"]),
            },
        }
    }

    pub fn africastalking() -> Self {
        Self {
            vendor: "africastalking".to_string(),
            fields: FormFields::exact("sessionId", "phoneNumber", "serviceCode", "text"),
        }
    }

    pub fn infobip() -> Self {
        Self {
            vendor: "infobip".to_string(),
            fields: FormFields::exact("SESSION_ID", "MSISDN", "SERVICE_CODE", "INPUT"),
        }
    }

    /// Replace field names; an empty name keeps the current one.
    pub fn with_fields(mut self, session_id: &str, msisdn: &str, text: &str) -> Self {
        for (slot, name) in [
            (&mut self.fields.session_id, session_id),
            (&mut self.fields.msisdn, msisdn),
            (&mut self.fields.text, text),
        ] {
            if !name.is_empty() {
                *slot = keys(&[name]);
            }
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

    pub fn fields(&self) -> &FormFields {
        &self.fields
    }

    /// Build the engine request from decoded form values.
    pub fn to_request(&self, form: &HashMap<String, String>, ip: String) -> Request {
        let pick = |names: &[String]| -> String {
            names
                .iter()
                .filter_map(|name| form.get(name))
                .find(|value| !value.is_empty())
                .cloned()
                .unwrap_or_default()
        };

        let mut request = Request::new(
            pick(&self.fields.session_id),
            pick(&self.fields.msisdn).trim(),
            pick(&self.fields.text).trim(),
        );
        let service_code = pick(&self.fields.service_code);
        if !service_code.trim().is_empty() {
            request = request.with_service_code(service_code.trim());
        }
        tag(request, &self.vendor, ip)
    }
}

pub(crate) async fn handle(
    State(state): State<AdapterState<FormAdapter>>,
    connect: Option<ConnectInfo<SocketAddr>>,
    form: Result<Form<HashMap<String, String>>, FormRejection>,
) -> Response {
    let Form(form) = match form {
        Ok(form) => form,
        Err(rejection) => {
            debug!(vendor = %state.adapter.vendor(), error = %rejection, "Rejected malformed form");
            return (StatusCode::BAD_REQUEST, "bad form").into_response();
        }
    };

    let request = state.adapter.to_request(&form, peer_ip(connect));
    let reply = state.dispatch(request).await;
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        encode(&reply),
    )
        .into_response()
}
