use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

use super::Interceptor;
use crate::routing::{handler, Handler};
use crate::types::{Reply, Request};

type HmacSha256 = Hmac<Sha256>;

/// Metadata key transports use to forward the request signature.
pub const SIGNATURE_META_KEY: &str = "sig";

/// Rejects requests whose HMAC-SHA256 signature does not verify.
///
/// The signature covers `session_id + msisdn + text` and is expected
/// hex-encoded in the request metadata.
#[derive(Clone)]
pub struct HmacAuth {
    secret: Vec<u8>,
    meta_key: String,
}

impl HmacAuth {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
            meta_key: SIGNATURE_META_KEY.to_string(),
        }
    }

    /// Read the signature from a different metadata key.
    pub fn with_meta_key(mut self, key: impl Into<String>) -> Self {
        self.meta_key = key.into();
        self
    }

    fn mac(&self, request: &Request) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
        mac.update(request.session_id.as_bytes());
        mac.update(request.msisdn.as_bytes());
        mac.update(request.text.as_bytes());
        mac
    }

    /// Hex signature a trusted aggregator would attach to `request`.
    pub fn sign(&self, request: &Request) -> String {
        hex::encode(self.mac(request).finalize().into_bytes())
    }

    /// Constant-time check of the signature carried by `request`.
    pub fn verify(&self, request: &Request) -> bool {
        let Some(signature) = request.meta(&self.meta_key) else {
            return false;
        };
        let Ok(signature) = hex::decode(signature) else {
            return false;
        };
        self.mac(request).verify_slice(&signature).is_ok()
    }
}

impl std::fmt::Debug for HmacAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacAuth")
            .field("meta_key", &self.meta_key)
            .finish_non_exhaustive()
    }
}

impl Interceptor for HmacAuth {
    fn wrap(&self, next: Handler) -> Handler {
        let auth = self.clone();
        handler(move |ctx| {
            if !auth.verify(ctx.request()) {
                warn!(
                    session_id = %ctx.session().id(),
                    msisdn = %ctx.request().msisdn,
                    "Rejected request with invalid signature"
                );
                return Reply::end("Unauthorized.");
            }
            next(ctx)
        })
    }
}
