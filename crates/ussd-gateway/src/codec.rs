//! `CON`/`END` wire encoding shared by every aggregator

use rvoip_ussd_core::Reply;

pub const CONTINUE_PREFIX: &str = "CON ";
pub const END_PREFIX: &str = "END ";

/// Render a reply as aggregators expect it on the wire.
pub fn encode(reply: &Reply) -> String {
    let prefix = if reply.continue_session {
        CONTINUE_PREFIX
    } else {
        END_PREFIX
    };
    format!("{}{}", prefix, reply.message)
}

/// Parse an encoded reply; `None` when neither prefix is present.
pub fn decode(wire: &str) -> Option<Reply> {
    if let Some(message) = wire.strip_prefix(CONTINUE_PREFIX) {
        Some(Reply::con(message))
    } else {
        wire.strip_prefix(END_PREFIX).map(Reply::end)
    }
}
