//! Final serialization of a response document for transport

use base64::{engine::general_purpose::STANDARD, Engine};

/// Turns a finished response document into the string a client would
/// actually post. The factory is generic over this so tests can capture
/// what went over the wire or substitute a deliberately broken encoding.
pub trait ResponseEncoder: Send + Sync {
    fn encode(&self, xml: &str) -> String;
}

/// Standard base64 encoding, the form the POST binding carries
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64Encoder;

impl ResponseEncoder for Base64Encoder {
    fn encode(&self, xml: &str) -> String {
        STANDARD.encode(xml.as_bytes())
    }
}
