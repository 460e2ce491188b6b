//! Response definitions
//!
//! Responses are free-form text; nothing is assumed about their structure.

use std::fmt;

use bytes::Bytes;

/// Raw response payload as received from (or sent by) the server
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Response {
    payload: Bytes,
}

impl Response {
    /// Build a response from server-side text
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            payload: Bytes::from(message.into()),
        }
    }

    /// Wrap bytes received off the wire
    pub fn from_bytes(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.payload
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Decode the payload for display. Invalid UTF-8 is replaced, not rejected.
    pub fn to_text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}
