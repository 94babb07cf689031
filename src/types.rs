//! Basic type definitions for the broadcast hub
//!
//! - `ClientId`: UUID-based client identity used as the membership key
//! - `InboundMessage`: a message read from one client, on its way to the Room

use uuid::Uuid;

/// Unique client identifier (newtype pattern)
///
/// Wraps a UUID v4. Used only as the membership key and in logs,
/// never for addressing a client from outside the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub Uuid);

impl ClientId {
    /// Create a new random client ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Text read from a client, paired with the client it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub from: ClientId,
    pub text: String,
}

impl InboundMessage {
    pub fn new(from: ClientId, text: impl Into<String>) -> Self {
        Self {
            from,
            text: text.into(),
        }
    }
}
