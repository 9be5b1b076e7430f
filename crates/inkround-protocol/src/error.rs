//! Error types for the protocol layer.
//!
//! Each crate in Inkround defines its own error enum, so a
//! `ProtocolError` always means the problem is in framing or
//! (de)serialization, never in networking or game rules.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, missing required fields,
    /// or wrong data types.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame parsed as JSON but violates protocol rules, e.g. an
    /// unknown message `type`.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
