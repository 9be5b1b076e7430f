//! Codec trait and the JSON implementation used on the wire.
//!
//! Clients speak JSON text frames shaped `{"type": ..., "payload": ...}`.
//! The engine never touches raw bytes: the connection handler decodes an
//! inbound frame into a [`ClientMessage`](crate::ClientMessage) once, and
//! encodes every outbound [`ServerEvent`](crate::ServerEvent) right before
//! it is written to the socket.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Converts protocol types to frame bytes and back.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into frame bytes.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if the value cannot be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes frame bytes into a value.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] for malformed or mistyped input.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// JSON codec backed by `serde_json`.
///
/// # Example
///
/// ```rust
/// use inkround_protocol::{ClientMessage, Codec, JsonCodec};
///
/// let codec = JsonCodec;
/// let msg: ClientMessage = codec
///     .decode(br#"{"type":"CHAT","payload":{"text":"apple"}}"#)
///     .unwrap();
/// assert_eq!(msg, ClientMessage::Chat { text: "apple".into() });
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClientMessage, ServerEvent};

    #[test]
    fn test_decode_client_message_from_text_frame() {
        let msg: ClientMessage = JsonCodec
            .decode(br#"{"type":"TOGGLE_READY","payload":{"is_ready":true}}"#)
            .unwrap();
        assert_eq!(msg, ClientMessage::ToggleReady { is_ready: true });
    }

    #[test]
    fn test_decode_garbage_returns_decode_error() {
        let result: Result<ClientMessage, _> = JsonCodec.decode(b"not json at all");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_encode_server_event_uses_type_and_payload() {
        let bytes = JsonCodec
            .encode(&ServerEvent::Error {
                message: "Room not found".into(),
            })
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["type"], "ERROR");
        assert_eq!(json["payload"]["message"], "Room not found");
    }
}
