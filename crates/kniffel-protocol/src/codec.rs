//! Codec trait and implementations for serializing/deserializing messages.
//!
//! The gateway doesn't care HOW messages are serialized; it holds
//! something that implements [`Codec`]. [`JsonCodec`] is the only
//! implementation today because browser clients speak JSON text frames.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Converts message types to bytes and back.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `serde_json`.
///
/// ```rust
/// use kniffel_protocol::{ClientMessage, Codec, JsonCodec};
///
/// let codec = JsonCodec;
/// let bytes = br#"{"type":"start_game","room_code":"AB12"}"#;
/// let msg: ClientMessage = codec.decode(bytes).unwrap();
/// assert!(matches!(msg, ClientMessage::StartGame { .. }));
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{ClientMessage, ErrorKind, ServerMessage};

    #[test]
    fn test_decode_roll_request() {
        let codec = JsonCodec;
        let json = concat!(
            r#"{"type":"roll_dice","room_code":"ab12","#,
            r#""kept":[true,false,false,true,false]}"#,
        );
        let msg: ClientMessage = codec.decode(json.as_bytes()).unwrap();
        match msg {
            ClientMessage::RollDice { room_code, kept } => {
                assert_eq!(room_code, "ab12");
                assert_eq!(kept, vec![true, false, false, true, false]);
            }
            other => panic!("expected RollDice, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_unknown_type_fails() {
        let codec = JsonCodec;
        let result: Result<ClientMessage, _> = codec.decode(br#"{"type":"cheat"}"#);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_unknown_category_fails() {
        let codec = JsonCodec;
        let result: Result<ClientMessage, _> =
            codec.decode(br#"{"type":"submit_score","room_code":"AB12","category":"yahtzee"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_garbage_fails() {
        let codec = JsonCodec;
        let result: Result<ClientMessage, _> = codec.decode(b"not json");
        assert!(result.is_err());
    }

    #[test]
    fn test_encode_error_event() {
        let codec = JsonCodec;
        let bytes = codec
            .encode(&ServerMessage::Error {
                kind: ErrorKind::NotYourTurn,
                message: "not your turn".into(),
            })
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["kind"], "NotYourTurn");
    }
}
