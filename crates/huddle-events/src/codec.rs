//! Codec for the cross-process envelope.
//!
//! Envelopes travel as discrete pub/sub payloads, so no stream framing is
//! needed; each payload is one MessagePack-encoded envelope.

use bytes::Bytes;
use thiserror::Error;

use crate::envelope::Envelope;

/// Maximum encoded envelope size (1 MiB).
pub const MAX_ENVELOPE_SIZE: usize = 1024 * 1024;

/// Errors that can occur during envelope encoding/decoding.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Envelope exceeds maximum size.
    #[error("Envelope size {0} exceeds maximum {MAX_ENVELOPE_SIZE}")]
    TooLarge(usize),

    /// MessagePack encoding error.
    #[error("Encoding error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// MessagePack decoding error.
    #[error("Decoding error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}

/// Encode an envelope to bytes.
///
/// # Errors
///
/// Returns an error if the envelope is too large or encoding fails.
pub fn encode(envelope: &Envelope) -> Result<Bytes, CodecError> {
    let payload = rmp_serde::to_vec_named(envelope)?;

    if payload.len() > MAX_ENVELOPE_SIZE {
        return Err(CodecError::TooLarge(payload.len()));
    }

    Ok(Bytes::from(payload))
}

/// Decode an envelope from bytes.
///
/// # Errors
///
/// Returns an error if the data is too large or invalid.
pub fn decode(data: &[u8]) -> Result<Envelope, CodecError> {
    if data.len() > MAX_ENVELOPE_SIZE {
        return Err(CodecError::TooLarge(data.len()));
    }

    let envelope = rmp_serde::from_slice(data)?;
    Ok(envelope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{Delivery, Target};
    use crate::events::ServerEvent;
    use crate::records::{Message, User};

    fn sample_envelope() -> Envelope {
        let user = User::placeholder(&"conn-1".into());
        let msg = Message::new(user, "hello".into(), None, None, Some("lobby".into()));
        Envelope::new(
            "proc-a",
            Delivery::new(Target::room("lobby"), ServerEvent::Message(msg)),
        )
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let envelope = sample_envelope();
        let encoded = encode(&envelope).unwrap();
        let decoded = decode(&encoded).unwrap();
        assert_eq!(envelope, decoded);
    }

    #[test]
    fn test_roundtrip_with_meta_value() {
        let user = User::placeholder(&"conn-1".into());
        let msg = Message::new(
            user,
            "hello".into(),
            Some(serde_json::json!({"bold": true, "tags": ["a", "b"]})),
            None,
            None,
        );
        let envelope = Envelope::new(
            "proc-a",
            Delivery::new(
                Target::broadcast_excluding("conn-1"),
                ServerEvent::Message(msg),
            ),
        );

        let decoded = decode(&encode(&envelope).unwrap()).unwrap();
        assert_eq!(envelope, decoded);
    }

    #[test]
    fn test_envelope_too_large() {
        let user = User::placeholder(&"conn-1".into());
        let msg = Message::new(user, "x".repeat(MAX_ENVELOPE_SIZE + 1), None, None, None);
        let envelope = Envelope::new(
            "proc-a",
            Delivery::new(Target::broadcast(), ServerEvent::Message(msg)),
        );

        match encode(&envelope) {
            Err(CodecError::TooLarge(_)) => {}
            other => panic!("Expected TooLarge error, got {:?}", other),
        }
    }
}
