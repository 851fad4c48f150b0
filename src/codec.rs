//! Structured-message codec boundary.
//!
//! The session layer treats message bodies as opaque: all it needs is "encode a
//! typed message to bytes" (so the frame header can declare the payload length
//! up front) and "decode a typed message from the payload bytes". Field-level
//! serialization itself is delegated to `rmp-serde`.
//!
//! Structs are encoded as maps (`to_vec_named`), not positional arrays, so a
//! message schema can grow optional fields without breaking older hosts.

use crate::error::Result;

/// MessagePack codec for structured messages.
pub struct MsgPackCodec;

impl MsgPackCodec {
    /// Encode a value to MsgPack bytes (struct-as-map format).
    #[inline]
    pub fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(value)?)
    }

    /// Decode MsgPack bytes to a value.
    #[inline]
    pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct TestMessage {
        code: u32,
        message: String,
    }

    #[test]
    fn test_encode_decode_struct() {
        let original = TestMessage {
            code: 7,
            message: "PIN invalid".to_string(),
        };

        let encoded = MsgPackCodec::encode(&original).unwrap();
        let decoded: TestMessage = MsgPackCodec::decode(&encoded).unwrap();

        assert_eq!(decoded, original);
    }

    #[test]
    fn test_structs_encode_as_maps() {
        let msg = TestMessage {
            code: 1,
            message: "x".to_string(),
        };

        let encoded = MsgPackCodec::encode(&msg).unwrap();

        // fixmap marker (0x8X), not fixarray (0x9X)
        assert_eq!(
            encoded[0] & 0xF0,
            0x80,
            "expected map format, got {:02X}",
            encoded[0]
        );
    }

    #[test]
    fn test_empty_struct() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Empty {}

        let encoded = MsgPackCodec::encode(&Empty {}).unwrap();
        let decoded: Empty = MsgPackCodec::decode(&encoded).unwrap();
        assert_eq!(decoded, Empty {});
    }

    #[test]
    fn test_decode_error_on_invalid_data() {
        let invalid = b"not valid msgpack";
        let result: Result<TestMessage> = MsgPackCodec::decode(invalid);
        assert!(result.is_err());
    }
}
