//! Wire format encoding and decoding.
//!
//! Implements the 10-byte v1 frame header:
//! ```text
//! ┌────────────┬──────────┬────────────┐
//! │ Session ID │ Msg Type │ Length     │
//! │ 4 bytes    │ 2 bytes  │ 4 bytes    │
//! │ uint32 BE  │ uint16 BE│ uint32 BE  │
//! └────────────┴──────────┴────────────┘
//! ```
//!
//! All multi-byte integers are Big Endian. The payload that follows the header
//! is opaque at this layer.

use crate::error::{Result, WireError};

/// Header size in bytes (fixed, exactly 10).
pub const HEADER_SIZE: usize = 10;

/// Default maximum payload size (64 KiB).
///
/// Requests on an embedded device are small; anything past this bound is a
/// framing violation, not a legitimate message.
pub const DEFAULT_MAX_PAYLOAD_SIZE: u32 = 64 * 1024;

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Logical channel carried over the physical interface.
    pub session_id: u32,
    /// Message type tag; selects the workflow on dispatch.
    pub msg_type: u16,
    /// Payload length in bytes.
    pub payload_length: u32,
}

impl Header {
    /// Create a new header.
    pub fn new(session_id: u32, msg_type: u16, payload_length: u32) -> Self {
        Self {
            session_id,
            msg_type,
            payload_length,
        }
    }

    /// Encode header to bytes (Big Endian).
    ///
    /// # Example
    ///
    /// ```
    /// use coldwire::protocol::Header;
    ///
    /// let header = Header::new(0, 4, 100);
    /// let bytes = header.encode();
    /// assert_eq!(bytes.len(), 10);
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        self.encode_into(&mut buf);
        buf
    }

    /// Encode header into an existing buffer.
    ///
    /// # Panics
    ///
    /// Panics if buffer is smaller than `HEADER_SIZE` (10 bytes).
    pub fn encode_into(&self, buf: &mut [u8]) {
        debug_assert!(buf.len() >= HEADER_SIZE);
        buf[0..4].copy_from_slice(&self.session_id.to_be_bytes());
        buf[4..6].copy_from_slice(&self.msg_type.to_be_bytes());
        buf[6..10].copy_from_slice(&self.payload_length.to_be_bytes());
    }

    /// Decode header from an exactly-sized buffer.
    pub fn from_bytes(buf: &[u8; HEADER_SIZE]) -> Self {
        Self {
            session_id: u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]),
            msg_type: u16::from_be_bytes([buf[4], buf[5]]),
            payload_length: u32::from_be_bytes([buf[6], buf[7], buf[8], buf[9]]),
        }
    }

    /// Decode header from bytes (Big Endian).
    ///
    /// Returns `None` if buffer is too short.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        let fixed: &[u8; HEADER_SIZE] = buf.get(..HEADER_SIZE)?.try_into().ok()?;
        Some(Self::from_bytes(fixed))
    }

    /// Validate the header against the interface's payload bound.
    pub fn validate(&self, max_payload_size: u32) -> Result<()> {
        if self.payload_length > max_payload_size {
            return Err(WireError::Framing(format!(
                "payload size {} exceeds maximum {}",
                self.payload_length, max_payload_size
            )));
        }
        Ok(())
    }
}
