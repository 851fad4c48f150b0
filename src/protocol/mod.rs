//! Protocol module - wire format and framing.
//!
//! Implements the binary v1 frame layer of the session protocol:
//! - 10-byte header encoding/decoding
//! - Frame reader/writer bound to one in-flight message
//! - Detached pending-frame handles for interruption recovery

mod frame;
mod wire_format;

pub use frame::{FrameReader, FrameWriter, PendingFrame, Wire};
pub(crate) use frame::HeaderBuf;
pub use wire_format::{DEFAULT_MAX_PAYLOAD_SIZE, HEADER_SIZE, Header};
