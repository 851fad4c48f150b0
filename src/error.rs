//! Error types for coldwire.

use thiserror::Error;

use crate::messages::FailureCode;
use crate::protocol::PendingFrame;

/// Main error type for all wire-session operations.
///
/// Two variants are not failures in the usual sense:
///
/// - [`WireError::Unexpected`] is a control signal. It carries the frame that
///   arrived while something else was awaited, so the session handler can
///   re-dispatch it without losing bytes off the wire. Intermediate layers must
///   propagate it untouched and never answer it with a failure reply.
/// - [`WireError::Failure`] is an expected, recoverable application-level
///   rejection (invalid PIN, cancelled action). The dispatch adapter turns it
///   into a failure reply on the wire before re-raising it.
#[derive(Debug, Error)]
pub enum WireError {
    /// I/O error on the physical interface.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Message serialization error.
    #[error("encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// Message deserialization error.
    #[error("decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// Frame-level protocol violation (malformed header, length mismatch).
    #[error("framing error: {0}")]
    Framing(String),

    /// The interface was closed by the other side.
    #[error("interface closed")]
    InterfaceClosed,

    /// A frame of an unexpected type arrived while another read or wait was in
    /// flight. Carries the still-open frame for re-dispatch.
    #[error("unexpected message: type {}", .0.msg_type())]
    Unexpected(PendingFrame),

    /// Domain failure reported to the host as a `Failure { code, message }`
    /// reply.
    #[error("{message}")]
    Failure {
        /// Wire failure code.
        code: FailureCode,
        /// Human-readable reason.
        message: String,
    },
}

impl WireError {
    /// Domain failure with an explicit code and message.
    pub fn failure(code: FailureCode, message: impl Into<String>) -> Self {
        Self::Failure {
            code,
            message: message.into(),
        }
    }

    /// The user declined a confirmation or cancelled a prompt.
    pub fn action_cancelled() -> Self {
        Self::failure(FailureCode::ActionCancelled, "Cancelled")
    }

    /// A PIN did not match the one in the credential store.
    pub fn pin_invalid() -> Self {
        Self::failure(FailureCode::PinInvalid, "PIN invalid")
    }
}

/// Result type alias using WireError.
pub type Result<T> = std::result::Result<T, WireError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Header;

    #[test]
    fn test_failure_constructors() {
        match WireError::pin_invalid() {
            WireError::Failure { code, message } => {
                assert_eq!(code, FailureCode::PinInvalid);
                assert_eq!(message, "PIN invalid");
            }
            other => panic!("unexpected variant: {other:?}"),
        }

        match WireError::action_cancelled() {
            WireError::Failure { code, .. } => assert_eq!(code, FailureCode::ActionCancelled),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_unexpected_display_names_the_type() {
        let frame = PendingFrame::new(Header::new(0, 26, 4));
        let err = WireError::Unexpected(frame);
        assert!(err.to_string().contains("26"));
    }
}
