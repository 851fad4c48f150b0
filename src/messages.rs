//! Core wire message set.
//!
//! Every message carries a wire type tag in its frame header; the
//! [`WireMessage`] trait binds a serde type to its tag so the session context
//! can stamp outgoing headers and check incoming ones. Only the messages the
//! session core itself needs live here; application message sets define their
//! own types and implement [`WireMessage`] the same way.

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

/// A typed message with a fixed wire type tag.
pub trait WireMessage: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Wire type tag stamped into the frame header.
    const MSG_TYPE: u16;
    /// Message name used in log lines.
    const NAME: &'static str;
}

/// Wire type tags for the core message set.
pub mod msg_type {
    /// Liveness probe; answered with `Success` echoing the message.
    pub const PING: u16 = 1;
    /// Terminal success reply.
    pub const SUCCESS: u16 = 2;
    /// Terminal failure reply.
    pub const FAILURE: u16 = 3;
    /// Request to set, change or remove the device PIN.
    pub const CHANGE_PIN: u16 = 4;
    /// Device asks the host to acknowledge an upcoming user interaction.
    pub const BUTTON_REQUEST: u16 = 26;
    /// Host acknowledgment for `BUTTON_REQUEST`.
    pub const BUTTON_ACK: u16 = 27;
}

/// Failure codes carried in [`Failure`] replies, encoded as `u32` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum FailureCode {
    /// A message arrived that no pending read or registration expected.
    UnexpectedMessage,
    /// A button acknowledgment was expected.
    ButtonExpected,
    /// Malformed or out-of-range request data.
    DataError,
    /// The user declined the action.
    ActionCancelled,
    /// A PIN was expected.
    PinExpected,
    /// The user cancelled PIN entry.
    PinCancelled,
    /// The PIN did not match.
    PinInvalid,
    /// The operation could not be completed.
    ProcessError,
    /// The device is not initialized.
    NotInitialized,
    /// Unclassified firmware error.
    FirmwareError,
}

impl From<FailureCode> for u32 {
    fn from(code: FailureCode) -> Self {
        match code {
            FailureCode::UnexpectedMessage => 1,
            FailureCode::ButtonExpected => 2,
            FailureCode::DataError => 3,
            FailureCode::ActionCancelled => 4,
            FailureCode::PinExpected => 5,
            FailureCode::PinCancelled => 6,
            FailureCode::PinInvalid => 7,
            FailureCode::ProcessError => 9,
            FailureCode::NotInitialized => 11,
            FailureCode::FirmwareError => 99,
        }
    }
}

impl From<u32> for FailureCode {
    fn from(raw: u32) -> Self {
        match raw {
            1 => Self::UnexpectedMessage,
            2 => Self::ButtonExpected,
            3 => Self::DataError,
            4 => Self::ActionCancelled,
            5 => Self::PinExpected,
            6 => Self::PinCancelled,
            7 => Self::PinInvalid,
            9 => Self::ProcessError,
            11 => Self::NotInitialized,
            // unknown codes collapse to the generic firmware error
            _ => Self::FirmwareError,
        }
    }
}

/// Reason the device is asking for a button acknowledgment, `u32` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum ButtonRequestCode {
    /// Generic user interaction.
    Other,
    /// Confirmation of a protected call (PIN change, wipe, ...).
    ProtectCall,
}

impl From<ButtonRequestCode> for u32 {
    fn from(code: ButtonRequestCode) -> Self {
        match code {
            ButtonRequestCode::Other => 1,
            ButtonRequestCode::ProtectCall => 7,
        }
    }
}

impl From<u32> for ButtonRequestCode {
    fn from(raw: u32) -> Self {
        match raw {
            7 => Self::ProtectCall,
            _ => Self::Other,
        }
    }
}

/// Liveness probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ping {
    /// Echoed back in the `Success` reply.
    pub message: String,
}

impl WireMessage for Ping {
    const MSG_TYPE: u16 = msg_type::PING;
    const NAME: &'static str = "Ping";
}

/// Terminal success reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Success {
    /// Human-readable outcome.
    pub message: String,
}

impl WireMessage for Success {
    const MSG_TYPE: u16 = msg_type::SUCCESS;
    const NAME: &'static str = "Success";
}

/// Terminal failure reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    /// Machine-readable failure class.
    pub code: FailureCode,
    /// Human-readable reason.
    pub message: String,
}

impl WireMessage for Failure {
    const MSG_TYPE: u16 = msg_type::FAILURE;
    const NAME: &'static str = "Failure";
}

/// Request to set, change or remove the device PIN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangePin {
    /// Remove the current PIN instead of setting a new one.
    pub remove: bool,
}

impl WireMessage for ChangePin {
    const MSG_TYPE: u16 = msg_type::CHANGE_PIN;
    const NAME: &'static str = "ChangePin";
}

/// Device-to-host notice that a user interaction is about to start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButtonRequest {
    /// What kind of interaction is pending.
    pub code: ButtonRequestCode,
}

impl WireMessage for ButtonRequest {
    const MSG_TYPE: u16 = msg_type::BUTTON_REQUEST;
    const NAME: &'static str = "ButtonRequest";
}

/// Host acknowledgment for a [`ButtonRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButtonAck {}

impl WireMessage for ButtonAck {
    const MSG_TYPE: u16 = msg_type::BUTTON_ACK;
    const NAME: &'static str = "ButtonAck";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::MsgPackCodec;

    #[test]
    fn test_failure_code_wire_values() {
        assert_eq!(u32::from(FailureCode::UnexpectedMessage), 1);
        assert_eq!(u32::from(FailureCode::ActionCancelled), 4);
        assert_eq!(u32::from(FailureCode::PinInvalid), 7);
        assert_eq!(u32::from(FailureCode::FirmwareError), 99);
    }

    #[test]
    fn test_failure_code_roundtrip() {
        for code in [
            FailureCode::UnexpectedMessage,
            FailureCode::ButtonExpected,
            FailureCode::DataError,
            FailureCode::ActionCancelled,
            FailureCode::PinExpected,
            FailureCode::PinCancelled,
            FailureCode::PinInvalid,
            FailureCode::ProcessError,
            FailureCode::NotInitialized,
            FailureCode::FirmwareError,
        ] {
            assert_eq!(FailureCode::from(u32::from(code)), code);
        }
    }

    #[test]
    fn test_unknown_failure_code_decodes_to_firmware_error() {
        assert_eq!(FailureCode::from(12345), FailureCode::FirmwareError);
    }

    #[test]
    fn test_failure_message_roundtrip() {
        let failure = Failure {
            code: FailureCode::PinInvalid,
            message: "PIN invalid".to_string(),
        };
        let bytes = MsgPackCodec::encode(&failure).unwrap();
        let decoded: Failure = MsgPackCodec::decode(&bytes).unwrap();
        assert_eq!(decoded, failure);
    }

    #[test]
    fn test_button_ack_is_empty_map() {
        let bytes = MsgPackCodec::encode(&ButtonAck {}).unwrap();
        assert_eq!(bytes, vec![0x80]);
        let _: ButtonAck = MsgPackCodec::decode(&bytes).unwrap();
    }

    #[test]
    fn test_message_tags_are_distinct() {
        let tags = [
            Ping::MSG_TYPE,
            Success::MSG_TYPE,
            Failure::MSG_TYPE,
            ChangePin::MSG_TYPE,
            ButtonRequest::MSG_TYPE,
            ButtonAck::MSG_TYPE,
        ];
        for (i, a) in tags.iter().enumerate() {
            for b in &tags[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
