//! Error and status-code types.
//!
//! Every failure maps onto a negative status code. The numbering follows
//! libopus so that the C bridge can hand codes straight back to callers that
//! already understand `OPUS_BAD_ARG` and friends.

use thiserror::Error;

use crate::session::{Lifecycle, Role};

/// Success.
pub const OK: i32 = 0;
/// One or more invalid/out of range arguments.
pub const BAD_ARG: i32 = -1;
/// Not enough bytes allocated in the buffer.
pub const BUFFER_TOO_SMALL: i32 = -2;
/// An internal error was detected.
pub const INTERNAL_ERROR: i32 = -3;
/// The compressed data passed is corrupted.
pub const INVALID_PACKET: i32 = -4;
/// Invalid/unsupported request number.
pub const UNIMPLEMENTED: i32 = -5;
/// A session structure is invalid or already freed.
pub const INVALID_STATE: i32 = -6;
/// A getter was given no destination.
pub const NULL_OUTPUT: i32 = -8;

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, CodecError>;

/// Error returned by session, controller and protocol operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Value outside its documented range or enumeration.
    #[error("opus: invalid argument: {0}")]
    InvalidArgument(String),

    /// Caller-provided buffer cannot hold the result.
    #[error("opus: buffer too small: need {needed}, got {actual}")]
    BufferTooSmall { needed: usize, actual: usize },

    /// The engine reported a failure it could not attribute to the caller.
    #[error("opus: internal error: {0}")]
    Internal(String),

    /// Malformed or oversized packet.
    #[error("opus: invalid packet: {0}")]
    InvalidPacket(String),

    /// Operation invoked against the wrong role, or an unknown request.
    #[error("opus: {op} is not supported by {role}")]
    Unsupported { op: &'static str, role: Role },

    /// Raw request code outside the ctl vocabulary.
    #[error("opus: unknown request {0}")]
    UnknownRequest(i32),

    /// Operation on a session that is not active.
    #[error("opus: session is {0}")]
    InvalidState(Lifecycle),

    /// Getter given no destination (C boundary only).
    #[error("opus: null output pointer")]
    NullOutput,
}

impl CodecError {
    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub(crate) fn invalid_packet(msg: impl Into<String>) -> Self {
        Self::InvalidPacket(msg.into())
    }

    /// Returns the numeric status code for this error.
    pub fn status(&self) -> i32 {
        match self {
            Self::InvalidArgument(_) => BAD_ARG,
            Self::BufferTooSmall { .. } => BUFFER_TOO_SMALL,
            Self::Internal(_) => INTERNAL_ERROR,
            Self::InvalidPacket(_) => INVALID_PACKET,
            Self::Unsupported { .. } | Self::UnknownRequest(_) => UNIMPLEMENTED,
            Self::InvalidState(_) => INVALID_STATE,
            Self::NullOutput => NULL_OUTPUT,
        }
    }

    /// Converts a negative engine return code into an error.
    ///
    /// `context` names the operation and ends up in the message.
    pub fn from_status(code: i32, context: &str) -> Self {
        match code {
            BAD_ARG => Self::invalid_argument(context),
            BUFFER_TOO_SMALL => Self::BufferTooSmall {
                needed: 0,
                actual: 0,
            },
            INVALID_PACKET => Self::invalid_packet(context),
            INVALID_STATE => Self::InvalidState(Lifecycle::Destroyed),
            _ => Self::Internal(format!("{}: status {}", context, code)),
        }
    }
}

/// Returns a static description for a status code.
pub fn status_str(code: i32) -> &'static str {
    match code {
        OK => "success",
        BAD_ARG => "invalid argument",
        BUFFER_TOO_SMALL => "buffer too small",
        INTERNAL_ERROR => "internal error",
        INVALID_PACKET => "corrupted stream",
        UNIMPLEMENTED => "request not implemented",
        INVALID_STATE => "invalid state",
        NULL_OUTPUT => "null output pointer",
        _ => "unknown error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(CodecError::invalid_argument("x").status(), BAD_ARG);
        assert_eq!(CodecError::InvalidState(Lifecycle::Destroyed).status(), INVALID_STATE);
        assert_eq!(CodecError::NullOutput.status(), NULL_OUTPUT);
        assert_eq!(CodecError::UnknownRequest(4242).status(), UNIMPLEMENTED);
        assert_eq!(
            CodecError::Unsupported {
                op: "get_last_packet_duration",
                role: Role::Encoder,
            }
            .status(),
            UNIMPLEMENTED
        );
    }

    #[test]
    fn test_from_status() {
        assert_eq!(CodecError::from_status(BAD_ARG, "set").status(), BAD_ARG);
        assert_eq!(CodecError::from_status(INVALID_PACKET, "decode").status(), INVALID_PACKET);
        assert!(matches!(
            CodecError::from_status(-7, "create"),
            CodecError::Internal(_)
        ));
    }

    #[test]
    fn test_error_display() {
        let err = CodecError::InvalidState(Lifecycle::Destroyed);
        assert!(format!("{}", err).contains("destroyed"));

        let err = CodecError::Unsupported {
            op: "get_last_packet_duration",
            role: Role::Encoder,
        };
        assert!(format!("{}", err).contains("encoder"));
    }

    #[test]
    fn test_status_str() {
        assert_eq!(status_str(OK), "success");
        assert_eq!(status_str(UNIMPLEMENTED), "request not implemented");
        assert_eq!(status_str(-100), "unknown error");
    }
}
