//! Error taxonomy for the engine.
//!
//! Framing problems (`FrameError`) stay inside the reader path: a bad
//! line is logged and dropped, never forwarded to entity code. Reply
//! timeouts are recoverable and surface as failed scan steps. Transport
//! loss is fatal to the connection but leaves entity state intact.

/// Errors detected while parsing a single protocol frame.
///
/// A frame failing any of these checks is rejected whole; no partially
/// trusted `Message` is ever produced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// Line is shorter than the 8-character minimum frame.
    #[error("truncated frame: {len} chars, minimum is 8")]
    Truncated { len: usize },

    /// Frames are pure ASCII; anything else is line noise.
    #[error("frame contains non-ASCII bytes")]
    NonAscii,

    /// The length field is not two hex digits.
    #[error("unparseable length field {field:?}")]
    InvalidLength { field: String },

    /// The declared length disagrees with the actual frame length.
    #[error("length mismatch: declared {declared}, actual {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    /// The transmitted checksum disagrees with the computed one.
    #[error("checksum mismatch: expected {expected}, found {found}")]
    ChecksumMismatch { expected: String, found: String },
}

/// All errors that can occur in the elkm1-link library.
#[derive(Debug, thiserror::Error)]
pub enum ElkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Frame(#[from] FrameError),

    /// No reply of the awaited kind arrived within the timeout.
    #[error("no {kind} reply within {timeout_ms}ms")]
    ReplyTimeout { kind: String, timeout_ms: u64 },

    #[error("connection to panel lost")]
    Disconnected,

    #[error("invalid {entity} number {number} (max {max})")]
    InvalidNumber {
        entity: &'static str,
        number: u16,
        max: u16,
    },

    #[error("invalid response: {details}")]
    InvalidResponse { details: String },

    #[error("event channel closed")]
    ChannelClosed,
}

impl ElkError {
    /// Whether this error is transient and the connection should be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ElkError::Io(_)
                | ElkError::ReplyTimeout { .. }
                | ElkError::Disconnected
                | ElkError::ChannelClosed
        )
    }
}

pub type Result<T> = std::result::Result<T, ElkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ElkError::Disconnected.is_retryable());
        assert!(ElkError::ReplyTimeout {
            kind: "AS".into(),
            timeout_ms: 5000
        }
        .is_retryable());
        assert!(!ElkError::InvalidNumber {
            entity: "zone",
            number: 0,
            max: 208
        }
        .is_retryable());
        assert!(!ElkError::Frame(FrameError::Truncated { len: 3 }).is_retryable());
    }

    #[test]
    fn test_frame_error_display() {
        let e = FrameError::ChecksumMismatch {
            expected: "D6".into(),
            found: "00".into(),
        };
        assert_eq!(e.to_string(), "checksum mismatch: expected D6, found 00");
    }
}
