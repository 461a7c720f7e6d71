//! Frame codec: one newline-delimited line of panel traffic in or out.
//!
//! Frame layout is `LL KK [payload] RR CC` with no separators: a
//! 2-hex-digit length, a 2-character kind code, optional payload, a
//! 2-character reserved field and a 2-hex-digit checksum. The length
//! field counts every character after itself, checksum included.

use crate::checksum;
use crate::error::FrameError;

/// Minimum frame: length(2) + kind(2) + reserved(2) + checksum(2).
pub const MIN_FRAME_LEN: usize = 8;

/// A parsed protocol frame.
///
/// Immutable once constructed. Inbound messages are built by
/// [`decode_line`]; outbound messages by [`Message::new`], which
/// derives the length and checksum fields eagerly so a message always
/// carries its complete wire form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Declared payload length, two uppercase hex digits.
    pub length: String,
    /// Two-character message-type code (`"ZC"`, `"as"`, ...).
    pub kind: String,
    /// Variable-length character data; empty for minimum-size frames.
    pub payload: String,
    /// Two-character reserved field, `"00"` in all observed traffic.
    /// Carried through opaquely, never validated.
    pub reserved: String,
    /// Frame checksum, two uppercase hex digits.
    pub checksum: String,
}

impl Message {
    /// Build an outbound message for the given kind and payload.
    pub fn new(kind: &str, payload: &str) -> Self {
        Self::with_reserved(kind, payload, "00")
    }

    fn with_reserved(kind: &str, payload: &str, reserved: &str) -> Self {
        // The length field counts kind + payload + reserved + checksum,
        // i.e. the trailing fields' width plus two for the checksum.
        let length = format!("{:02X}", kind.len() + payload.len() + reserved.len() + 2);
        let checksum = checksum::compute(&format!("{length}{kind}{payload}{reserved}"));
        Self {
            length,
            kind: kind.to_string(),
            payload: payload.to_string(),
            reserved: reserved.to_string(),
            checksum,
        }
    }

    /// Serialize to the wire form, without the line terminator.
    pub fn encode(&self) -> String {
        format!(
            "{}{}{}{}{}",
            self.length, self.kind, self.payload, self.reserved, self.checksum
        )
    }
}

/// Parse one pre-delimited line (terminator already stripped) into a
/// validated [`Message`].
pub fn decode_line(line: &str) -> Result<Message, FrameError> {
    if line.len() < MIN_FRAME_LEN {
        return Err(FrameError::Truncated { len: line.len() });
    }
    if !line.is_ascii() {
        return Err(FrameError::NonAscii);
    }

    let length = &line[0..2];
    let declared = usize::from_str_radix(length, 16).map_err(|_| FrameError::InvalidLength {
        field: length.to_string(),
    })?;
    if declared != line.len() - 2 {
        return Err(FrameError::LengthMismatch {
            declared,
            actual: line.len() - 2,
        });
    }

    let kind = &line[2..4];
    let payload = &line[4..line.len() - 4];
    let reserved = &line[line.len() - 4..line.len() - 2];
    let found = &line[line.len() - 2..];

    let expected = checksum::compute(&line[..line.len() - 2]);
    if expected != found {
        return Err(FrameError::ChecksumMismatch {
            expected,
            found: found.to_string(),
        });
    }

    Ok(Message {
        length: length.to_string(),
        kind: kind.to_string(),
        payload: payload.to_string(),
        reserved: reserved.to_string(),
        checksum: found.to_string(),
    })
}
