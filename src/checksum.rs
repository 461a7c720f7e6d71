//! Frame checksum.
//!
//! The panel checksums every frame with the two's-complement negation
//! of the byte sum: sum all ASCII values mod 256, invert, add one,
//! render as two uppercase hex digits. The same function serves both
//! inbound validation and outbound generation so the two paths cannot
//! drift.

/// Compute the checksum over the given frame characters
/// (length field + kind + payload + reserved).
pub fn compute(data: &str) -> String {
    let sum = data.bytes().fold(0u8, |acc, b| acc.wrapping_add(b));
    format!("{:02X}", (!sum).wrapping_add(1))
}

/// Verify a received checksum field against the recomputed value.
pub fn verify(data: &str, received: &str) -> bool {
    compute(data) == received
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_value() {
        // "06vn00" is the version request frame without its checksum.
        let sum: u32 = "06vn00".bytes().map(u32::from).sum();
        let expected = format!("{:02X}", (256 - sum % 256) % 256);
        assert_eq!(compute("06vn00"), expected);
    }

    #[test]
    fn test_sum_wraps_to_zero() {
        // Four 0x40 bytes sum to 0x100 ≡ 0, whose negation is 0.
        assert_eq!(compute("@@@@"), "00");
    }

    #[test]
    fn test_verify_roundtrip() {
        for data in ["06as00", "0Dcn001000001", "16KF01C200000000000000"] {
            let cc = compute(data);
            assert!(verify(data, &cc));
        }
    }

    #[test]
    fn test_single_byte_flip_detected() {
        let data = "0AZC016200";
        let cc = compute(data);
        let mut corrupted = data.to_string();
        // Flip one character; the sum changes, so the checksum must too.
        corrupted.replace_range(4..5, "7");
        assert!(!verify(&corrupted, &cc));
    }
}
