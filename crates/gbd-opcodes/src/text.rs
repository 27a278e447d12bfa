//! Lossy string decoding for the NoOp free-form string tag. Real EUC-JP
//! conversion is out of scope for this debugger; this is the minimal real
//! stand-in so the tag handler has something to call.

/// Decode a byte buffer into displayable text, replacing invalid sequences
/// rather than failing.
#[must_use]
pub fn decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_valid_utf8_unchanged() {
        assert_eq!(decode(b"hello"), "hello");
    }

    #[test]
    fn replaces_invalid_sequences_instead_of_failing() {
        let bytes = [0xFF, 0xFE, b'x'];
        let decoded = decode(&bytes);
        assert!(decoded.ends_with('x'));
    }
}
