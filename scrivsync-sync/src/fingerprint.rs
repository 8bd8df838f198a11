//! Content fingerprints used for drift detection.

use sha2::{Digest, Sha256};

/// SHA-256 hex digest of `content` after CRLF → LF normalisation.
///
/// The same function is applied to both sides so a file saved with Windows
/// line endings does not register as a change.
pub fn fingerprint(content: &str) -> String {
    let normalized = normalize_line_endings(content);
    let mut h = Sha256::new();
    h.update(normalized.as_bytes());
    hex::encode(h.finalize())
}

pub(crate) fn normalize_line_endings(content: &str) -> String {
    content.replace("\r\n", "\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_digest() {
        assert_eq!(
            fingerprint(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn crlf_matches_lf() {
        assert_eq!(fingerprint("a\r\nb\r\n"), fingerprint("a\nb\n"));
        assert_ne!(fingerprint("a\nb\n"), fingerprint("a\nb"));
    }
}
