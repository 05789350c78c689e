//! HMAC-SHA256 signing over canonical, colon-delimited messages.
//!
//! Every signature in the pipeline (identity assertions, reward claims) goes
//! through [`sign`] and [`verify`]. Messages are built with
//! [`CanonicalMessage`], which refuses fields containing the delimiter so two
//! different field tuples can never produce the same string.

use std::fmt;

use hmac::digest::{Key, KeyInit};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Field separator for canonical messages.
pub const DELIMITER: char = ':';

/// Key a MAC from arbitrary-length key material.
///
/// Keys longer than the block are hashed first and shorter ones are
/// zero-padded, as RFC 2104 prescribes.
fn keyed_mac(key: &[u8]) -> HmacSha256 {
    let mut block = Key::<HmacSha256>::default();
    let digest;
    let material = if key.len() > block.len() {
        digest = Sha256::digest(key);
        digest.as_slice()
    } else {
        key
    };
    for (slot, byte) in block.iter_mut().zip(material) {
        *slot = *byte;
    }
    <HmacSha256 as KeyInit>::new(&block)
}

/// Compute the raw HMAC-SHA256 tag of `message` under `key`.
pub fn hmac_sha256(key: &[u8], message: &[u8]) -> [u8; 32] {
    let mut mac = keyed_mac(key);
    mac.update(message);
    mac.finalize().into_bytes().into()
}

/// Sign `message` and return the lowercase hex digest.
///
/// # Examples
/// ```
/// use zimbeat_backend::domain::signature;
///
/// let digest = signature::sign(b"key", "a:b");
/// assert_eq!(digest.len(), 64);
/// assert!(signature::verify(b"key", "a:b", &digest));
/// ```
pub fn sign(secret: &[u8], message: &str) -> String {
    hex::encode(hmac_sha256(secret, message.as_bytes()))
}

/// Check a hex digest in constant time.
///
/// Malformed hex, wrong length, and mismatches all return `false`.
pub fn verify(secret: &[u8], message: &str, digest: &str) -> bool {
    verify_bytes(secret, message.as_bytes(), digest)
}

pub(crate) fn verify_bytes(secret: &[u8], message: &[u8], digest: &str) -> bool {
    let Ok(candidate) = hex::decode(digest.trim()) else {
        return false;
    };
    let mut mac = keyed_mac(secret);
    mac.update(message);
    mac.verify_slice(&candidate).is_ok()
}

/// A field contained the delimiter and was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("field `{field}` must not contain '{DELIMITER}'")]
pub struct AmbiguousField {
    pub field: &'static str,
}

/// Builder for `field:field:field` messages.
///
/// # Examples
/// ```
/// use zimbeat_backend::domain::signature::CanonicalMessage;
///
/// let message = CanonicalMessage::new()
///     .field("user", "u1")?
///     .field("amount", 10)?
///     .finish();
/// assert_eq!(message, "u1:10");
/// # Ok::<(), zimbeat_backend::domain::signature::AmbiguousField>(())
/// ```
#[derive(Debug, Default)]
pub struct CanonicalMessage {
    buffer: String,
    fields: usize,
}

impl CanonicalMessage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field, rejecting values that contain the delimiter.
    pub fn field(
        mut self,
        name: &'static str,
        value: impl fmt::Display,
    ) -> Result<Self, AmbiguousField> {
        let rendered = value.to_string();
        if rendered.contains(DELIMITER) {
            return Err(AmbiguousField { field: name });
        }
        if self.fields > 0 {
            self.buffer.push(DELIMITER);
        }
        self.buffer.push_str(&rendered);
        self.fields += 1;
        Ok(self)
    }

    pub fn finish(self) -> String {
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    // RFC 4231 test case 2.
    const RFC_KEY: &[u8] = b"Jefe";
    const RFC_MESSAGE: &str = "what do ya want for nothing?";
    const RFC_DIGEST: &str = "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843";

    #[test]
    fn sign_matches_reference_vector() {
        assert_eq!(sign(RFC_KEY, RFC_MESSAGE), RFC_DIGEST);
    }

    // RFC 4231 test case 6: a key longer than the block is hashed first.
    #[test]
    fn long_key_matches_reference_vector() {
        let key = [0xaa_u8; 131];
        let digest = sign(&key, "Test Using Larger Than Block-Size Key - Hash Key First");
        assert_eq!(
            digest,
            "60e431591ee0b67f0d8a26aacbf5b77f8e0bc6213728c5140546040f0ee37f54"
        );
    }

    #[test]
    fn verify_accepts_reference_vector_in_either_case() {
        assert!(verify(RFC_KEY, RFC_MESSAGE, RFC_DIGEST));
        assert!(verify(RFC_KEY, RFC_MESSAGE, &RFC_DIGEST.to_uppercase()));
    }

    #[rstest]
    #[case::flipped_char("5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3844")]
    #[case::truncated("5bdcc146bf60754e6a042426089575c7")]
    #[case::not_hex("zzdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843")]
    #[case::empty("")]
    fn verify_rejects_bad_digests(#[case] digest: &str) {
        assert!(!verify(RFC_KEY, RFC_MESSAGE, digest));
    }

    #[test]
    fn verify_rejects_other_key() {
        assert!(!verify(b"other", RFC_MESSAGE, RFC_DIGEST));
    }

    #[test]
    fn canonical_message_joins_fields() {
        let message = CanonicalMessage::new()
            .field("a", "x")
            .and_then(|m| m.field("b", 42))
            .map(CanonicalMessage::finish)
            .expect("fields are unambiguous");
        assert_eq!(message, "x:42");
    }

    #[test]
    fn canonical_message_rejects_delimiter() {
        let err = CanonicalMessage::new()
            .field("question_id", "q:1")
            .expect_err("delimiter refused");
        assert_eq!(err.field, "question_id");
    }
}
