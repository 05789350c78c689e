//! Secret key material held in memory.
//!
//! Keys are zeroised on drop and never print their contents: `Debug` and
//! `Display` render `***`.

use std::fmt;

use zeroize::Zeroizing;

/// Raw secret bytes (bot token, session key, claim key, indexer API key).
///
/// # Examples
/// ```
/// use zimbeat_backend::domain::SecretKey;
///
/// let key = SecretKey::from("s3cr3t");
/// assert_eq!(format!("{key:?}"), "SecretKey(***)");
/// assert_eq!(key.expose(), b"s3cr3t");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey(Zeroizing<Vec<u8>>);

impl SecretKey {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// Borrow the key bytes for a cryptographic operation.
    pub fn expose(&self) -> &[u8] {
        self.0.as_slice()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for SecretKey {
    fn from(value: &str) -> Self {
        Self::new(value.as_bytes().to_vec())
    }
}

impl From<String> for SecretKey {
    fn from(value: String) -> Self {
        Self::new(value.into_bytes())
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(***)")
    }
}

impl fmt::Display for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}
