//! Filename derivation from cache keys.

use crate::error::{Error, Result};
use serde::Serialize;

/// Number of digest bytes kept for hashed filenames (128 bits).
pub const HASHED_NAME_BYTES: usize = 16;

/// How a cache key becomes a filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilenameStrategy {
    /// First 128 bits of the BLAKE3 digest of the key, as lowercase hex.
    #[default]
    Hashed,
    /// The key itself.
    Plain,
}

impl FilenameStrategy {
    /// Returns the string representation of the strategy.
    pub fn as_str(&self) -> &'static str {
        match self {
            FilenameStrategy::Hashed => "hashed",
            FilenameStrategy::Plain => "plain",
        }
    }

    /// Derive the filename for `key`.
    pub fn derive(&self, key: &str) -> Result<String> {
        match self {
            FilenameStrategy::Hashed => Ok(hashed_name(key)),
            FilenameStrategy::Plain => {
                validate_plain(key)?;
                Ok(key.to_string())
            }
        }
    }
}

/// Hash a key to a fixed-width hex filename.
pub fn hashed_name(key: &str) -> String {
    let digest = blake3::hash(key.as_bytes());
    hex::encode(&digest.as_bytes()[..HASHED_NAME_BYTES])
}

/// Reject keys that would escape or alias the cache directory.
fn validate_plain(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::invalid_key(key, "key cannot be empty"));
    }

    if key == "." || key == ".." {
        return Err(Error::invalid_key(key, "key cannot be a relative path component"));
    }

    if key.contains('/') || key.contains('\\') || key.contains('\0') {
        return Err(Error::invalid_key(
            key,
            "key must not contain path separators or NUL",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hashed_name_shape() {
        let name = hashed_name("file.txt");
        assert_eq!(name.len(), HASHED_NAME_BYTES * 2);
        assert!(name.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_hashed_name_is_blake3_prefix() {
        let full = blake3::hash(b"hello world").to_hex().to_string();
        assert_eq!(hashed_name("hello world"), full[..32]);
        assert_eq!(hashed_name("hello world"), "d74981efa70a0c880b8d8c1985d075db");
    }

    #[test]
    fn test_hashed_accepts_any_key() {
        let strategy = FilenameStrategy::Hashed;
        assert!(strategy.derive("").is_ok());
        assert!(strategy.derive("../etc/passwd").is_ok());
        assert_ne!(strategy.derive("a").unwrap(), strategy.derive("b").unwrap());
    }

    #[test]
    fn test_plain_keeps_key() {
        let strategy = FilenameStrategy::Plain;
        assert_eq!(strategy.derive("file.txt").unwrap(), "file.txt");
    }

    #[test]
    fn test_plain_rejects_unsafe_keys() {
        let strategy = FilenameStrategy::Plain;
        for key in ["", ".", "..", "a/b", "a\\b", "nul\0byte"] {
            assert!(
                matches!(strategy.derive(key), Err(Error::InvalidKey { .. })),
                "accepted {:?}",
                key
            );
        }
    }

    #[test]
    fn test_default_is_hashed() {
        assert_eq!(FilenameStrategy::default(), FilenameStrategy::Hashed);
        assert_eq!(FilenameStrategy::Hashed.as_str(), "hashed");
        assert_eq!(FilenameStrategy::Plain.as_str(), "plain");
    }

    // Property-based tests
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            max_shrink_iters: 10000,
            ..ProptestConfig::default()
        })]

        /// Derivation is a pure function of the key.
        #[test]
        fn prop_derive_deterministic(key in ".*") {
            let first = FilenameStrategy::Hashed.derive(&key)?;
            let second = FilenameStrategy::Hashed.derive(&key)?;
            prop_assert_eq!(first, second);
        }

        /// Hashed names never contain path separators.
        #[test]
        fn prop_hashed_name_is_filesystem_safe(key in ".*") {
            let name = hashed_name(&key);
            prop_assert!(!name.contains('/'));
            prop_assert_eq!(name.len(), 32);
        }
    }
}
