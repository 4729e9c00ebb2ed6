//! Error types for fscache_core.

use thiserror::Error;

/// Result type alias using fscache_core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during cache operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error occurred during file operations.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Raw entry is too short to hold a header.
    #[error("Truncated or missing header: {len} bytes (expected at least {expected})")]
    Header { len: usize, expected: usize },

    /// Header carries a format version this build does not read.
    #[error("Unsupported format version: {found} (expected {expected})")]
    Version { found: u8, expected: u8 },

    /// Declared payload length exceeds the bytes actually stored.
    #[error("Payload length mismatch: expected {expected} bytes, got {actual}")]
    Size { expected: u32, actual: usize },

    /// Any failure on the load path for a key.
    #[error("Failed to load cache entry '{key}': {source}")]
    Load {
        key: String,
        #[source]
        source: Box<Error>,
    },

    /// Any failure on the save path for a key.
    #[error("Failed to save cache entry '{key}': {source}")]
    Save {
        key: String,
        #[source]
        source: Box<Error>,
    },

    /// Cache configuration is invalid.
    #[error("Invalid configuration: {reason}")]
    Configuration { reason: String },

    /// Key cannot be used as a filename.
    #[error("Invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },
}

impl Error {
    /// Create a Header error.
    pub fn header(len: usize, expected: usize) -> Self {
        Error::Header { len, expected }
    }

    /// Create a Version error.
    pub fn version(found: u8, expected: u8) -> Self {
        Error::Version { found, expected }
    }

    /// Create a Size error.
    pub fn size(expected: u32, actual: usize) -> Self {
        Error::Size { expected, actual }
    }

    /// Wrap an error as a Load error for `key`.
    pub fn load(key: impl Into<String>, source: Error) -> Self {
        Error::Load {
            key: key.into(),
            source: Box::new(source),
        }
    }

    /// Wrap an error as a Save error for `key`.
    pub fn save(key: impl Into<String>, source: Error) -> Self {
        Error::Save {
            key: key.into(),
            source: Box::new(source),
        }
    }

    /// Create a Configuration error.
    pub fn configuration(reason: impl Into<String>) -> Self {
        Error::Configuration {
            reason: reason.into(),
        }
    }

    /// Create an InvalidKey error.
    pub fn invalid_key(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidKey {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// The key carried by a Load or Save error.
    pub fn key(&self) -> Option<&str> {
        match self {
            Error::Load { key, .. } | Error::Save { key, .. } => Some(key),
            Error::InvalidKey { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Whether this is an I/O error of kind `NotFound`.
    pub(crate) fn is_not_found(&self) -> bool {
        matches!(self, Error::Io { source } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Self {
        Error::Io { source: err.error }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_error_carries_key_and_source() {
        let err = Error::load("config.json", Error::size(10, 4));
        assert_eq!(err.key(), Some("config.json"));
        assert!(matches!(
            err,
            Error::Load { ref source, .. } if matches!(**source, Error::Size { expected: 10, actual: 4 })
        ));
        let msg = err.to_string();
        assert!(msg.contains("config.json"));
        assert!(msg.contains("expected 10 bytes, got 4"));
    }

    #[test]
    fn test_save_error_display() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = Error::save("k", io.into());
        assert_eq!(err.key(), Some("k"));
        assert!(err.to_string().starts_with("Failed to save cache entry 'k'"));
    }

    #[test]
    fn test_not_found_detection() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(Error::from(io).is_not_found());
        assert!(!Error::version(2, 1).is_not_found());
    }
}
