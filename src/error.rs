//! Error types for the ATOM BIOS scanner.
//!
//! Structural lookups (header, master table, sub-tables) never fail with an
//! error: a malformed image simply yields `None` or an empty list. The errors
//! here cover field access, file loading and configuration.

use thiserror::Error;

/// Primary error type for the scanner.
#[derive(Debug, Error)]
pub enum AtomError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The image is too small to contain an ATOM BIOS.
    #[error("Image too small: expected at least {expected} bytes, got {actual}")]
    FileTooSmall { expected: usize, actual: usize },

    /// A field access would run past the end of the buffer.
    #[error("Field at offset 0x{offset:X} ({width} bytes) exceeds image length 0x{len:X}")]
    OutOfBounds {
        offset: usize,
        width: usize,
        len: usize,
    },

    /// The value cannot be encoded in the requested field width.
    #[error("Value {value} (0x{value:X}) does not fit in a {bits}-bit field")]
    ValueTooWide { value: u32, bits: u32 },

    /// An offset string could not be parsed or resolved.
    #[error("Invalid offset '{input}': {message}")]
    InvalidOffset { input: String, message: String },

    /// No ATOM header was found in the image.
    #[error("ATOM header not found")]
    HeaderNotFound,

    /// Configuration error.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },
}

/// Result type alias for scanner operations.
pub type Result<T> = std::result::Result<T, AtomError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AtomError::FileTooSmall {
            expected: 0x40200,
            actual: 16,
        };
        assert!(err.to_string().contains("262656"));
        assert!(err.to_string().contains("16"));
    }

    #[test]
    fn test_out_of_bounds_hex() {
        let err = AtomError::OutOfBounds {
            offset: 0x4FFFF,
            width: 2,
            len: 0x50000,
        };
        let msg = err.to_string();
        assert!(msg.contains("0x4FFFF"));
        assert!(msg.contains("0x50000"));
    }

    #[test]
    fn test_value_too_wide() {
        let err = AtomError::ValueTooWide {
            value: 0x1FF,
            bits: 8,
        };
        assert!(err.to_string().contains("1FF"));
    }
}
