//! Errors raised while reading package containers and property sets.

use std::io;

use thiserror::Error;

/// Failures produced by the binary format readers.
///
/// Every malformed input maps to one of these variants; the readers never
/// panic or index past the end of a buffer.
#[derive(Debug, Error)]
pub enum FormatError {
    /// A container or property-set signature did not match.
    #[error("bad magic: expected {expected} signature")]
    BadMagic {
        /// Which signature was expected (`container` or `property set`).
        expected: &'static str,
    },
    /// The descriptor table holds no metadata (`0x1000`) entry.
    #[error("no metadata descriptor in container table")]
    MissingMetadata,
    /// A computed offset/length reaches past the end of the input.
    #[error("truncated input: {len} bytes at offset {offset} exceed {available} available")]
    Truncated {
        /// Start of the attempted read.
        offset: u64,
        /// Requested length.
        len: u64,
        /// Total bytes available in the input.
        available: u64,
    },
    /// The package file could not be read.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl FormatError {
    pub(crate) fn truncated(offset: u64, len: u64, available: u64) -> Self {
        FormatError::Truncated {
            offset,
            len,
            available,
        }
    }

    /// True for [`FormatError::Truncated`].
    pub fn is_truncated(&self) -> bool {
        matches!(self, FormatError::Truncated { .. })
    }
}

/// Result alias for format readers.
pub type FormatResult<T> = std::result::Result<T, FormatError>;
