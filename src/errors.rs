//! Error taxonomy for header encoding and decoding.

use std::io;
use thiserror::Error;

/// Errors raised while encoding or decoding archive headers.
///
/// Every failure surfaces to the caller; the codecs never retry I/O or
/// swallow a bad record. A checksum or signature failure means the archive
/// is corrupt or mis-framed, and traversal should stop at that record.
#[derive(Error, Debug)]
pub enum HeaderError {
    /// The stored tar checksum disagrees with the sum of the block
    /// contents. Both sides are carried in their 8-hex-digit forms.
    #[error("tar header checksum mismatch: stored {stored}, computed {computed}")]
    ChecksumMismatch { stored: String, computed: String },

    /// The path cannot be stored within the tar header name fields.
    ///
    /// Raised before any bytes are emitted.
    #[error("path {path:?} does not fit the tar header name fields")]
    PathTooLong { path: String },

    /// The type tag `7` is reserved and not accepted.
    #[error("record {name:?} carries the reserved type flag")]
    ReservedType { name: String },

    /// The block or character file could not supply the requested bytes.
    #[error("short read: wanted {wanted} bytes, got {got}")]
    ShortRead { wanted: usize, got: usize },

    /// The end-of-central-directory signature was absent at the expected
    /// position.
    #[error("end of central directory signature not found")]
    BadSignature,

    /// A numeric field held something other than a tar numeral, or the
    /// value does not fit the field's on-disk width.
    #[error("bad numeral in field {field}: {reason}")]
    BadNumeral { field: &'static str, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<HeaderError> for io::Error {
    fn from(e: HeaderError) -> io::Error {
        match e {
            HeaderError::Io(inner) => inner,
            HeaderError::ShortRead { .. } => {
                io::Error::new(io::ErrorKind::UnexpectedEof, e.to_string())
            }
            _ => io::Error::new(io::ErrorKind::InvalidData, e.to_string()),
        }
    }
}
