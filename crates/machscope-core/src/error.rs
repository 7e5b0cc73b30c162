//! # Error Types
//!
//! Error handling for container decoding.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.
//!
//! Only conditions that make the input undecodable are errors. Anomalies the
//! decoder can step over (unknown load commands, dangling symbol indices) are
//! reported as [`Diagnostic`](crate::types::Diagnostic) values on the decoded
//! object instead.

use std::io;

use thiserror::Error;

/// Main error type for decode operations
///
/// ## Error Categories
///
/// 1. **Input errors**: TruncatedInput (the stream ended before a read completed)
/// 2. **Format errors**: UnsupportedMagic (the bytes are not a Mach object container)
/// 3. **I/O errors**: Io (the underlying source failed for a reason other than EOF)
///
/// A failed decode discards every object decoded so far in the same call.
#[derive(Error, Debug)]
pub enum DecodeError
{
    /// A fixed-width or counted read ran past the end of the input
    ///
    /// `offset` is the absolute stream position where the read started and
    /// `wanted` the number of bytes that were requested.
    #[error("Truncated input: wanted {wanted} bytes at offset 0x{offset:x}")]
    TruncatedInput
    {
        /// Absolute stream position of the failed read
        offset: u64,
        /// Number of bytes requested
        wanted: u64,
    },

    /// The magic value matches none of the recognized container magics
    ///
    /// Callers normally run detection first, so this is only seen when a
    /// universal directory points at something that is not a Mach-O slice, or
    /// when `parse` is invoked on arbitrary bytes.
    #[error("Unsupported magic: 0x{0:08x}")]
    UnsupportedMagic(u32),

    /// I/O error from the underlying byte source
    ///
    /// End-of-file conditions are never reported here; they become
    /// [`DecodeError::TruncatedInput`].
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl DecodeError
{
    /// Classify an I/O error raised by a read of `wanted` bytes at `offset`.
    pub(crate) fn from_read(err: io::Error, offset: u64, wanted: u64) -> Self
    {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            DecodeError::TruncatedInput { offset, wanted }
        } else {
            DecodeError::Io(err)
        }
    }

    /// Whether this error means the input ended early.
    #[must_use]
    pub fn is_truncation(&self) -> bool
    {
        matches!(self, DecodeError::TruncatedInput { .. })
    }
}

/// Convenience type alias for `Result<T, DecodeError>`
///
/// ```rust
/// use machscope_core::error::DecodeResult;
/// fn foo() -> DecodeResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;

/// A stub size setting that is neither a known mode nor a byte count.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid stub size '{0}': expected legacy, section, arch or a byte count")]
pub struct ParseStubSizeError(pub String);
