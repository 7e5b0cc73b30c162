//! # Container Formats
//!
//! Decoders for executable container formats.
//!
//! Every decoder implements the [`Format`] trait: a cheap, side-effect free
//! `detect` that sniffs the leading bytes, and a `parse` that either returns
//! every object in the container or fails as a whole.
//!
//! - **macho**: Mach-O, including universal ("fat") containers

use std::io::{Read, Seek};

use crate::error::DecodeResult;
use crate::reader::Reader;
use crate::types::BinaryObject;

pub mod macho;

pub use macho::{DecodeOptions, MachO, StubSize};

/// Detect/parse contract shared by container decoders.
///
/// ## Lifecycle
///
/// 1. `detect(reader)`: never fails; a read shortfall means "not this format"
/// 2. `parse(reader)`: all-or-nothing; any truncation discards every object
///
/// Both start from the beginning of the stream regardless of the reader's
/// current position.
pub trait Format
{
    /// Short format name for logs and user output.
    fn name(&self) -> &'static str;

    /// Whether the stream looks like this format.
    fn detect<R: Read + Seek>(&self, reader: &mut Reader<R>) -> bool;

    /// Decode every object in the container.
    ///
    /// ## Errors
    ///
    /// Returns [`DecodeError::TruncatedInput`](crate::error::DecodeError::TruncatedInput)
    /// if any read runs past the end of the input, and
    /// [`DecodeError::UnsupportedMagic`](crate::error::DecodeError::UnsupportedMagic)
    /// if the stream is not of this format.
    fn parse<R: Read + Seek>(&self, reader: &mut Reader<R>) -> DecodeResult<Vec<BinaryObject>>;
}
