//! # machscope-core
//!
//! Decoding of Mach object containers into an inspectable data model.
//!
//! This crate reads single-architecture Mach-O files and universal ("fat")
//! containers from any `Read + Seek` source and produces one
//! [`BinaryObject`] per architecture slice:
//! - Architecture metadata (CPU type/subtype, file type, bit width, byte order)
//! - Memory layout (segments and the sections a viewer cares about)
//! - The primary symbol table and the stub-linked dynamic symbol table
//! - Load metadata (linked libraries, UUID, minimum OS version, entry point)
//!
//! ## Hostile input
//!
//! Input is treated as untrusted. Every read is bounds-checked and reported
//! as a [`DecodeError`]; counts taken from the file never drive up-front
//! allocations. Section content is a window into one shared copy of the
//! input, so repeated or overlapping headers cost no extra memory. Unknown
//! load commands and dangling symbol indices are not errors; they show up in
//! [`BinaryObject::diagnostics`].
//!
//! ## Example
//!
//! ```rust
//! let bytes = std::fs::read("/bin/ls").unwrap_or_default();
//! if machscope_core::detect_bytes(&bytes) {
//!     for object in machscope_core::parse_bytes(&bytes).unwrap() {
//!         println!("{} {}", object.cpu_type(), object.file_type());
//!     }
//! }
//! ```

use std::io::Cursor;

pub mod error;
pub mod format;
pub mod prelude;
pub mod reader;
pub mod types;

mod demangle;

// Re-export commonly used types
pub use error::{DecodeError, DecodeResult};
pub use format::{DecodeOptions, Format, MachO, StubSize};
pub use reader::Reader;
pub use types::{BinaryObject, Section, SectionType, SymbolEntry, SymbolTable};

/// Whether `bytes` start with a Mach-O or universal magic.
pub fn detect_bytes(bytes: &[u8]) -> bool
{
    MachO::new().detect(&mut Reader::new(Cursor::new(bytes)))
}

/// Decode every slice in `bytes` with default options.
///
/// ## Errors
///
/// Fails if the input is not a Mach object container or ends early.
pub fn parse_bytes(bytes: &[u8]) -> DecodeResult<Vec<BinaryObject>>
{
    MachO::new().parse(&mut Reader::new(Cursor::new(bytes)))
}
