//! # Mach-O
//!
//! Decoder for single-architecture Mach-O files and universal containers.
//!
//! ## Pipeline
//!
//! 1. **Detect**: the first four bytes (read little-endian) must be one of six
//!    magics
//! 2. **Fan out**: a universal container lists `(offset, size)` slices in a
//!    big-endian directory; a plain file is one slice at offset 0
//! 3. **Describe**: each slice header and its load commands become a
//!    [`SliceLayout`](layout::SliceLayout)
//! 4. **Materialize**: symbol tables and section bytes are read, then names
//!    and stub addresses resolved
//!
//! Any truncated read fails the whole call. Unknown load commands and dangling
//! symbol indices do not; they are kept as diagnostics on the object.

use std::fmt;
use std::io::{Read, Seek};
use std::str::FromStr;

use tracing::debug;

use super::Format;
use crate::error::{DecodeError, DecodeResult, ParseStubSizeError};
use crate::reader::Reader;
use crate::types::{BinaryObject, CpuType, Endian};

pub mod commands;
pub mod constants;
pub mod fat;
pub mod header;
pub mod layout;
pub mod materialize;

use constants::{FAT_CIGAM, FAT_MAGIC, LEGACY_STUB_SIZE, MAGICS};

/// How the distance between consecutive symbol stubs is chosen.
///
/// Stub sizes differ per architecture (x86-64 `jmp *` stubs are 6 bytes,
/// arm64 stubs 12), and the stub section records its own size in `reserved2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StubSize
{
    /// Always 6 bytes
    #[default]
    Legacy,
    /// A fixed byte count
    Fixed(u64),
    /// `reserved2` of the stub section, or 6 when it is zero or missing
    FromSection,
    /// A per-CPU table
    PerArchitecture,
}

impl StubSize
{
    /// Stub entry size for a slice of `cpu` whose stub section declared
    /// `reserved2`.
    pub fn resolve(self, cpu: CpuType, reserved2: Option<u32>) -> u64
    {
        match self {
            StubSize::Legacy => LEGACY_STUB_SIZE,
            StubSize::Fixed(size) => size,
            StubSize::FromSection => match reserved2 {
                Some(size) if size > 0 => u64::from(size),
                _ => LEGACY_STUB_SIZE,
            },
            StubSize::PerArchitecture => match cpu {
                CpuType::Arm | CpuType::Arm64 | CpuType::Arm64_32 => 12,
                CpuType::PowerPc | CpuType::PowerPc64 => 20,
                _ => LEGACY_STUB_SIZE,
            },
        }
    }
}

impl FromStr for StubSize
{
    type Err = ParseStubSizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(StubSize::Legacy),
            "section" => Ok(StubSize::FromSection),
            "arch" => Ok(StubSize::PerArchitecture),
            other => other
                .parse::<u64>()
                .map(StubSize::Fixed)
                .map_err(|_| ParseStubSizeError(s.to_string())),
        }
    }
}

impl fmt::Display for StubSize
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            StubSize::Legacy => write!(f, "legacy"),
            StubSize::Fixed(size) => write!(f, "{size}"),
            StubSize::FromSection => write!(f, "section"),
            StubSize::PerArchitecture => write!(f, "arch"),
        }
    }
}

/// Decoder settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeOptions
{
    pub stub_size: StubSize,
}

/// The Mach-O container decoder.
///
/// Stateless apart from its options; one instance can decode any number of
/// inputs.
///
/// ```rust
/// use std::io::Cursor;
///
/// use machscope_core::format::{Format, MachO};
/// use machscope_core::reader::Reader;
///
/// let mut reader = Reader::new(Cursor::new(vec![0xCA, 0xFE]));
/// assert!(!MachO::new().detect(&mut reader));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MachO
{
    options: DecodeOptions,
}

impl MachO
{
    pub fn new() -> Self
    {
        Self::default()
    }

    pub fn with_options(options: DecodeOptions) -> Self
    {
        Self { options }
    }

    pub fn options(&self) -> &DecodeOptions
    {
        &self.options
    }

    /// Describe and materialize the slice starting at `base`.
    pub fn decode_slice<R: Read + Seek>(&self, reader: &mut Reader<R>, base: u64) -> DecodeResult<BinaryObject>
    {
        let layout = layout::describe_slice(reader, base)?;
        materialize::materialize(reader, layout, &self.options)
    }
}

fn read_magic<R: Read + Seek>(reader: &mut Reader<R>) -> DecodeResult<u32>
{
    reader.seek(0)?;
    reader.set_endian(Endian::Little);
    reader.read_u32()
}

impl Format for MachO
{
    fn name(&self) -> &'static str
    {
        "Mach-O"
    }

    fn detect<R: Read + Seek>(&self, reader: &mut Reader<R>) -> bool
    {
        let endian = reader.endian();
        let detected = read_magic(reader).is_ok_and(|magic| MAGICS.contains(&magic));
        reader.set_endian(endian);
        detected
    }

    fn parse<R: Read + Seek>(&self, reader: &mut Reader<R>) -> DecodeResult<Vec<BinaryObject>>
    {
        let magic = read_magic(reader)?;

        if magic == FAT_MAGIC || magic == FAT_CIGAM {
            let arches = fat::read_directory(reader)?;
            debug!("universal container with {} slices", arches.len());
            return arches
                .iter()
                .map(|arch| self.decode_slice(reader, u64::from(arch.offset)))
                .collect();
        }

        if !MAGICS.contains(&magic) {
            return Err(DecodeError::UnsupportedMagic(magic));
        }

        debug!("single-architecture slice");
        Ok(vec![self.decode_slice(reader, 0)?])
    }
}
