//! Slice context and the fixed `mach_header`.

use std::io::{Read, Seek};

use tracing::trace;

use super::constants::{MH_MAGIC, MH_MAGIC_64, MH_MAGIC_64_BE, MH_MAGIC_BE};
use crate::error::{DecodeError, DecodeResult};
use crate::reader::Reader;
use crate::types::arch::CPU_SUBTYPE_MASK;
use crate::types::{Bitness, CpuSubType, CpuType, Endian, FileType};

/// Width and byte order of one slice plus where it starts in the input.
///
/// Decided once from the slice magic and passed to every width-sensitive
/// read of that slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceContext
{
    pub bitness: Bitness,
    pub endian: Endian,
    /// Offset of the slice within the whole input
    pub base: u64,
}

impl SliceContext
{
    /// Classify a single-architecture magic (read little-endian).
    pub fn from_magic(magic: u32, base: u64) -> Option<Self>
    {
        let (bitness, endian) = match magic {
            MH_MAGIC => (Bitness::Bits32, Endian::Little),
            MH_MAGIC_64 => (Bitness::Bits64, Endian::Little),
            MH_MAGIC_BE => (Bitness::Bits32, Endian::Big),
            MH_MAGIC_64_BE => (Bitness::Bits64, Endian::Big),
            _ => return None,
        };
        Some(Self { bitness, endian, base })
    }

    /// Convert a slice-relative offset into a whole-file offset.
    pub fn file_offset(&self, relative: u64) -> u64
    {
        self.base.saturating_add(relative)
    }

    /// Size of the fixed header including the magic.
    pub fn header_size(&self) -> u64
    {
        match self.bitness {
            Bitness::Bits32 => 28,
            Bitness::Bits64 => 32,
        }
    }
}

/// The fixed header following the magic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachHeader
{
    pub magic: u32,
    pub cpu_type: CpuType,
    pub cpu_subtype: CpuSubType,
    pub file_type: FileType,
    /// Number of load commands
    pub ncmds: u32,
    /// Total byte size of the load commands
    pub sizeofcmds: u32,
    pub flags: u32,
}

impl MachHeader
{
    /// Whole-file offset where the load commands should end according to
    /// `sizeofcmds`.
    pub fn commands_end(&self, context: &SliceContext) -> u64
    {
        context.file_offset(context.header_size().saturating_add(u64::from(self.sizeofcmds)))
    }
}

/// Read the magic and header of the slice starting at `base`.
///
/// Leaves the reader switched to the slice's byte order and positioned at the
/// first load command.
pub fn read_header<R: Read + Seek>(reader: &mut Reader<R>, base: u64) -> DecodeResult<(SliceContext, MachHeader)>
{
    reader.seek(base)?;
    reader.set_endian(Endian::Little);
    let magic = reader.read_u32()?;
    let context = SliceContext::from_magic(magic, base).ok_or(DecodeError::UnsupportedMagic(magic))?;

    reader.set_endian(context.endian);
    let raw_cputype = reader.read_u32()?;
    let raw_cpusubtype = reader.read_u32()?;
    let raw_filetype = reader.read_u32()?;
    let ncmds = reader.read_u32()?;
    let sizeofcmds = reader.read_u32()?;
    let flags = reader.read_u32()?;
    if context.bitness == Bitness::Bits64 {
        // reserved
        reader.read_u32()?;
    }

    let cpu_type = CpuType::from_raw(raw_cputype);
    let subtype_bits = match context.bitness {
        Bitness::Bits64 => raw_cpusubtype & !CPU_SUBTYPE_MASK,
        Bitness::Bits32 => raw_cpusubtype,
    };
    let cpu_subtype = CpuSubType::from_raw(cpu_type, subtype_bits);
    let file_type = FileType::from_raw(raw_filetype);

    trace!(
        "slice header at 0x{base:x}: {} {} cpu={cpu_type} subtype={cpu_subtype} filetype={file_type} ncmds={ncmds}",
        context.bitness,
        context.endian
    );

    Ok((
        context,
        MachHeader {
            magic,
            cpu_type,
            cpu_subtype,
            file_type,
            ncmds,
            sizeofcmds,
            flags,
        },
    ))
}
