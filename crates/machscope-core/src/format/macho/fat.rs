//! Universal ("fat") container directory.

use std::io::{Read, Seek};

use tracing::{trace, warn};

use crate::error::DecodeResult;
use crate::reader::Reader;
use crate::types::Endian;

/// Where one architecture slice lives inside a universal container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FatArch
{
    pub offset: u32,
    /// Advisory; a slice is decoded from its own header regardless.
    pub size: u32,
    /// Power of two the offset should be aligned to
    pub align: u32,
}

impl FatArch
{
    /// Whether `offset` honours the declared `2^align` alignment.
    pub fn is_aligned(&self) -> bool
    {
        1u32.checked_shl(self.align).is_some_and(|alignment| self.offset % alignment == 0)
    }
}

/// Read `nfat_arch` and the directory records that follow the magic.
///
/// The directory is always big-endian. The per-entry CPU fields are read and
/// dropped; each slice reports its own architecture.
pub fn read_directory<R: Read + Seek>(reader: &mut Reader<R>) -> DecodeResult<Vec<FatArch>>
{
    reader.set_endian(Endian::Big);
    let count = reader.read_u32()?;
    trace!("universal container declares {count} slices");

    let mut arches = Vec::new();
    for _ in 0..count {
        let _cputype = reader.read_u32()?;
        let _cpusubtype = reader.read_u32()?;
        let offset = reader.read_u32()?;
        let size = reader.read_u32()?;
        let align = reader.read_u32()?;
        let arch = FatArch { offset, size, align };
        trace!("slice at 0x{offset:x}, 0x{size:x} bytes, align 2^{align}");
        if !arch.is_aligned() {
            warn!("slice at 0x{offset:x} is not aligned to 2^{align}");
        }
        arches.push(arch);
    }
    Ok(arches)
}
