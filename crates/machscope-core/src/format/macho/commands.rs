//! Load command decoding.
//!
//! Every command starts with `{cmd, cmdsize}`. The tag selects a decoder from
//! [`decoder_for`]; tags without a decoder become [`LoadCommand::Unknown`].
//! Whatever the decoder consumed, [`read_load_command`] finishes by seeking to
//! `command_start + cmdsize`, so a short or unfamiliar command never
//! desynchronizes the stream.

use std::io::{Read, Seek};

use tracing::trace;

use super::constants::*;
use super::header::SliceContext;
use crate::error::DecodeResult;
use crate::reader::{c_string, Reader};
use crate::types::{
    Address, Bitness, DylibKind, DylibReference, EntryPoint, MinimumVersion, Protection, Segment, SourceVersion,
    Version,
};

/// The `{cmd, cmdsize}` prefix plus where the command starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandHeader
{
    pub tag: u32,
    pub size: u32,
    /// Whole-file offset of the first byte of the command
    pub offset: u64,
}

impl CommandHeader
{
    /// Declared size, raised to the 8-byte minimum so the loop always advances.
    pub fn effective_size(&self) -> u64
    {
        u64::from(self.size.max(LOAD_COMMAND_HEADER_SIZE))
    }

    pub fn is_undersized(&self) -> bool
    {
        self.size < LOAD_COMMAND_HEADER_SIZE
    }

    /// Offset of the next command.
    pub fn next_offset(&self) -> u64
    {
        self.offset.saturating_add(self.effective_size())
    }

    /// Bytes of the command from `relative` to its end.
    fn remaining_from(&self, relative: u32) -> u64
    {
        u64::from(self.size.saturating_sub(relative))
    }
}

/// One section header inside a segment command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionHeader
{
    pub section_name: String,
    pub segment_name: String,
    pub address: u64,
    pub size: u64,
    /// Slice-relative file offset
    pub offset: u32,
    pub align: u32,
    pub reloc_offset: u32,
    pub reloc_count: u32,
    pub flags: u32,
    pub reserved1: u32,
    /// Stub entry size for symbol-stub sections
    pub reserved2: u32,
}

/// A segment command and its section headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentCommand
{
    pub segment: Segment,
    pub sections: Vec<SectionHeader>,
}

/// `LC_SYMTAB` fields, slice-relative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymtabCommand
{
    pub symoff: u32,
    pub nsyms: u32,
    pub stroff: u32,
    pub strsize: u32,
}

/// Indirect symbol table location from `LC_DYSYMTAB`, slice-relative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndirectSymbols
{
    pub offset: u32,
    pub count: u32,
}

/// A decoded load command.
///
/// Commands whose content is only consumed to stay aligned decode to
/// [`LoadCommand::Consumed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadCommand
{
    Segment(SegmentCommand),
    Symtab(SymtabCommand),
    Dysymtab(IndirectSymbols),
    Dylib(DylibReference),
    Dylinker(String),
    DyldEnvironment(String),
    Rpath(String),
    Uuid([u8; 16]),
    MinimumVersion(MinimumVersion),
    SourceVersion(SourceVersion),
    Main(EntryPoint),
    /// `(offset, size)` of a blob in `__LINKEDIT`
    LinkEditData
    {
        tag: u32,
        offset: u32,
        size: u32,
    },
    Consumed,
    Unknown,
}

type CommandDecoder<R> = fn(&mut Reader<R>, &CommandHeader, &SliceContext) -> DecodeResult<LoadCommand>;

/// Decoder for a tag, or `None` when the tag is not recognized.
pub fn decoder_for<R: Read + Seek>(tag: u32) -> Option<CommandDecoder<R>>
{
    let decoder: CommandDecoder<R> = match tag {
        LC_SEGMENT | LC_SEGMENT_64 => decode_segment,
        LC_SYMTAB => decode_symtab,
        LC_DYSYMTAB => decode_dysymtab,
        LC_DYLD_INFO | LC_DYLD_INFO_ONLY => decode_dyld_info,
        LC_LOAD_DYLIB | LC_ID_DYLIB | LC_LOAD_WEAK_DYLIB | LC_REEXPORT_DYLIB | LC_LAZY_LOAD_DYLIB
        | LC_LOAD_UPWARD_DYLIB => decode_dylib,
        LC_LOAD_DYLINKER | LC_DYLD_ENVIRONMENT | LC_RPATH => decode_path,
        LC_UUID => decode_uuid,
        LC_VERSION_MIN_MACOSX | LC_VERSION_MIN_IPHONEOS | LC_VERSION_MIN_TVOS | LC_VERSION_MIN_WATCHOS => {
            decode_version_min
        }
        LC_BUILD_VERSION => decode_build_version,
        LC_SOURCE_VERSION => decode_source_version,
        LC_MAIN => decode_main,
        LC_FUNCTION_STARTS
        | LC_CODE_SIGNATURE
        | LC_SEGMENT_SPLIT_INFO
        | LC_DYLIB_CODE_SIGN_DRS
        | LC_DYLD_EXPORTS_TRIE
        | LC_DYLD_CHAINED_FIXUPS => decode_linkedit_data,
        LC_DATA_IN_CODE => decode_data_in_code,
        LC_THREAD | LC_UNIXTHREAD => decode_thread,
        _ => return None,
    };
    Some(decoder)
}

/// Read the command at the reader's position and leave the reader at the
/// start of the next one.
pub fn read_load_command<R: Read + Seek>(
    reader: &mut Reader<R>,
    context: &SliceContext,
) -> DecodeResult<(CommandHeader, LoadCommand)>
{
    let offset = reader.position()?;
    let tag = reader.read_u32()?;
    let size = reader.read_u32()?;
    let header = CommandHeader { tag, size, offset };

    trace!("{} (0x{tag:x}) at 0x{offset:x}, {size} bytes", command_name(tag));

    let command = match decoder_for::<R>(tag) {
        Some(decode) => decode(reader, &header, context)?,
        None => LoadCommand::Unknown,
    };

    reader.seek(header.next_offset())?;
    Ok((header, command))
}

fn decode_segment<R: Read + Seek>(
    reader: &mut Reader<R>,
    _header: &CommandHeader,
    context: &SliceContext,
) -> DecodeResult<LoadCommand>
{
    let bitness = context.bitness;
    let name = reader.read_name16()?;
    let vmaddr = reader.read_word(bitness)?;
    let vmsize = reader.read_word(bitness)?;
    let fileoff = reader.read_word(bitness)?;
    let filesize = reader.read_word(bitness)?;
    let maxprot = reader.read_u32()?;
    let initprot = reader.read_u32()?;
    let nsects = reader.read_u32()?;
    let flags = reader.read_u32()?;

    let mut sections = Vec::new();
    for _ in 0..nsects {
        let section_name = reader.read_name16()?;
        let segment_name = reader.read_name16()?;
        let address = reader.read_word(bitness)?;
        let size = reader.read_word(bitness)?;
        let offset = reader.read_u32()?;
        let align = reader.read_u32()?;
        let reloc_offset = reader.read_u32()?;
        let reloc_count = reader.read_u32()?;
        let flags = reader.read_u32()?;
        let reserved1 = reader.read_u32()?;
        let reserved2 = reader.read_u32()?;
        if bitness == Bitness::Bits64 {
            // reserved3
            reader.read_u32()?;
        }

        sections.push(SectionHeader {
            section_name,
            segment_name,
            address,
            size,
            offset,
            align,
            reloc_offset,
            reloc_count,
            flags,
            reserved1,
            reserved2,
        });
    }

    Ok(LoadCommand::Segment(SegmentCommand {
        segment: Segment {
            name,
            address: Address::new(vmaddr),
            vm_size: vmsize,
            file_offset: context.file_offset(fileoff),
            file_size: filesize,
            max_protection: Protection(maxprot),
            initial_protection: Protection(initprot),
            section_count: nsects,
            flags,
        },
        sections,
    }))
}

fn decode_symtab<R: Read + Seek>(
    reader: &mut Reader<R>,
    _header: &CommandHeader,
    _context: &SliceContext,
) -> DecodeResult<LoadCommand>
{
    Ok(LoadCommand::Symtab(SymtabCommand {
        symoff: reader.read_u32()?,
        nsyms: reader.read_u32()?,
        stroff: reader.read_u32()?,
        strsize: reader.read_u32()?,
    }))
}

fn decode_dysymtab<R: Read + Seek>(
    reader: &mut Reader<R>,
    _header: &CommandHeader,
    _context: &SliceContext,
) -> DecodeResult<LoadCommand>
{
    // ilocalsym, nlocalsym, iextdefsym, nextdefsym, iundefsym, nundefsym,
    // tocoff, ntoc, modtaboff, nmodtab, extrefsymoff, nextrefsyms
    for _ in 0..12 {
        reader.read_u32()?;
    }
    let offset = reader.read_u32()?;
    let count = reader.read_u32()?;
    // extreloff, nextrel, locreloff, nlocrel
    for _ in 0..4 {
        reader.read_u32()?;
    }
    Ok(LoadCommand::Dysymtab(IndirectSymbols { offset, count }))
}

fn decode_dyld_info<R: Read + Seek>(
    reader: &mut Reader<R>,
    _header: &CommandHeader,
    _context: &SliceContext,
) -> DecodeResult<LoadCommand>
{
    for table in ["rebase", "bind", "weak bind", "lazy bind", "export"] {
        let offset = reader.read_u32()?;
        let size = reader.read_u32()?;
        trace!("dyld {table} info: offset=0x{offset:x} size={size}");
    }
    Ok(LoadCommand::Consumed)
}

/// Read an `lc_str` path: `name_offset` is relative to the command start and
/// the string runs to the end of the command.
fn read_command_string<R: Read + Seek>(
    reader: &mut Reader<R>,
    header: &CommandHeader,
    name_offset: u32,
) -> DecodeResult<String>
{
    let len = header.remaining_from(name_offset);
    if len == 0 {
        return Ok(String::new());
    }
    reader.seek(header.offset.saturating_add(u64::from(name_offset)))?;
    let raw = reader.read_bytes(len)?;
    Ok(c_string(&raw))
}

fn decode_dylib<R: Read + Seek>(
    reader: &mut Reader<R>,
    header: &CommandHeader,
    _context: &SliceContext,
) -> DecodeResult<LoadCommand>
{
    let name_offset = reader.read_u32()?;
    let timestamp = reader.read_u32()?;
    let current_version = Version(reader.read_u32()?);
    let compatibility_version = Version(reader.read_u32()?);
    let path = read_command_string(reader, header, name_offset)?;

    let kind = match header.tag {
        LC_ID_DYLIB => DylibKind::Id,
        LC_LOAD_WEAK_DYLIB => DylibKind::Weak,
        LC_REEXPORT_DYLIB => DylibKind::Reexport,
        LC_LAZY_LOAD_DYLIB => DylibKind::Lazy,
        LC_LOAD_UPWARD_DYLIB => DylibKind::Upward,
        _ => DylibKind::Load,
    };

    Ok(LoadCommand::Dylib(DylibReference {
        kind,
        path,
        timestamp,
        current_version,
        compatibility_version,
    }))
}

fn decode_path<R: Read + Seek>(
    reader: &mut Reader<R>,
    header: &CommandHeader,
    _context: &SliceContext,
) -> DecodeResult<LoadCommand>
{
    let name_offset = reader.read_u32()?;
    let path = read_command_string(reader, header, name_offset)?;
    Ok(match header.tag {
        LC_LOAD_DYLINKER => LoadCommand::Dylinker(path),
        LC_DYLD_ENVIRONMENT => LoadCommand::DyldEnvironment(path),
        _ => LoadCommand::Rpath(path),
    })
}

fn decode_uuid<R: Read + Seek>(
    reader: &mut Reader<R>,
    _header: &CommandHeader,
    _context: &SliceContext,
) -> DecodeResult<LoadCommand>
{
    let raw = reader.read_bytes(16)?;
    let mut uuid = [0u8; 16];
    uuid.copy_from_slice(&raw);
    Ok(LoadCommand::Uuid(uuid))
}

fn decode_version_min<R: Read + Seek>(
    reader: &mut Reader<R>,
    header: &CommandHeader,
    _context: &SliceContext,
) -> DecodeResult<LoadCommand>
{
    let version = Version(reader.read_u32()?);
    let sdk = Version(reader.read_u32()?);
    let platform = match header.tag {
        LC_VERSION_MIN_MACOSX => "macos",
        LC_VERSION_MIN_IPHONEOS => "ios",
        LC_VERSION_MIN_TVOS => "tvos",
        _ => "watchos",
    };
    Ok(LoadCommand::MinimumVersion(MinimumVersion {
        platform: platform.to_string(),
        version,
        sdk,
    }))
}

fn decode_build_version<R: Read + Seek>(
    reader: &mut Reader<R>,
    _header: &CommandHeader,
    _context: &SliceContext,
) -> DecodeResult<LoadCommand>
{
    let platform = reader.read_u32()?;
    let version = Version(reader.read_u32()?);
    let sdk = Version(reader.read_u32()?);
    // Tool entries follow `ntools`; they are skipped with the rest of the command.
    let ntools = reader.read_u32()?;
    trace!("build version lists {ntools} tools");
    Ok(LoadCommand::MinimumVersion(MinimumVersion {
        platform: platform_name(platform),
        version,
        sdk,
    }))
}

fn decode_source_version<R: Read + Seek>(
    reader: &mut Reader<R>,
    _header: &CommandHeader,
    _context: &SliceContext,
) -> DecodeResult<LoadCommand>
{
    Ok(LoadCommand::SourceVersion(SourceVersion(reader.read_u64()?)))
}

fn decode_main<R: Read + Seek>(
    reader: &mut Reader<R>,
    _header: &CommandHeader,
    _context: &SliceContext,
) -> DecodeResult<LoadCommand>
{
    let file_offset = reader.read_u64()?;
    let stack_size = reader.read_u64()?;
    Ok(LoadCommand::Main(EntryPoint { file_offset, stack_size }))
}

fn decode_linkedit_data<R: Read + Seek>(
    reader: &mut Reader<R>,
    header: &CommandHeader,
    _context: &SliceContext,
) -> DecodeResult<LoadCommand>
{
    let offset = reader.read_u32()?;
    let size = reader.read_u32()?;
    Ok(LoadCommand::LinkEditData {
        tag: header.tag,
        offset,
        size,
    })
}

fn decode_data_in_code<R: Read + Seek>(
    reader: &mut Reader<R>,
    _header: &CommandHeader,
    _context: &SliceContext,
) -> DecodeResult<LoadCommand>
{
    let offset = reader.read_u32()?;
    let length = reader.read_u16()?;
    let kind = reader.read_u16()?;
    trace!("data in code: offset=0x{offset:x} length={length} kind={kind}");
    Ok(LoadCommand::Consumed)
}

fn decode_thread<R: Read + Seek>(
    reader: &mut Reader<R>,
    header: &CommandHeader,
    _context: &SliceContext,
) -> DecodeResult<LoadCommand>
{
    let flavor = reader.read_u32()?;
    let count = reader.read_u32()?;
    // `count` is in 32-bit words; never read past the command itself.
    let state_len = (u64::from(count) * 4).min(header.remaining_from(16));
    reader.read_bytes(state_len)?;
    trace!("thread state: flavor={flavor} count={count}");
    Ok(LoadCommand::Consumed)
}
