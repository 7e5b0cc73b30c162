//! Decoded architecture slice and the load metadata attached to it.

use std::collections::HashMap;
use std::fmt;

use super::{
    Address, Bitness, CpuSubType, CpuType, Endian, FileType, Section, SectionType, Segment, SymbolTable,
    SymbolTableKind,
};

/// Packed `xxxx.yy.zz` version (nibble-packed `major << 16 | minor << 8 | patch`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Version(pub u32);

impl Version
{
    pub fn major(self) -> u32
    {
        self.0 >> 16
    }

    pub fn minor(self) -> u32
    {
        (self.0 >> 8) & 0xff
    }

    pub fn patch(self) -> u32
    {
        self.0 & 0xff
    }
}

impl fmt::Display for Version
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}.{}.{}", self.major(), self.minor(), self.patch())
    }
}

/// Source version packed as `a24.b10.c10.d10.e10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SourceVersion(pub u64);

impl SourceVersion
{
    /// The five components `[a, b, c, d, e]`.
    pub fn components(self) -> [u64; 5]
    {
        let v = self.0;
        [v >> 40, (v >> 30) & 0x3ff, (v >> 20) & 0x3ff, (v >> 10) & 0x3ff, v & 0x3ff]
    }
}

impl fmt::Display for SourceVersion
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let [a, b, c, d, e] = self.components();
        write!(f, "{a}.{b}.{c}.{d}.{e}")
    }
}

/// How a dynamic library is referenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DylibKind
{
    /// `LC_LOAD_DYLIB`
    Load,
    /// `LC_ID_DYLIB`: the library's own install name
    Id,
    /// `LC_LOAD_WEAK_DYLIB`
    Weak,
    /// `LC_REEXPORT_DYLIB`
    Reexport,
    /// `LC_LAZY_LOAD_DYLIB`
    Lazy,
    /// `LC_LOAD_UPWARD_DYLIB`
    Upward,
}

impl fmt::Display for DylibKind
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let label = match self {
            DylibKind::Load => "load",
            DylibKind::Id => "id",
            DylibKind::Weak => "weak",
            DylibKind::Reexport => "reexport",
            DylibKind::Lazy => "lazy",
            DylibKind::Upward => "upward",
        };
        write!(f, "{label}")
    }
}

/// A declared dynamic-library dependency. Only the declaration is recorded;
/// nothing is resolved on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DylibReference
{
    pub kind: DylibKind,
    pub path: String,
    pub timestamp: u32,
    pub current_version: Version,
    pub compatibility_version: Version,
}

/// Minimum deployment target from a version-min or build-version command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinimumVersion
{
    /// Platform name (`macos`, `ios`, ...). Raw number for unknown platforms.
    pub platform: String,
    pub version: Version,
    pub sdk: Version,
}

/// `LC_MAIN` entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryPoint
{
    /// Offset of `main` from the start of the `__TEXT` segment's file data
    pub file_offset: u64,
    /// Initial stack size, or zero for the default
    pub stack_size: u64,
}

/// Metadata recorded from load commands that do not produce sections.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoadInfo
{
    pub dylibs: Vec<DylibReference>,
    pub dylinker: Option<String>,
    pub dyld_environment: Vec<String>,
    pub rpaths: Vec<String>,
    pub uuid: Option<[u8; 16]>,
    pub minimum_version: Option<MinimumVersion>,
    pub source_version: Option<SourceVersion>,
    pub entry_point: Option<EntryPoint>,
}

impl LoadInfo
{
    /// UUID in the canonical `8-4-4-4-12` upper-case form.
    pub fn uuid_string(&self) -> Option<String>
    {
        self.uuid.map(|bytes| {
            let hex: Vec<String> = bytes.iter().map(|b| format!("{b:02X}")).collect();
            format!(
                "{}-{}-{}-{}-{}",
                hex[0..4].concat(),
                hex[4..6].concat(),
                hex[6..8].concat(),
                hex[8..10].concat(),
                hex[10..16].concat()
            )
        })
    }
}

/// A recoverable anomaly met while decoding a slice.
///
/// Diagnostics never fail a decode; they are kept so a viewer can tell the
/// user which parts of a damaged file were skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic
{
    /// A load command with a tag outside the known set was skipped via its
    /// declared size.
    UnrecognizedLoadCommand
    {
        tag: u32,
        /// Whole-file offset of the command
        offset: u64,
        size: u32,
    },
    /// A load command declared a size smaller than its own 8-byte header; the
    /// decoder advanced by 8 bytes instead.
    UndersizedLoadCommand
    {
        tag: u32,
        offset: u64,
        size: u32,
    },
    /// A symbol index pointed outside the table it refers to; the symbol was
    /// left with an empty name.
    UnresolvedSymbol
    {
        table: SymbolTableKind,
        /// Position of the symbol in its own table
        position: usize,
        /// The offending raw index
        index: u32,
    },
}

impl fmt::Display for Diagnostic
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Diagnostic::UnrecognizedLoadCommand { tag, offset, size } => {
                write!(f, "skipped unrecognized load command 0x{tag:x} ({size} bytes) at 0x{offset:x}")
            }
            Diagnostic::UndersizedLoadCommand { tag, offset, size } => {
                write!(f, "load command 0x{tag:x} at 0x{offset:x} declares {size} bytes")
            }
            Diagnostic::UnresolvedSymbol { table, position, index } => {
                write!(f, "{table} entry {position} has out-of-range index {index}")
            }
        }
    }
}

/// One decoded architecture slice.
///
/// Bit width and byte order come from the slice's own magic and never change.
/// The object is fully built by the decoder and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryObject
{
    bitness: Bitness,
    endian: Endian,
    cpu_type: CpuType,
    cpu_subtype: CpuSubType,
    file_type: FileType,
    flags: u32,
    base_offset: u64,
    sections: Vec<Section>,
    section_index: HashMap<SectionType, usize>,
    segments: Vec<Segment>,
    symbols: SymbolTable,
    dynamic_symbols: SymbolTable,
    load_info: LoadInfo,
    diagnostics: Vec<Diagnostic>,
}

impl BinaryObject
{
    pub(crate) fn new(bitness: Bitness, endian: Endian, base_offset: u64) -> Self
    {
        Self {
            bitness,
            endian,
            cpu_type: CpuType::Unknown(0),
            cpu_subtype: CpuSubType::Unknown(0),
            file_type: FileType::Unknown(0),
            flags: 0,
            base_offset,
            sections: Vec::new(),
            section_index: HashMap::new(),
            segments: Vec::new(),
            symbols: SymbolTable::new(),
            dynamic_symbols: SymbolTable::new(),
            load_info: LoadInfo::default(),
            diagnostics: Vec::new(),
        }
    }

    pub fn bitness(&self) -> Bitness
    {
        self.bitness
    }

    pub fn endian(&self) -> Endian
    {
        self.endian
    }

    pub fn cpu_type(&self) -> CpuType
    {
        self.cpu_type
    }

    pub fn cpu_subtype(&self) -> CpuSubType
    {
        self.cpu_subtype
    }

    pub fn file_type(&self) -> FileType
    {
        self.file_type
    }

    /// Raw `flags` word of the header (`MH_PIE`, `MH_TWOLEVEL`, ...).
    pub fn flags(&self) -> u32
    {
        self.flags
    }

    /// Offset of this slice within the input (0 for single-architecture files).
    pub fn base_offset(&self) -> u64
    {
        self.base_offset
    }

    /// All sections, in the order they were registered.
    pub fn sections(&self) -> &[Section]
    {
        &self.sections
    }

    /// First section of the given type.
    pub fn section(&self, kind: SectionType) -> Option<&Section>
    {
        self.section_index.get(&kind).and_then(|&i| self.sections.get(i))
    }

    /// Every section of the given type, in registration order.
    pub fn sections_of(&self, kind: SectionType) -> impl Iterator<Item = &Section>
    {
        self.sections.iter().filter(move |section| section.kind() == kind)
    }

    /// First section whose range contains `address`.
    pub fn section_containing(&self, address: Address) -> Option<&Section>
    {
        self.sections
            .iter()
            .find(|section| address.within(section.address(), section.size()))
    }

    pub fn segments(&self) -> &[Segment]
    {
        &self.segments
    }

    pub fn symbol_table(&self) -> &SymbolTable
    {
        &self.symbols
    }

    pub fn dynamic_symbol_table(&self) -> &SymbolTable
    {
        &self.dynamic_symbols
    }

    pub fn symbols(&self, kind: SymbolTableKind) -> &SymbolTable
    {
        match kind {
            SymbolTableKind::Primary => &self.symbols,
            SymbolTableKind::Dynamic => &self.dynamic_symbols,
        }
    }

    pub fn load_info(&self) -> &LoadInfo
    {
        &self.load_info
    }

    /// Recoverable anomalies met while decoding this slice.
    pub fn diagnostics(&self) -> &[Diagnostic]
    {
        &self.diagnostics
    }

    pub(crate) fn set_architecture(&mut self, cpu_type: CpuType, cpu_subtype: CpuSubType, file_type: FileType, flags: u32)
    {
        self.cpu_type = cpu_type;
        self.cpu_subtype = cpu_subtype;
        self.file_type = file_type;
        self.flags = flags;
    }

    pub(crate) fn add_section(&mut self, section: Section)
    {
        self.section_index.entry(section.kind()).or_insert(self.sections.len());
        self.sections.push(section);
    }

    pub(crate) fn set_segments(&mut self, segments: Vec<Segment>)
    {
        self.segments = segments;
    }

    pub(crate) fn set_symbol_tables(&mut self, symbols: SymbolTable, dynamic_symbols: SymbolTable)
    {
        self.symbols = symbols;
        self.dynamic_symbols = dynamic_symbols;
    }

    pub(crate) fn set_load_info(&mut self, load_info: LoadInfo)
    {
        self.load_info = load_info;
    }

    pub(crate) fn set_diagnostics(&mut self, diagnostics: Vec<Diagnostic>)
    {
        self.diagnostics = diagnostics;
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_section_lookup_by_type_keeps_first()
    {
        let mut object = BinaryObject::new(Bitness::Bits64, Endian::Little, 0);
        object.add_section(Section::new(SectionType::CString, "C-Strings", Address::new(0x10), 4, 0));
        object.add_section(Section::new(SectionType::Text, "Program", Address::new(0x20), 4, 0));
        object.add_section(Section::new(
            SectionType::CString,
            "ObjC Method Names",
            Address::new(0x30),
            4,
            0,
        ));

        assert_eq!(object.section(SectionType::CString).map(Section::label), Some("C-Strings"));
        assert_eq!(object.sections_of(SectionType::CString).count(), 2);
        assert!(object.section(SectionType::SymbolStubs).is_none());
        assert_eq!(
            object.section_containing(Address::new(0x32)).map(Section::label),
            Some("ObjC Method Names")
        );
    }

    #[test]
    fn test_versions()
    {
        assert_eq!(Version(0x000a_0f02).to_string(), "10.15.2");
        let packed = (1u64 << 40) | (2 << 30) | (3 << 20) | (4 << 10) | 5;
        assert_eq!(SourceVersion(packed).to_string(), "1.2.3.4.5");
    }

    #[test]
    fn test_uuid_string()
    {
        let info = LoadInfo {
            uuid: Some([
                0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef, 0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef,
            ]),
            ..LoadInfo::default()
        };
        assert_eq!(info.uuid_string().as_deref(), Some("01234567-89AB-CDEF-0123-456789ABCDEF"));
    }

    #[test]
    fn test_diagnostic_display()
    {
        let diag = Diagnostic::UnresolvedSymbol {
            table: SymbolTableKind::Dynamic,
            position: 2,
            index: 0x8000_0000,
        };
        assert_eq!(diag.to_string(), "dynamic symbol table entry 2 has out-of-range index 2147483648");
    }
}
