//! Section and segment types.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use super::Address;

/// Kind of byte range a [`Section`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SectionType
{
    /// Executable program code (`__TEXT,__text`)
    Text,
    /// Dynamic-linking stubs (`__TEXT,__stubs` / `__TEXT,__symbol_stub`)
    SymbolStubs,
    /// NUL-terminated string literals (`__cstring`, `__objc_methname`)
    CString,
    /// Symbol name pool referenced by the symbol table
    StringTable,
    /// `nlist` symbol entries
    SymbolTable,
    /// Indirect symbol indices
    DynamicSymbolTable,
    /// ULEB128-encoded function start offsets
    FunctionStarts,
    /// Code signature blob
    CodeSignature,
}

impl fmt::Display for SectionType
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let label = match self {
            SectionType::Text => "text",
            SectionType::SymbolStubs => "symbol-stubs",
            SectionType::CString => "cstring",
            SectionType::StringTable => "string-table",
            SectionType::SymbolTable => "symbol-table",
            SectionType::DynamicSymbolTable => "dynamic-symbol-table",
            SectionType::FunctionStarts => "function-starts",
            SectionType::CodeSignature => "code-signature",
        };
        write!(f, "{label}")
    }
}

/// Loaded section bytes: a window into the input buffer shared by every
/// section decoded from the same reader.
///
/// Cloning a `SectionData` or loading the same file range twice never copies
/// the bytes.
#[derive(Clone)]
pub struct SectionData
{
    buffer: Arc<[u8]>,
    range: Range<usize>,
}

impl SectionData
{
    /// `range` must lie inside `buffer`; out-of-range windows read as empty.
    pub(crate) fn new(buffer: Arc<[u8]>, range: Range<usize>) -> Self
    {
        Self { buffer, range }
    }

    pub fn as_slice(&self) -> &[u8]
    {
        self.buffer.get(self.range.clone()).unwrap_or(&[])
    }

    pub fn len(&self) -> usize
    {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.as_slice().is_empty()
    }

    /// Whether both windows point into the same buffer.
    pub fn shares_buffer(&self, other: &SectionData) -> bool
    {
        Arc::ptr_eq(&self.buffer, &other.buffer)
    }
}

impl Default for SectionData
{
    fn default() -> Self
    {
        Self::new(Arc::from(Vec::new()), 0..0)
    }
}

impl AsRef<[u8]> for SectionData
{
    fn as_ref(&self) -> &[u8]
    {
        self.as_slice()
    }
}

impl PartialEq for SectionData
{
    fn eq(&self, other: &Self) -> bool
    {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for SectionData {}

impl fmt::Debug for SectionData
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("SectionData")
            .field("range", &self.range)
            .field("len", &self.len())
            .finish()
    }
}

/// A named, typed byte range of the input.
///
/// `offset` is always relative to the start of the whole input stream, so for
/// a slice of a universal binary it already includes the slice's base offset.
/// The content stays empty until the decoder's load pass fills it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section
{
    kind: SectionType,
    label: String,
    address: Address,
    size: u64,
    offset: u64,
    data: SectionData,
}

impl Section
{
    /// Describe a section without content.
    pub fn new(kind: SectionType, label: impl Into<String>, address: Address, size: u64, offset: u64) -> Self
    {
        Self {
            kind,
            label: label.into(),
            address,
            size,
            offset,
            data: SectionData::default(),
        }
    }

    pub fn kind(&self) -> SectionType
    {
        self.kind
    }

    /// Human-readable label ("Program", "Symbol Stubs", ...)
    pub fn label(&self) -> &str
    {
        &self.label
    }

    pub fn address(&self) -> Address
    {
        self.address
    }

    /// Size in bytes
    pub fn size(&self) -> u64
    {
        self.size
    }

    /// Whole-file offset of the first byte
    pub fn offset(&self) -> u64
    {
        self.offset
    }

    /// Materialized content; empty before the load pass.
    pub fn data(&self) -> &[u8]
    {
        self.data.as_slice()
    }

    /// The shared buffer window behind [`data`](Self::data).
    pub fn content(&self) -> &SectionData
    {
        &self.data
    }

    pub fn is_loaded(&self) -> bool
    {
        self.size == 0 || !self.data.is_empty()
    }

    pub(crate) fn set_data(&mut self, data: SectionData)
    {
        self.data = data;
    }
}

/// Memory protection bits of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Protection(pub u32);

impl Protection
{
    pub const READ: u32 = 0x1;
    pub const WRITE: u32 = 0x2;
    pub const EXECUTE: u32 = 0x4;

    pub fn is_readable(self) -> bool
    {
        self.0 & Self::READ != 0
    }

    pub fn is_writable(self) -> bool
    {
        self.0 & Self::WRITE != 0
    }

    pub fn is_executable(self) -> bool
    {
        self.0 & Self::EXECUTE != 0
    }
}

impl fmt::Display for Protection
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let r = if self.is_readable() { 'r' } else { '-' };
        let w = if self.is_writable() { 'w' } else { '-' };
        let x = if self.is_executable() { 'x' } else { '-' };
        write!(f, "{r}{w}{x}")
    }
}

/// A segment as declared by a segment load command.
///
/// Segments are recorded as layout metadata only; their bytes are never
/// materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment
{
    pub name: String,
    pub address: Address,
    pub vm_size: u64,
    /// Whole-file offset of the mapped bytes
    pub file_offset: u64,
    pub file_size: u64,
    pub max_protection: Protection,
    pub initial_protection: Protection,
    /// Number of section headers the command declared
    pub section_count: u32,
    pub flags: u32,
}
