//! Common module for library exports

pub use crate::error::{DecodeError, DecodeResult};
pub use crate::format::{DecodeOptions, Format, MachO, StubSize};
pub use crate::reader::Reader;
pub use crate::types::{
    Address, BinaryObject, Bitness, CpuSubType, CpuType, Diagnostic, Endian, FileType, LoadInfo, Section,
    SectionData, SectionType, Segment, SymbolEntry, SymbolLanguage, SymbolTable, SymbolTableKind,
};
