//! # Types
//!
//! The decoded data model.
//!
//! These types are what a viewer consumes: one [`BinaryObject`] per
//! architecture slice, owning its [`Section`]s and two [`SymbolTable`]s. They
//! carry no decoding logic beyond construction and lookup.

pub mod address;
pub mod arch;
pub mod object;
pub mod section;
pub mod symbols;

// Re-export all public types
pub use address::Address;
pub use arch::{Bitness, CpuSubType, CpuType, Endian, FileType};
pub use object::{
    BinaryObject, Diagnostic, DylibKind, DylibReference, EntryPoint, LoadInfo, MinimumVersion, SourceVersion, Version,
};
pub use section::{Protection, Section, SectionData, SectionType, Segment};
pub use symbols::{SymbolEntry, SymbolLanguage, SymbolTable, SymbolTableKind};
