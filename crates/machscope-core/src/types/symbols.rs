//! Symbol entry and symbol table types.

use std::fmt;

use crate::demangle;

/// Programming language associated with a symbol name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolLanguage
{
    /// Rust symbol (legacy `_ZN...17h<hash>E` or v0 `_R` mangling).
    Rust,
    /// C++ symbol (Itanium mangling without Rust extensions).
    Cpp,
    /// C symbol or other unmangled global.
    C,
    /// Empty or unresolved name.
    Unknown,
}

impl fmt::Display for SymbolLanguage
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let label = match self {
            SymbolLanguage::Rust => "rust",
            SymbolLanguage::Cpp => "c++",
            SymbolLanguage::C => "c",
            SymbolLanguage::Unknown => "unknown",
        };
        write!(f, "{label}")
    }
}

/// Which of a binary object's two symbol tables is meant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolTableKind
{
    /// Entries read from the `nlist` symbol table
    Primary,
    /// Entries read from the indirect symbol table
    Dynamic,
}

impl fmt::Display for SymbolTableKind
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            SymbolTableKind::Primary => write!(f, "symbol table"),
            SymbolTableKind::Dynamic => write!(f, "dynamic symbol table"),
        }
    }
}

/// One symbol.
///
/// Primary symbols start out with the raw string-table index and the value
/// from the symbol table; the resolution pass fills in the name. Dynamic
/// symbols start out with a raw index into the primary table and, once
/// resolved, carry that symbol's name and the synthesized stub address as
/// their value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SymbolEntry
{
    index: u32,
    name: String,
    value: u64,
    kind: u8,
    section: u8,
    description: u16,
    resolved: bool,
}

impl SymbolEntry
{
    /// Unresolved entry with only the raw index and value.
    pub fn new(index: u32, value: u64) -> Self
    {
        Self {
            index,
            value,
            ..Self::default()
        }
    }

    /// Entry carrying the raw `nlist` type, section and description fields.
    pub fn with_nlist(index: u32, value: u64, kind: u8, section: u8, description: u16) -> Self
    {
        Self {
            index,
            value,
            kind,
            section,
            description,
            ..Self::default()
        }
    }

    /// Raw index: string-table byte offset for primary symbols, primary
    /// table position for dynamic symbols.
    pub fn index(&self) -> u32
    {
        self.index
    }

    /// Resolved name; empty until resolution or when resolution failed.
    pub fn name(&self) -> &str
    {
        &self.name
    }

    /// Address or stab offset.
    pub fn value(&self) -> u64
    {
        self.value
    }

    /// Raw `n_type` byte.
    pub fn kind(&self) -> u8
    {
        self.kind
    }

    /// Raw `n_sect` byte (1-based section ordinal, 0 for none).
    pub fn section(&self) -> u8
    {
        self.section
    }

    /// Raw `n_desc` field.
    pub fn description(&self) -> u16
    {
        self.description
    }

    pub fn is_resolved(&self) -> bool
    {
        self.resolved
    }

    /// Whether the `N_STAB` bits mark this as a debugging entry.
    pub fn is_debug(&self) -> bool
    {
        self.kind & 0xe0 != 0
    }

    /// Whether the `N_EXT` bit is set.
    pub fn is_external(&self) -> bool
    {
        self.kind & 0x01 != 0
    }

    /// Demangled form of the name, if it is a mangled Rust or C++ name.
    pub fn demangled(&self) -> Option<String>
    {
        demangle::demangle(&self.name)
    }

    /// Language guessed from the name's mangling.
    pub fn language(&self) -> SymbolLanguage
    {
        demangle::detect_language(&self.name)
    }

    pub(crate) fn resolve(&mut self, name: String)
    {
        self.name = name;
        self.resolved = true;
    }

    pub(crate) fn set_value(&mut self, value: u64)
    {
        self.value = value;
    }
}

impl fmt::Display for SymbolEntry
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self.demangled() {
            Some(demangled) => write!(f, "{demangled}"),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Ordered collection of symbols.
///
/// Order is input order; duplicates are legal and preserved.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SymbolTable
{
    symbols: Vec<SymbolEntry>,
}

impl SymbolTable
{
    pub fn new() -> Self
    {
        Self::default()
    }

    pub fn push(&mut self, symbol: SymbolEntry)
    {
        self.symbols.push(symbol);
    }

    pub fn get(&self, position: usize) -> Option<&SymbolEntry>
    {
        self.symbols.get(position)
    }

    pub fn len(&self) -> usize
    {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SymbolEntry>
    {
        self.symbols.iter()
    }

    /// First entry whose resolved name is `name`.
    pub fn find(&self, name: &str) -> Option<&SymbolEntry>
    {
        self.symbols.iter().find(|symbol| symbol.name == name)
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, SymbolEntry>
    {
        self.symbols.iter_mut()
    }
}

impl<'a> IntoIterator for &'a SymbolTable
{
    type Item = &'a SymbolEntry;
    type IntoIter = std::slice::Iter<'a, SymbolEntry>;

    fn into_iter(self) -> Self::IntoIter
    {
        self.symbols.iter()
    }
}

impl FromIterator<SymbolEntry> for SymbolTable
{
    fn from_iter<I: IntoIterator<Item = SymbolEntry>>(iter: I) -> Self
    {
        Self {
            symbols: iter.into_iter().collect(),
        }
    }
}
