//! Symbol demangling utilities.
//!
//! This module demangles symbol names and detects their programming language.
//!
//! ## Symbol Mangling
//!
//! - **Rust**: legacy scheme (`_ZN...17h<hash>E`) or v0 (`_R...`)
//! - **C++**: Itanium ABI mangling (`_Z...`)
//! - **C**: unmangled
//!
//! Mach-O prefixes every C-level name with an extra underscore, so a Rust
//! symbol appears as `__ZN...` and a C function `main` as `_main`. Language
//! detection strips that underscore before looking at the mangling prefix.

use rustc_demangle::try_demangle;

use crate::types::SymbolLanguage;

/// Demangle a Rust symbol name.
///
/// Returns `None` for names that are not Rust-mangled, including C++ names:
/// `rustc_demangle` rejects Itanium names that carry parameter types.
pub(crate) fn demangle(raw: &str) -> Option<String>
{
    if raw.is_empty() {
        return None;
    }
    try_demangle(raw).ok().map(|d| format!("{d:#}"))
}

/// Classify a symbol name by its mangling.
pub(crate) fn detect_language(raw: &str) -> SymbolLanguage
{
    if raw.is_empty() {
        return SymbolLanguage::Unknown;
    }

    let unprefixed = raw.strip_prefix('_').unwrap_or(raw);
    if unprefixed.starts_with("_R") || try_demangle(raw).is_ok() {
        SymbolLanguage::Rust
    } else if unprefixed.starts_with("_Z") {
        SymbolLanguage::Cpp
    } else {
        SymbolLanguage::C
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_rust_legacy_name()
    {
        let raw = "__ZN4core3fmt5write17h0123456789abcdefE";
        assert_eq!(detect_language(raw), SymbolLanguage::Rust);
        assert_eq!(demangle(raw).as_deref(), Some("core::fmt::write"));
    }

    #[test]
    fn test_cpp_name()
    {
        let raw = "__ZNSt3__16vectorIiNS_9allocatorIiEEE9push_backEOi";
        assert_eq!(detect_language(raw), SymbolLanguage::Cpp);
        assert_eq!(demangle(raw), None);
    }

    #[test]
    fn test_c_name()
    {
        assert_eq!(detect_language("_printf"), SymbolLanguage::C);
        assert_eq!(demangle("_printf"), None);
    }

    #[test]
    fn test_empty_name()
    {
        assert_eq!(detect_language(""), SymbolLanguage::Unknown);
        assert_eq!(demangle(""), None);
    }
}
