//! Mach-O wire constants.
//!
//! Magic values are compared against the first four bytes read as a
//! little-endian `u32`.
//!
//! ## References
//!
//! - `<mach-o/loader.h>`, `<mach-o/fat.h>`, `<mach-o/nlist.h>`

use crate::types::SectionType;

/// 32-bit slice, little-endian
pub const MH_MAGIC: u32 = 0xFEED_FACE;
/// 64-bit slice, little-endian
pub const MH_MAGIC_64: u32 = 0xFEED_FACF;
/// 32-bit slice, big-endian
pub const MH_MAGIC_BE: u32 = 0xECAF_DEEF;
/// 64-bit slice, big-endian
pub const MH_MAGIC_64_BE: u32 = 0xFCAF_DEEF;
/// Universal container
pub const FAT_MAGIC: u32 = 0xCAFE_BABE;
/// Universal container as it reads from a big-endian file on a little-endian host
pub const FAT_CIGAM: u32 = 0xBEBA_FECA;

/// Every magic accepted by detection.
pub const MAGICS: [u32; 6] = [MH_MAGIC, MH_MAGIC_64, MH_MAGIC_BE, MH_MAGIC_64_BE, FAT_MAGIC, FAT_CIGAM];

/// Bit marking load commands the dynamic linker must understand.
pub const LC_REQ_DYLD: u32 = 0x8000_0000;

pub const LC_SEGMENT: u32 = 0x1;
pub const LC_SYMTAB: u32 = 0x2;
pub const LC_THREAD: u32 = 0x4;
pub const LC_UNIXTHREAD: u32 = 0x5;
pub const LC_DYSYMTAB: u32 = 0xB;
pub const LC_LOAD_DYLIB: u32 = 0xC;
pub const LC_ID_DYLIB: u32 = 0xD;
pub const LC_LOAD_DYLINKER: u32 = 0xE;
pub const LC_LOAD_WEAK_DYLIB: u32 = 0x18 | LC_REQ_DYLD;
pub const LC_SEGMENT_64: u32 = 0x19;
pub const LC_UUID: u32 = 0x1B;
pub const LC_RPATH: u32 = 0x1C | LC_REQ_DYLD;
pub const LC_CODE_SIGNATURE: u32 = 0x1D;
pub const LC_SEGMENT_SPLIT_INFO: u32 = 0x1E;
pub const LC_REEXPORT_DYLIB: u32 = 0x1F | LC_REQ_DYLD;
pub const LC_LAZY_LOAD_DYLIB: u32 = 0x20;
pub const LC_DYLD_INFO: u32 = 0x22;
pub const LC_DYLD_INFO_ONLY: u32 = 0x22 | LC_REQ_DYLD;
pub const LC_LOAD_UPWARD_DYLIB: u32 = 0x23 | LC_REQ_DYLD;
pub const LC_VERSION_MIN_MACOSX: u32 = 0x24;
pub const LC_VERSION_MIN_IPHONEOS: u32 = 0x25;
pub const LC_FUNCTION_STARTS: u32 = 0x26;
pub const LC_DYLD_ENVIRONMENT: u32 = 0x27;
pub const LC_MAIN: u32 = 0x28 | LC_REQ_DYLD;
pub const LC_DATA_IN_CODE: u32 = 0x29;
pub const LC_SOURCE_VERSION: u32 = 0x2A;
pub const LC_DYLIB_CODE_SIGN_DRS: u32 = 0x2B;
pub const LC_VERSION_MIN_TVOS: u32 = 0x2F;
pub const LC_VERSION_MIN_WATCHOS: u32 = 0x30;
pub const LC_BUILD_VERSION: u32 = 0x32;
pub const LC_DYLD_EXPORTS_TRIE: u32 = 0x33 | LC_REQ_DYLD;
pub const LC_DYLD_CHAINED_FIXUPS: u32 = 0x34 | LC_REQ_DYLD;

/// Size of the `{cmd, cmdsize}` prefix of every load command.
pub const LOAD_COMMAND_HEADER_SIZE: u32 = 8;

/// `nlist` entry size: strx, type, sect, desc, then a 4- or 8-byte value.
pub const NLIST_FIXED_SIZE: u64 = 8;

/// Stub entry size assumed when nothing better is known (x86 `jmp *` stub).
pub const LEGACY_STUB_SIZE: u64 = 6;

/// Sections kept from segment commands: `(segment, section, type, label)`.
pub const SECTION_WHITELIST: &[(&str, &str, SectionType, &str)] = &[
    ("__TEXT", "__text", SectionType::Text, "Program"),
    ("__TEXT", "__symbol_stub", SectionType::SymbolStubs, "Symbol Stubs"),
    ("__TEXT", "__stubs", SectionType::SymbolStubs, "Symbol Stubs"),
    ("__TEXT", "__cstring", SectionType::CString, "C-Strings"),
    ("__TEXT", "__objc_methname", SectionType::CString, "ObjC Method Names"),
];

/// Human name of a load command tag, for logs.
pub fn command_name(tag: u32) -> &'static str
{
    match tag {
        LC_SEGMENT => "LC_SEGMENT",
        LC_SYMTAB => "LC_SYMTAB",
        LC_THREAD => "LC_THREAD",
        LC_UNIXTHREAD => "LC_UNIXTHREAD",
        LC_DYSYMTAB => "LC_DYSYMTAB",
        LC_LOAD_DYLIB => "LC_LOAD_DYLIB",
        LC_ID_DYLIB => "LC_ID_DYLIB",
        LC_LOAD_DYLINKER => "LC_LOAD_DYLINKER",
        LC_LOAD_WEAK_DYLIB => "LC_LOAD_WEAK_DYLIB",
        LC_SEGMENT_64 => "LC_SEGMENT_64",
        LC_UUID => "LC_UUID",
        LC_RPATH => "LC_RPATH",
        LC_CODE_SIGNATURE => "LC_CODE_SIGNATURE",
        LC_SEGMENT_SPLIT_INFO => "LC_SEGMENT_SPLIT_INFO",
        LC_REEXPORT_DYLIB => "LC_REEXPORT_DYLIB",
        LC_LAZY_LOAD_DYLIB => "LC_LAZY_LOAD_DYLIB",
        LC_DYLD_INFO => "LC_DYLD_INFO",
        LC_DYLD_INFO_ONLY => "LC_DYLD_INFO_ONLY",
        LC_LOAD_UPWARD_DYLIB => "LC_LOAD_UPWARD_DYLIB",
        LC_VERSION_MIN_MACOSX => "LC_VERSION_MIN_MACOSX",
        LC_VERSION_MIN_IPHONEOS => "LC_VERSION_MIN_IPHONEOS",
        LC_FUNCTION_STARTS => "LC_FUNCTION_STARTS",
        LC_DYLD_ENVIRONMENT => "LC_DYLD_ENVIRONMENT",
        LC_MAIN => "LC_MAIN",
        LC_DATA_IN_CODE => "LC_DATA_IN_CODE",
        LC_SOURCE_VERSION => "LC_SOURCE_VERSION",
        LC_DYLIB_CODE_SIGN_DRS => "LC_DYLIB_CODE_SIGN_DRS",
        LC_VERSION_MIN_TVOS => "LC_VERSION_MIN_TVOS",
        LC_VERSION_MIN_WATCHOS => "LC_VERSION_MIN_WATCHOS",
        LC_BUILD_VERSION => "LC_BUILD_VERSION",
        LC_DYLD_EXPORTS_TRIE => "LC_DYLD_EXPORTS_TRIE",
        LC_DYLD_CHAINED_FIXUPS => "LC_DYLD_CHAINED_FIXUPS",
        _ => "LC_UNKNOWN",
    }
}

/// Platform name for `LC_BUILD_VERSION` platform numbers.
pub fn platform_name(platform: u32) -> String
{
    match platform {
        1 => "macos".to_string(),
        2 => "ios".to_string(),
        3 => "tvos".to_string(),
        4 => "watchos".to_string(),
        5 => "bridgeos".to_string(),
        6 => "maccatalyst".to_string(),
        7 => "iossimulator".to_string(),
        8 => "tvossimulator".to_string(),
        9 => "watchossimulator".to_string(),
        10 => "driverkit".to_string(),
        11 => "visionos".to_string(),
        12 => "visionossimulator".to_string(),
        other => format!("platform {other}"),
    }
}
