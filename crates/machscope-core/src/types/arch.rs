//! Architecture metadata: bit width, byte order, CPU and file type.
//!
//! Raw header values are mapped onto these enums through fixed lookup tables.
//! Identification is best-effort: a value missing from a table maps to the
//! `Unknown` variant carrying the raw number and never fails a decode.

use std::fmt;

/// Width of address-sized fields in a slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bitness
{
    Bits32,
    Bits64,
}

impl Bitness
{
    /// Number of bits (32 or 64).
    pub const fn bits(self) -> u32
    {
        match self {
            Bitness::Bits32 => 32,
            Bitness::Bits64 => 64,
        }
    }

    /// Size in bytes of an address-sized field.
    pub const fn word_size(self) -> u64
    {
        match self {
            Bitness::Bits32 => 4,
            Bitness::Bits64 => 8,
        }
    }
}

impl fmt::Display for Bitness
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}-bit", self.bits())
    }
}

/// Byte order of multi-byte integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endian
{
    Little,
    Big,
}

impl fmt::Display for Endian
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let label = match self {
            Endian::Little => "little-endian",
            Endian::Big => "big-endian",
        };
        write!(f, "{label}")
    }
}

/// 64-bit ABI bit OR-ed into a CPU type.
const CPU_ARCH_ABI64: u32 = 0x0100_0000;
/// ILP32-on-64-bit ABI bit OR-ed into a CPU type.
const CPU_ARCH_ABI64_32: u32 = 0x0200_0000;

/// CPU architecture family (`cputype` in the header).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CpuType
{
    /// `CPU_TYPE_X86` / `CPU_TYPE_I386`
    X86,
    /// `CPU_TYPE_X86_64`
    X86_64,
    /// `CPU_TYPE_HPPA`
    Hppa,
    /// `CPU_TYPE_ARM`
    Arm,
    /// `CPU_TYPE_ARM64`
    Arm64,
    /// `CPU_TYPE_ARM64_32`
    Arm64_32,
    /// `CPU_TYPE_SPARC`
    Sparc,
    /// `CPU_TYPE_I860`
    I860,
    /// `CPU_TYPE_POWERPC`
    PowerPc,
    /// `CPU_TYPE_POWERPC64`
    PowerPc64,
    /// Any value missing from the lookup table
    Unknown(u32),
}

impl CpuType
{
    /// Map a raw `cputype` value.
    pub fn from_raw(raw: u32) -> Self
    {
        match raw {
            7 => CpuType::X86,
            r if r == 7 | CPU_ARCH_ABI64 => CpuType::X86_64,
            11 => CpuType::Hppa,
            12 => CpuType::Arm,
            r if r == 12 | CPU_ARCH_ABI64 => CpuType::Arm64,
            r if r == 12 | CPU_ARCH_ABI64_32 => CpuType::Arm64_32,
            14 => CpuType::Sparc,
            15 => CpuType::I860,
            18 => CpuType::PowerPc,
            r if r == 18 | CPU_ARCH_ABI64 => CpuType::PowerPc64,
            other => CpuType::Unknown(other),
        }
    }

    pub fn name(self) -> &'static str
    {
        match self {
            CpuType::X86 => "x86",
            CpuType::X86_64 => "x86_64",
            CpuType::Hppa => "hppa",
            CpuType::Arm => "arm",
            CpuType::Arm64 => "arm64",
            CpuType::Arm64_32 => "arm64_32",
            CpuType::Sparc => "sparc",
            CpuType::I860 => "i860",
            CpuType::PowerPc => "ppc",
            CpuType::PowerPc64 => "ppc64",
            CpuType::Unknown(_) => "unknown",
        }
    }
}

impl fmt::Display for CpuType
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            CpuType::Unknown(raw) => write!(f, "unknown (0x{raw:x})"),
            known => write!(f, "{}", known.name()),
        }
    }
}

/// Capability bits in the high byte of `cpusubtype`.
pub(crate) const CPU_SUBTYPE_MASK: u32 = 0xff00_0000;

/// Intel subtypes encode `family + (model << 4)`.
const fn intel(family: u32, model: u32) -> u32
{
    family + (model << 4)
}

/// CPU variant within a family (`cpusubtype` in the header).
///
/// Subtype numbers are only meaningful relative to a [`CpuType`], so the
/// lookup takes both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CpuSubType
{
    I386,
    I486,
    I486Sx,
    Pentium,
    PentiumPro,
    PentiumIIM3,
    PentiumIIM5,
    Celeron,
    CeleronMobile,
    Pentium3,
    Pentium3M,
    Pentium3Xeon,
    PentiumM,
    Pentium4,
    Pentium4M,
    Itanium,
    Itanium2,
    Xeon,
    XeonMp,
    X86_64All,
    X86_64Haswell,
    ArmAll,
    ArmV4T,
    ArmV6,
    ArmV5Tej,
    ArmV7,
    ArmV7S,
    ArmV7K,
    Arm64All,
    Arm64V8,
    Arm64E,
    PowerPcAll,
    PowerPc970,
    /// Any value missing from the lookup table for its family
    Unknown(u32),
}

impl CpuSubType
{
    /// Map a raw `cpusubtype` value, already stripped of capability bits.
    pub fn from_raw(cpu: CpuType, raw: u32) -> Self
    {
        match cpu {
            CpuType::X86 => Self::intel_subtype(raw),
            CpuType::X86_64 => match raw {
                3 => CpuSubType::X86_64All,
                8 => CpuSubType::X86_64Haswell,
                other => CpuSubType::Unknown(other),
            },
            CpuType::Arm => match raw {
                0 => CpuSubType::ArmAll,
                5 => CpuSubType::ArmV4T,
                6 => CpuSubType::ArmV6,
                7 => CpuSubType::ArmV5Tej,
                9 => CpuSubType::ArmV7,
                11 => CpuSubType::ArmV7S,
                12 => CpuSubType::ArmV7K,
                other => CpuSubType::Unknown(other),
            },
            CpuType::Arm64 | CpuType::Arm64_32 => match raw {
                0 => CpuSubType::Arm64All,
                1 => CpuSubType::Arm64V8,
                2 => CpuSubType::Arm64E,
                other => CpuSubType::Unknown(other),
            },
            CpuType::PowerPc | CpuType::PowerPc64 => match raw {
                0 => CpuSubType::PowerPcAll,
                100 => CpuSubType::PowerPc970,
                other => CpuSubType::Unknown(other),
            },
            _ => CpuSubType::Unknown(raw),
        }
    }

    fn intel_subtype(raw: u32) -> Self
    {
        const I486SX: u32 = intel(4, 8);
        const PENTPRO: u32 = intel(6, 1);
        const PENTII_M3: u32 = intel(6, 3);
        const PENTII_M5: u32 = intel(6, 5);
        const CELERON: u32 = intel(7, 6);
        const CELERON_MOBILE: u32 = intel(7, 7);
        const PENTIUM_3_M: u32 = intel(8, 1);
        const PENTIUM_3_XEON: u32 = intel(8, 2);
        const PENTIUM_4_M: u32 = intel(10, 1);
        const ITANIUM_2: u32 = intel(11, 1);
        const XEON_MP: u32 = intel(12, 1);

        match raw {
            3 => CpuSubType::I386,
            4 => CpuSubType::I486,
            I486SX => CpuSubType::I486Sx,
            5 => CpuSubType::Pentium,
            PENTPRO => CpuSubType::PentiumPro,
            PENTII_M3 => CpuSubType::PentiumIIM3,
            PENTII_M5 => CpuSubType::PentiumIIM5,
            CELERON => CpuSubType::Celeron,
            CELERON_MOBILE => CpuSubType::CeleronMobile,
            8 => CpuSubType::Pentium3,
            PENTIUM_3_M => CpuSubType::Pentium3M,
            PENTIUM_3_XEON => CpuSubType::Pentium3Xeon,
            9 => CpuSubType::PentiumM,
            10 => CpuSubType::Pentium4,
            PENTIUM_4_M => CpuSubType::Pentium4M,
            11 => CpuSubType::Itanium,
            ITANIUM_2 => CpuSubType::Itanium2,
            12 => CpuSubType::Xeon,
            XEON_MP => CpuSubType::XeonMp,
            other => CpuSubType::Unknown(other),
        }
    }
}

impl fmt::Display for CpuSubType
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            CpuSubType::Unknown(raw) => write!(f, "unknown ({raw})"),
            known => write!(f, "{known:?}"),
        }
    }
}

/// Kind of object file (`filetype` in the header).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType
{
    /// `MH_OBJECT`: relocatable object
    Object,
    /// `MH_EXECUTE`: demand-paged executable
    Execute,
    /// `MH_CORE`: core dump
    Core,
    /// `MH_PRELOAD`: preloaded executable
    Preload,
    /// `MH_DYLIB`: dynamic library
    Dylib,
    /// `MH_DYLINKER`: the dynamic linker itself
    Dylinker,
    /// `MH_BUNDLE`: loadable bundle
    Bundle,
    Unknown(u32),
}

impl FileType
{
    pub fn from_raw(raw: u32) -> Self
    {
        match raw {
            1 => FileType::Object,
            2 => FileType::Execute,
            4 => FileType::Core,
            5 => FileType::Preload,
            6 => FileType::Dylib,
            7 => FileType::Dylinker,
            8 => FileType::Bundle,
            other => FileType::Unknown(other),
        }
    }
}

impl fmt::Display for FileType
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let label = match self {
            FileType::Object => "object",
            FileType::Execute => "executable",
            FileType::Core => "core",
            FileType::Preload => "preload",
            FileType::Dylib => "dylib",
            FileType::Dylinker => "dylinker",
            FileType::Bundle => "bundle",
            FileType::Unknown(raw) => return write!(f, "unknown ({raw})"),
        };
        write!(f, "{label}")
    }
}
