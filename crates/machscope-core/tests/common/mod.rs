//! In-memory builders for synthetic Mach-O slices and universal containers.

#![allow(dead_code)]

pub const CPU_X86_64: u32 = 0x0100_0007;
pub const CPU_ARM64: u32 = 0x0100_000c;
pub const CPU_PPC: u32 = 18;

/// One section header of a segment command.
#[derive(Debug, Clone)]
pub struct SectionSpec
{
    pub segment: &'static str,
    pub section: &'static str,
    pub address: u64,
    pub size: u64,
    pub offset: u32,
    pub reserved2: u32,
}

impl SectionSpec
{
    pub fn text(section: &'static str, address: u64, size: u64, offset: u32) -> Self
    {
        Self {
            segment: "__TEXT",
            section,
            address,
            size,
            offset,
            reserved2: 0,
        }
    }

    pub fn with_reserved2(mut self, reserved2: u32) -> Self
    {
        self.reserved2 = reserved2;
        self
    }
}

/// Builder for a single-architecture slice.
///
/// Load commands follow the header in the order they were added. Blobs are
/// placed at slice-relative offsets and the output is zero-padded to fit them.
#[derive(Debug, Clone)]
pub struct SliceBuilder
{
    bits64: bool,
    big_endian: bool,
    cputype: u32,
    cpusubtype: u32,
    filetype: u32,
    commands: Vec<Vec<u8>>,
    blobs: Vec<(usize, Vec<u8>)>,
}

impl SliceBuilder
{
    pub fn new64() -> Self
    {
        Self {
            bits64: true,
            big_endian: false,
            cputype: CPU_X86_64,
            cpusubtype: 3,
            filetype: 2,
            commands: Vec::new(),
            blobs: Vec::new(),
        }
    }

    pub fn new32() -> Self
    {
        Self {
            bits64: false,
            cputype: 7,
            ..Self::new64()
        }
    }

    pub fn big_endian(mut self) -> Self
    {
        self.big_endian = true;
        self
    }

    pub fn cputype(mut self, cputype: u32) -> Self
    {
        self.cputype = cputype;
        self
    }

    pub fn cpusubtype(mut self, cpusubtype: u32) -> Self
    {
        self.cpusubtype = cpusubtype;
        self
    }

    pub fn filetype(mut self, filetype: u32) -> Self
    {
        self.filetype = filetype;
        self
    }

    pub fn push_u32(&self, out: &mut Vec<u8>, value: u32)
    {
        if self.big_endian {
            out.extend_from_slice(&value.to_be_bytes());
        } else {
            out.extend_from_slice(&value.to_le_bytes());
        }
    }

    pub fn push_u64(&self, out: &mut Vec<u8>, value: u64)
    {
        if self.big_endian {
            out.extend_from_slice(&value.to_be_bytes());
        } else {
            out.extend_from_slice(&value.to_le_bytes());
        }
    }

    /// Pointer-sized field: 4 bytes on 32-bit slices, 8 on 64-bit.
    pub fn push_word(&self, out: &mut Vec<u8>, value: u64)
    {
        if self.bits64 {
            self.push_u64(out, value);
        } else {
            self.push_u32(out, u32::try_from(value).unwrap());
        }
    }

    pub fn words(&self, values: &[u32]) -> Vec<u8>
    {
        let mut out = Vec::new();
        for &value in values {
            self.push_u32(&mut out, value);
        }
        out
    }

    /// One `nlist` entry with zeroed type, section and description.
    pub fn nlist(&self, strx: u32, value: u64) -> Vec<u8>
    {
        let mut out = Vec::new();
        self.push_u32(&mut out, strx);
        out.extend_from_slice(&[0x0f, 1]);
        out.extend_from_slice(&[0, 0]);
        self.push_word(&mut out, value);
        out
    }

    /// Append a command with an explicit `cmdsize` and raw body bytes.
    pub fn raw_command(mut self, tag: u32, cmdsize: u32, body: &[u8]) -> Self
    {
        let mut out = Vec::new();
        self.push_u32(&mut out, tag);
        self.push_u32(&mut out, cmdsize);
        out.extend_from_slice(body);
        self.commands.push(out);
        self
    }

    /// Append a command whose body is a list of 32-bit words.
    pub fn command(self, tag: u32, body: &[u32]) -> Self
    {
        let bytes = self.words(body);
        let cmdsize = u32::try_from(8 + bytes.len()).unwrap();
        self.raw_command(tag, cmdsize, &bytes)
    }

    pub fn segment(self, name: &str, sections: &[SectionSpec]) -> Self
    {
        let mut body = Vec::new();
        body.extend_from_slice(&name16(name));
        for value in [0x1000, 0x4000, 0, 0x4000] {
            self.push_word(&mut body, value);
        }
        for value in [7, 5, u32::try_from(sections.len()).unwrap(), 0] {
            self.push_u32(&mut body, value);
        }
        for section in sections {
            body.extend_from_slice(&name16(section.section));
            body.extend_from_slice(&name16(section.segment));
            self.push_word(&mut body, section.address);
            self.push_word(&mut body, section.size);
            for value in [section.offset, 0, 0, 0, 0, 0, section.reserved2] {
                self.push_u32(&mut body, value);
            }
            if self.bits64 {
                self.push_u32(&mut body, 0);
            }
        }
        let tag = if self.bits64 { 0x19 } else { 0x1 };
        let cmdsize = u32::try_from(8 + body.len()).unwrap();
        self.raw_command(tag, cmdsize, &body)
    }

    pub fn symtab(self, symoff: u32, nsyms: u32, stroff: u32, strsize: u32) -> Self
    {
        self.command(0x2, &[symoff, nsyms, stroff, strsize])
    }

    pub fn dysymtab(self, indirectsymoff: u32, nindirectsyms: u32) -> Self
    {
        let mut body = [0u32; 18];
        body[12] = indirectsymoff;
        body[13] = nindirectsyms;
        self.command(0xB, &body)
    }

    /// Place `bytes` at a slice-relative offset.
    pub fn blob(mut self, offset: usize, bytes: Vec<u8>) -> Self
    {
        self.blobs.push((offset, bytes));
        self
    }

    pub fn header_size(&self) -> usize
    {
        if self.bits64 { 32 } else { 28 }
    }

    pub fn build(&self) -> Vec<u8>
    {
        let magic: u32 = match (self.bits64, self.big_endian) {
            (false, false) => 0xFEED_FACE,
            (true, false) => 0xFEED_FACF,
            (false, true) => 0xECAF_DEEF,
            (true, true) => 0xFCAF_DEEF,
        };
        let sizeofcmds: usize = self.commands.iter().map(Vec::len).sum();

        let mut out = magic.to_le_bytes().to_vec();
        for value in [
            self.cputype,
            self.cpusubtype,
            self.filetype,
            u32::try_from(self.commands.len()).unwrap(),
            u32::try_from(sizeofcmds).unwrap(),
            0x0020_0085,
        ] {
            self.push_u32(&mut out, value);
        }
        if self.bits64 {
            self.push_u32(&mut out, 0);
        }
        for command in &self.commands {
            out.extend_from_slice(command);
        }

        for (offset, bytes) in &self.blobs {
            let end = offset + bytes.len();
            if out.len() < end {
                out.resize(end, 0);
            }
            out[*offset..end].copy_from_slice(bytes);
        }
        out
    }
}

pub fn name16(name: &str) -> [u8; 16]
{
    let mut field = [0u8; 16];
    field[..name.len()].copy_from_slice(name.as_bytes());
    field
}

/// Byte order of the universal magic. The directory after it is always
/// big-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatMagicOrder
{
    /// `CA FE BA BE` on disk
    Big,
    /// `BE BA FE CA` on disk
    Little,
}

/// Wrap slices in a universal container; each entry is `(offset, slice)`.
pub fn fat(slices: &[(u32, Vec<u8>)]) -> Vec<u8>
{
    fat_with_magic(FatMagicOrder::Big, slices)
}

pub fn fat_with_magic(order: FatMagicOrder, slices: &[(u32, Vec<u8>)]) -> Vec<u8>
{
    let mut out = match order {
        FatMagicOrder::Big => 0xCAFE_BABEu32.to_be_bytes().to_vec(),
        FatMagicOrder::Little => 0xCAFE_BABEu32.to_le_bytes().to_vec(),
    };
    out.extend_from_slice(&u32::try_from(slices.len()).unwrap().to_be_bytes());
    for (offset, slice) in slices {
        let size = u32::try_from(slice.len()).unwrap();
        for value in [CPU_X86_64, 3, *offset, size, 12] {
            out.extend_from_slice(&value.to_be_bytes());
        }
    }
    for (offset, slice) in slices {
        let start = *offset as usize;
        let end = start + slice.len();
        if out.len() < end {
            out.resize(end, 0);
        }
        out[start..end].copy_from_slice(slice);
    }
    out
}

/// A 64-bit slice with one `__text` section, two symbols named from
/// `"foo\0bar\0"`, and a `__stubs` section at 0x1000 linked through two
/// indirect entries.
pub fn linked_slice() -> SliceBuilder
{
    let base = SliceBuilder::new64();
    let symbols = [base.nlist(0, 0x1_0000_0f00), base.nlist(4, 0)].concat();
    let indirect = base.words(&[1, 0]);

    base.segment(
        "__TEXT",
        &[
            SectionSpec::text("__text", 0x1_0000_0f00, 4, 0x400),
            SectionSpec::text("__stubs", 0x1000, 12, 0x410).with_reserved2(12),
        ],
    )
    .symtab(0x500, 2, 0x540, 8)
    .dysymtab(0x560, 2)
    .blob(0x400, vec![0x55, 0x48, 0x89, 0xe5])
    .blob(0x410, vec![0xff; 12])
    .blob(0x500, symbols)
    .blob(0x540, b"foo\0bar\0".to_vec())
    .blob(0x560, indirect)
}
