//! Describe phase: header and load commands into a [`SliceLayout`].
//!
//! Nothing here reads section content or symbol entries. The layout records
//! where things are; [`materialize`](super::materialize) reads them.

use std::io::{Read, Seek};

use tracing::{debug, trace, warn};

use super::commands::{read_load_command, IndirectSymbols, LoadCommand, SegmentCommand, SymtabCommand};
use super::constants::{command_name, LC_CODE_SIGNATURE, LC_FUNCTION_STARTS, SECTION_WHITELIST};
use super::header::{read_header, MachHeader, SliceContext};
use crate::error::DecodeResult;
use crate::reader::Reader;
use crate::types::{Address, Diagnostic, LoadInfo, Section, SectionType, Segment};

/// Everything the load commands of one slice declare.
#[derive(Debug, Clone)]
pub struct SliceLayout
{
    pub context: SliceContext,
    pub header: MachHeader,
    /// Sections in the order their commands appeared
    pub sections: Vec<Section>,
    pub segments: Vec<Segment>,
    pub symtab: Option<SymtabCommand>,
    pub indirect: Option<IndirectSymbols>,
    /// `reserved2` of the first symbol-stub section
    pub stub_entry_size: Option<u32>,
    pub load_info: LoadInfo,
    pub diagnostics: Vec<Diagnostic>,
}

impl SliceLayout
{
    fn new(context: SliceContext, header: MachHeader) -> Self
    {
        Self {
            context,
            header,
            sections: Vec::new(),
            segments: Vec::new(),
            symtab: None,
            indirect: None,
            stub_entry_size: None,
            load_info: LoadInfo::default(),
            diagnostics: Vec::new(),
        }
    }

    fn add_segment(&mut self, command: SegmentCommand)
    {
        for header in &command.sections {
            let Some(&(_, _, kind, label)) = SECTION_WHITELIST
                .iter()
                .find(|(segment, section, _, _)| *segment == header.segment_name && *section == header.section_name)
            else {
                continue;
            };

            if kind == SectionType::SymbolStubs && self.stub_entry_size.is_none() {
                self.stub_entry_size = Some(header.reserved2);
            }
            trace!("keeping {},{} as {kind}", header.segment_name, header.section_name);
            self.sections.push(Section::new(
                kind,
                label,
                Address::new(header.address),
                header.size,
                self.context.file_offset(u64::from(header.offset)),
            ));
        }
        self.segments.push(command.segment);
    }

    /// Register a blob living in `__LINKEDIT`; its address is the raw offset.
    fn add_linkedit_section(&mut self, kind: SectionType, label: &str, offset: u32, size: u32)
    {
        self.sections.push(Section::new(
            kind,
            label,
            Address::new(u64::from(offset)),
            u64::from(size),
            self.context.file_offset(u64::from(offset)),
        ));
    }

    fn apply(&mut self, command: LoadCommand)
    {
        match command {
            LoadCommand::Segment(segment) => self.add_segment(segment),
            LoadCommand::Symtab(symtab) => {
                self.add_linkedit_section(SectionType::StringTable, "String Table", symtab.stroff, symtab.strsize);
                self.symtab = Some(symtab);
            }
            LoadCommand::Dysymtab(indirect) => self.indirect = Some(indirect),
            LoadCommand::Dylib(dylib) => self.load_info.dylibs.push(dylib),
            LoadCommand::Dylinker(path) => self.load_info.dylinker = Some(path),
            LoadCommand::DyldEnvironment(value) => self.load_info.dyld_environment.push(value),
            LoadCommand::Rpath(path) => self.load_info.rpaths.push(path),
            LoadCommand::Uuid(uuid) => self.load_info.uuid = Some(uuid),
            LoadCommand::MinimumVersion(min) => self.load_info.minimum_version = Some(min),
            LoadCommand::SourceVersion(version) => self.load_info.source_version = Some(version),
            LoadCommand::Main(entry) => self.load_info.entry_point = Some(entry),
            LoadCommand::LinkEditData { tag, offset, size } => match tag {
                LC_FUNCTION_STARTS => {
                    self.add_linkedit_section(SectionType::FunctionStarts, "Function Starts", offset, size);
                }
                LC_CODE_SIGNATURE => {
                    self.add_linkedit_section(SectionType::CodeSignature, "Code Signature", offset, size);
                }
                _ => trace!("{} data at 0x{offset:x} ({size} bytes) not kept", command_name(tag)),
            },
            LoadCommand::Consumed | LoadCommand::Unknown => {}
        }
    }
}

/// Read the header and every load command of the slice at `base`.
///
/// Leaves the reader in the slice's byte order.
pub fn describe_slice<R: Read + Seek>(reader: &mut Reader<R>, base: u64) -> DecodeResult<SliceLayout>
{
    let (context, header) = read_header(reader, base)?;
    let ncmds = header.ncmds;
    let mut layout = SliceLayout::new(context, header);

    for _ in 0..ncmds {
        let (command_header, command) = read_load_command(reader, &context)?;

        if command_header.is_undersized() {
            warn!(
                "load command 0x{:x} at 0x{:x} declares {} bytes",
                command_header.tag, command_header.offset, command_header.size
            );
            layout.diagnostics.push(Diagnostic::UndersizedLoadCommand {
                tag: command_header.tag,
                offset: command_header.offset,
                size: command_header.size,
            });
        }

        if command == LoadCommand::Unknown {
            debug!(
                "skipping unrecognized load command 0x{:x} at 0x{:x}",
                command_header.tag, command_header.offset
            );
            layout.diagnostics.push(Diagnostic::UnrecognizedLoadCommand {
                tag: command_header.tag,
                offset: command_header.offset,
                size: command_header.size,
            });
            continue;
        }

        layout.apply(command);
    }

    let end = reader.position()?;
    let declared_end = layout.header.commands_end(&context);
    if end > declared_end {
        warn!("load commands of slice at 0x{base:x} run to 0x{end:x}, past sizeofcmds end 0x{declared_end:x}");
    }

    debug!(
        "slice at 0x{base:x} (magic 0x{:08x}): {} sections, {} segments, {} diagnostics",
        layout.header.magic,
        layout.sections.len(),
        layout.segments.len(),
        layout.diagnostics.len()
    );
    Ok(layout)
}
