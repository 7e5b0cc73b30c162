//! Materialize phase: symbol tables, section content and name resolution.

use std::io::{Read, Seek};

use tracing::{debug, trace};

use super::commands::{IndirectSymbols, SymtabCommand};
use super::constants::NLIST_FIXED_SIZE;
use super::header::SliceContext;
use super::layout::SliceLayout;
use super::DecodeOptions;
use crate::error::DecodeResult;
use crate::reader::{c_string, Reader};
use crate::types::{
    Address, BinaryObject, Diagnostic, Section, SectionType, SymbolEntry, SymbolTable, SymbolTableKind,
};

/// Turn a described slice into a finished [`BinaryObject`].
pub fn materialize<R: Read + Seek>(
    reader: &mut Reader<R>,
    layout: SliceLayout,
    options: &DecodeOptions,
) -> DecodeResult<BinaryObject>
{
    let SliceLayout {
        context,
        header,
        mut sections,
        segments,
        symtab,
        indirect,
        stub_entry_size,
        load_info,
        mut diagnostics,
    } = layout;

    let mut symbols = SymbolTable::new();
    if let Some(symtab) = symtab {
        let (table, section) = read_symbol_table(reader, &context, symtab)?;
        symbols = table;
        sections.push(section);
    }

    let mut dynamic_symbols = SymbolTable::new();
    if let Some(indirect) = indirect {
        let (table, section) = read_indirect_table(reader, &context, indirect)?;
        dynamic_symbols = table;
        sections.push(section);
    }

    for section in &mut sections {
        let data = reader.shared_bytes(section.offset(), section.size())?;
        section.set_data(data);
    }

    let mut object = BinaryObject::new(context.bitness, context.endian, context.base);
    object.set_architecture(header.cpu_type, header.cpu_subtype, header.file_type, header.flags);
    for section in sections {
        object.add_section(section);
    }

    let strings = object.section(SectionType::StringTable).map_or(&[][..], Section::data);
    resolve_names(&mut symbols, strings, &mut diagnostics);

    if let Some(stubs) = object.section(SectionType::SymbolStubs) {
        let stub_size = options.stub_size.resolve(header.cpu_type, stub_entry_size);
        resolve_dynamic(&mut dynamic_symbols, &symbols, stubs.address(), stub_size, &mut diagnostics);
    }

    object.set_segments(segments);
    object.set_symbol_tables(symbols, dynamic_symbols);
    object.set_load_info(load_info);
    object.set_diagnostics(diagnostics);
    Ok(object)
}

fn read_symbol_table<R: Read + Seek>(
    reader: &mut Reader<R>,
    context: &SliceContext,
    symtab: SymtabCommand,
) -> DecodeResult<(SymbolTable, Section)>
{
    let start = context.file_offset(u64::from(symtab.symoff));
    reader.seek(start)?;

    let mut table = SymbolTable::new();
    for _ in 0..symtab.nsyms {
        let strx = reader.read_u32()?;
        let kind = reader.read_u8()?;
        let section = reader.read_u8()?;
        let description = reader.read_u16()?;
        let value = reader.read_word(context.bitness)?;
        table.push(SymbolEntry::with_nlist(strx, value, kind, section, description));
    }

    let entry_size = NLIST_FIXED_SIZE + context.bitness.word_size();
    let size = u64::from(symtab.nsyms) * entry_size;
    trace!("read {} symbols at 0x{start:x}", table.len());

    let section = Section::new(
        SectionType::SymbolTable,
        "Symbol Table",
        Address::new(u64::from(symtab.symoff)),
        size,
        start,
    );
    Ok((table, section))
}

fn read_indirect_table<R: Read + Seek>(
    reader: &mut Reader<R>,
    context: &SliceContext,
    indirect: IndirectSymbols,
) -> DecodeResult<(SymbolTable, Section)>
{
    let start = context.file_offset(u64::from(indirect.offset));
    reader.seek(start)?;

    let mut table = SymbolTable::new();
    for _ in 0..indirect.count {
        table.push(SymbolEntry::new(reader.read_u32()?, 0));
    }
    trace!("read {} indirect symbols at 0x{start:x}", table.len());

    let section = Section::new(
        SectionType::DynamicSymbolTable,
        "Dynamic Symbol Table",
        Address::new(u64::from(indirect.offset)),
        u64::from(indirect.count) * 4,
        start,
    );
    Ok((table, section))
}

/// Name every primary symbol from the string table.
///
/// The name runs from `strx` to the first NUL or the end of the table.
pub(crate) fn resolve_names(symbols: &mut SymbolTable, strings: &[u8], diagnostics: &mut Vec<Diagnostic>)
{
    for (position, symbol) in symbols.iter_mut().enumerate() {
        let index = symbol.index();
        match usize::try_from(index).ok().and_then(|start| strings.get(start..)) {
            Some(tail) if !tail.is_empty() => symbol.resolve(c_string(tail)),
            _ => {
                debug!("symbol {position} has string index {index} outside {} bytes", strings.len());
                diagnostics.push(Diagnostic::UnresolvedSymbol {
                    table: SymbolTableKind::Primary,
                    position,
                    index,
                });
            }
        }
    }
}

/// Name indirect entries after the primary symbol they point at and give
/// entry `h` the address of stub `h`.
pub(crate) fn resolve_dynamic(
    dynamic: &mut SymbolTable,
    primary: &SymbolTable,
    stub_start: Address,
    stub_size: u64,
    diagnostics: &mut Vec<Diagnostic>,
)
{
    if primary.is_empty() {
        return;
    }

    let mut unresolved = 0usize;
    for (position, entry) in dynamic.iter_mut().enumerate() {
        let index = entry.index();
        let target = usize::try_from(index).ok().and_then(|i| primary.get(i));
        let Some(target) = target else {
            unresolved += 1;
            diagnostics.push(Diagnostic::UnresolvedSymbol {
                table: SymbolTableKind::Dynamic,
                position,
                index,
            });
            continue;
        };

        entry.resolve(target.name().to_string());
        let stub = (position as u64).wrapping_mul(stub_size);
        entry.set_value(stub_start.offset(stub).value());
    }

    if unresolved > 0 {
        debug!("{unresolved} indirect symbols point outside the symbol table");
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn primary(indices: &[u32], strings: &[u8]) -> SymbolTable
    {
        let mut table: SymbolTable = indices.iter().map(|&strx| SymbolEntry::new(strx, 0)).collect();
        let mut diagnostics = Vec::new();
        resolve_names(&mut table, strings, &mut diagnostics);
        assert!(diagnostics.is_empty());
        table
    }

    #[test]
    fn test_resolve_names_from_pool()
    {
        let strings = b"foo\0bar\0";
        let mut table: SymbolTable = [0, 4].into_iter().map(|i| SymbolEntry::new(i, 0)).collect();
        let mut diagnostics = Vec::new();
        resolve_names(&mut table, strings, &mut diagnostics);

        assert_eq!(table.get(0).unwrap().name(), "foo");
        assert_eq!(table.get(1).unwrap().name(), "bar");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_unterminated_name_runs_to_end()
    {
        let mut table: SymbolTable = std::iter::once(SymbolEntry::new(2, 0)).collect();
        let mut diagnostics = Vec::new();
        resolve_names(&mut table, b"__main", &mut diagnostics);
        assert_eq!(table.get(0).unwrap().name(), "main");
    }

    #[test]
    fn test_out_of_range_name_is_empty()
    {
        let mut table: SymbolTable = [0, 99].into_iter().map(|i| SymbolEntry::new(i, 0)).collect();
        let mut diagnostics = Vec::new();
        resolve_names(&mut table, b"foo\0", &mut diagnostics);

        let missing = table.get(1).unwrap();
        assert_eq!(missing.name(), "");
        assert!(!missing.is_resolved());
        assert_eq!(
            diagnostics,
            vec![Diagnostic::UnresolvedSymbol {
                table: SymbolTableKind::Primary,
                position: 1,
                index: 99,
            }]
        );
    }

    #[test]
    fn test_dynamic_stub_addresses()
    {
        let primary = primary(&[0, 4], b"foo\0bar\0");
        let mut dynamic: SymbolTable = [1, 0].into_iter().map(|i| SymbolEntry::new(i, 0)).collect();
        let mut diagnostics = Vec::new();
        resolve_dynamic(&mut dynamic, &primary, Address::new(0x1000), 6, &mut diagnostics);

        let first = dynamic.get(0).unwrap();
        assert_eq!(first.name(), "bar");
        assert_eq!(first.value(), 0x1000);
        let second = dynamic.get(1).unwrap();
        assert_eq!(second.name(), "foo");
        assert_eq!(second.value(), 0x1006);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_dynamic_out_of_range_keeps_zero()
    {
        let primary = primary(&[0], b"foo\0");
        let mut dynamic: SymbolTable = [0x8000_0000, 0].into_iter().map(|i| SymbolEntry::new(i, 0)).collect();
        let mut diagnostics = Vec::new();
        resolve_dynamic(&mut dynamic, &primary, Address::new(0x2000), 12, &mut diagnostics);

        let local = dynamic.get(0).unwrap();
        assert_eq!(local.name(), "");
        assert_eq!(local.value(), 0);
        assert_eq!(dynamic.get(1).unwrap().value(), 0x200c);
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_dynamic_needs_primary_symbols()
    {
        let mut dynamic: SymbolTable = std::iter::once(SymbolEntry::new(0, 0)).collect();
        let mut diagnostics = Vec::new();
        resolve_dynamic(&mut dynamic, &SymbolTable::new(), Address::new(0x1000), 6, &mut diagnostics);
        assert!(!dynamic.get(0).unwrap().is_resolved());
        assert!(diagnostics.is_empty());
    }
}
