//! Tests for error handling

mod common;

use common::{fat, linked_slice, SectionSpec, SliceBuilder};
use machscope_core::error::DecodeError;
use machscope_core::parse_bytes;

#[test]
fn test_truncated_header()
{
    let bytes = SliceBuilder::new64().build();
    let err = parse_bytes(&bytes[..20]).unwrap_err();
    assert!(err.is_truncation());
}

#[test]
fn test_truncated_load_commands()
{
    let bytes = SliceBuilder::new64().symtab(0x100, 1, 0x120, 4).build();
    let err = parse_bytes(&bytes[..40]).unwrap_err();
    match err {
        DecodeError::TruncatedInput { offset, wanted } => {
            assert_eq!(offset, 40);
            assert_eq!(wanted, 4);
        }
        other => panic!("expected truncation, got {other:?}"),
    }
}

#[test]
fn test_symbol_table_past_end()
{
    let bytes = linked_slice().build();
    let err = parse_bytes(&bytes[..0x508]).unwrap_err();
    assert!(err.is_truncation());
}

#[test]
fn test_section_past_end()
{
    let bytes = SliceBuilder::new64()
        .segment("__TEXT", &[SectionSpec::text("__text", 0x1000, 0x10_0000, 0x200)])
        .blob(0x200, vec![0xc3; 16])
        .build();

    match parse_bytes(&bytes).unwrap_err() {
        DecodeError::TruncatedInput { offset, wanted } => {
            assert_eq!(offset, 0x200);
            assert_eq!(wanted, 0x10_0000);
        }
        other => panic!("expected truncation, got {other:?}"),
    }
}

#[test]
fn test_huge_symbol_count_fails_without_allocating()
{
    let bytes = SliceBuilder::new64().symtab(0x100, u32::MAX, 0x100, 0).build();
    assert!(parse_bytes(&bytes).unwrap_err().is_truncation());
}

#[test]
fn test_universal_failure_discards_all_slices()
{
    let good = linked_slice().build();
    let bytes = fat(&[(0x1000, good), (0x8000, SliceBuilder::new64().build())]);
    let cut = 0x8000 + 16;
    assert!(parse_bytes(&bytes[..cut]).unwrap_err().is_truncation());
}

#[test]
fn test_universal_directory_truncated()
{
    let bytes = fat(&[(0x1000, SliceBuilder::new64().build())]);
    assert!(parse_bytes(&bytes[..12]).unwrap_err().is_truncation());
}

#[test]
fn test_slice_with_foreign_magic()
{
    let mut bytes = fat(&[(0x1000, SliceBuilder::new64().build())]);
    bytes[0x1000..0x1004].copy_from_slice(&0x464c_457fu32.to_le_bytes());
    assert!(matches!(
        parse_bytes(&bytes),
        Err(DecodeError::UnsupportedMagic(0x464c_457f))
    ));
}

#[test]
fn test_parse_rejects_unknown_magic()
{
    assert!(matches!(
        parse_bytes(b"\x7fELF\x02\x01\x01\x00"),
        Err(DecodeError::UnsupportedMagic(0x464c_457f))
    ));
}

#[test]
fn test_error_display()
{
    let err = DecodeError::TruncatedInput {
        offset: 0x40,
        wanted: 8,
    };
    let message = err.to_string();
    assert!(message.contains("Truncated"));
    assert!(message.contains("0x40"));

    let err = DecodeError::UnsupportedMagic(0xdead_beef);
    assert!(err.to_string().contains("0xdeadbeef"));
}

#[test]
fn test_io_error_conversion()
{
    let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let err: DecodeError = io.into();
    assert!(matches!(err, DecodeError::Io(_)));
    assert!(!err.is_truncation());
}
