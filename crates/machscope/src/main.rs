use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use machscope_core::format::{DecodeOptions, Format, MachO, StubSize};
use machscope_core::types::{BinaryObject, Section, SymbolTableKind};
use machscope_core::Reader;
use machscope_utils::logging::log_format_from_env;
use machscope_utils::{
    debug, info, init_logging, init_logging_to_dir, init_logging_with_level, LogFormat, LogLevel, LoggingError,
    LoggingGuard,
};

/// Inspect Mach-O and universal binaries.
#[derive(Parser, Debug)]
#[command(name = "machscope")]
#[command(version)]
#[command(about = "Inspect Mach-O and universal binaries", long_about = None)]
struct Cli
{
    /// Log level (error, warn, info, debug, trace); overrides RUST_LOG
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Log format (pretty or json); defaults to MACHSCOPE_LOG_FORMAT or pretty
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Also write logs to a dated file in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Stub entry size: legacy, section, arch, or a byte count
    #[arg(long, global = true, default_value_t = StubSize::Legacy)]
    stub_size: StubSize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Show architecture, file type and load metadata of every slice
    Info
    {
        /// Path to the binary
        file: PathBuf,
    },
    /// List the decoded sections of every slice
    Sections
    {
        /// Path to the binary
        file: PathBuf,
        /// Print a hex dump of each section's content
        #[arg(long, default_value_t = false)]
        dump: bool,
    },
    /// List symbols of every slice
    Symbols
    {
        /// Path to the binary
        file: PathBuf,
        /// List the stub-linked dynamic symbols instead of the symbol table
        #[arg(long, default_value_t = false)]
        dynamic: bool,
        /// Show demangled names where possible
        #[arg(long, default_value_t = false)]
        demangle: bool,
    },
    /// Report whether a file is a Mach-O or universal binary
    Detect
    {
        /// Path to the file
        file: PathBuf,
    },
}

fn main()
{
    let cli = Cli::parse();

    let _guard = match setup_logging(&cli) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = run_command(cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn setup_logging(cli: &Cli) -> Result<LoggingGuard, LoggingError>
{
    let format = cli.log_format.unwrap_or_else(log_format_from_env);
    if let Some(dir) = &cli.log_dir {
        let (path, guard) = init_logging_to_dir(dir, cli.log_level, format)?;
        debug!("Writing logs to {}", path.display());
        return Ok(guard);
    }
    match cli.log_level {
        Some(level) => init_logging_with_level(level, format),
        None if cli.log_format.is_some() => init_logging_with_level(LogLevel::Info, format),
        None => init_logging(),
    }
}

fn run_command(cli: Cli) -> Result<(), Box<dyn std::error::Error>>
{
    let decoder = MachO::with_options(DecodeOptions {
        stub_size: cli.stub_size,
    });

    match cli.command {
        Commands::Detect { file } => {
            let mut reader = open(&file)?;
            if decoder.detect(&mut reader) {
                println!("{}: {}", file.display(), decoder.name());
            } else {
                println!("{}: not a Mach-O or universal binary", file.display());
            }
            Ok(())
        }
        Commands::Info { file } => {
            for (index, object) in decode(&decoder, &file)?.iter().enumerate() {
                print_info(index, object);
            }
            Ok(())
        }
        Commands::Sections { file, dump } => {
            for (index, object) in decode(&decoder, &file)?.iter().enumerate() {
                print_slice_title(index, object);
                print_sections(object, dump);
            }
            Ok(())
        }
        Commands::Symbols {
            file,
            dynamic,
            demangle,
        } => {
            let kind = if dynamic {
                SymbolTableKind::Dynamic
            } else {
                SymbolTableKind::Primary
            };
            for (index, object) in decode(&decoder, &file)?.iter().enumerate() {
                print_slice_title(index, object);
                print_symbols(object, kind, demangle);
            }
            Ok(())
        }
    }
}

fn open(path: &Path) -> Result<Reader<BufReader<File>>, std::io::Error>
{
    let file = File::open(path)?;
    Ok(Reader::new(BufReader::new(file)))
}

fn decode(decoder: &MachO, path: &Path) -> Result<Vec<BinaryObject>, Box<dyn std::error::Error>>
{
    info!("Decoding {}", path.display());
    let mut reader = open(path)?;
    if !decoder.detect(&mut reader) {
        return Err(format!("{}: not a Mach-O or universal binary", path.display()).into());
    }
    let objects = decoder.parse(&mut reader)?;
    debug!("Decoded {} slice(s)", objects.len());
    Ok(objects)
}

fn print_slice_title(index: usize, object: &BinaryObject)
{
    println!(
        "== slice {index}: {} ({}) at 0x{:x} ==",
        object.cpu_type(),
        object.cpu_subtype(),
        object.base_offset()
    );
}

fn print_info(index: usize, object: &BinaryObject)
{
    print_slice_title(index, object);
    println!("  Format:       {} {}", object.bitness(), object.endian());
    println!("  File type:    {}", object.file_type());
    println!("  Flags:        0x{:08x}", object.flags());
    println!("  Sections:     {}", object.sections().len());
    println!("  Symbols:      {}", object.symbol_table().len());
    println!("  Dynamic:      {}", object.dynamic_symbol_table().len());

    let load = object.load_info();
    if let Some(uuid) = load.uuid_string() {
        println!("  UUID:         {uuid}");
    }
    if let Some(min) = &load.minimum_version {
        println!("  Minimum OS:   {} {} (SDK {})", min.platform, min.version, min.sdk);
    }
    if let Some(version) = load.source_version {
        println!("  Source:       {version}");
    }
    if let Some(entry) = load.entry_point {
        println!("  Entry offset: 0x{:x}", entry.file_offset);
    }
    if let Some(dylinker) = &load.dylinker {
        println!("  Dylinker:     {dylinker}");
    }
    for dylib in &load.dylibs {
        println!("  Dylib:        {} [{}] {}", dylib.path, dylib.kind, dylib.current_version);
    }
    for rpath in &load.rpaths {
        println!("  Rpath:        {rpath}");
    }

    if !object.segments().is_empty() {
        println!("  Segments:");
        for segment in object.segments() {
            println!(
                "    {:<16} {} size 0x{:x} {}/{}",
                segment.name, segment.address, segment.vm_size, segment.initial_protection, segment.max_protection
            );
        }
    }

    for diagnostic in object.diagnostics() {
        println!("  warning: {diagnostic}");
    }
}

fn print_sections(object: &BinaryObject, dump: bool)
{
    for section in object.sections() {
        println!(
            "  {:<22} {:<20} addr {} size 0x{:<8x} offset 0x{:x}",
            section.label(),
            section.kind().to_string(),
            section.address(),
            section.size(),
            section.offset()
        );
        if dump {
            print_hex(section);
        }
    }
}

fn print_hex(section: &Section)
{
    let base = section.address().value();
    for (row, chunk) in section.data().chunks(16).enumerate() {
        let hex: Vec<String> = chunk.iter().map(|b| format!("{b:02x}")).collect();
        let ascii: String = chunk
            .iter()
            .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
            .collect();
        println!("    {:016x}  {:<47}  {ascii}", base.wrapping_add(row as u64 * 16), hex.join(" "));
    }
}

fn print_symbols(object: &BinaryObject, kind: SymbolTableKind, demangle: bool)
{
    let table = object.symbols(kind);
    if table.is_empty() {
        println!("  no {kind}");
        return;
    }
    for symbol in table {
        let name = if demangle {
            symbol.demangled().unwrap_or_else(|| symbol.name().to_string())
        } else {
            symbol.name().to_string()
        };
        println!("  0x{:016x}  {:>6}  {name}", symbol.value(), symbol.index());
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_parse_symbols_command()
    {
        let cli = Cli::try_parse_from(["machscope", "symbols", "a.out", "--dynamic", "--stub-size", "arch"]).unwrap();
        assert_eq!(cli.stub_size, StubSize::PerArchitecture);
        assert!(matches!(cli.command, Commands::Symbols { dynamic: true, demangle: false, .. }));
    }

    #[test]
    fn test_global_flags_after_subcommand()
    {
        let cli = Cli::try_parse_from(["machscope", "info", "a.out", "--log-level", "trace", "--stub-size", "12"]).unwrap();
        assert_eq!(cli.log_level, Some(LogLevel::Trace));
        assert_eq!(cli.stub_size, StubSize::Fixed(12));
    }

    #[test]
    fn test_defaults()
    {
        let cli = Cli::try_parse_from(["machscope", "sections", "a.out"]).unwrap();
        assert_eq!(cli.stub_size, StubSize::Legacy);
        assert!(cli.log_level.is_none());
        assert!(cli.log_dir.is_none());
        assert!(matches!(cli.command, Commands::Sections { dump: false, .. }));
    }

    #[test]
    fn test_rejects_bad_stub_size()
    {
        assert!(Cli::try_parse_from(["machscope", "info", "a.out", "--stub-size", "huge"]).is_err());
    }

    #[test]
    fn test_missing_file_is_an_error()
    {
        let decoder = MachO::new();
        assert!(decode(&decoder, Path::new("/nonexistent/machscope-input")).is_err());
    }
}
