use std::error::Error;
use std::fs::File;
use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};
use machsym_core::dyld_cache::CacheHeader;
use machsym_core::macho::MachImage;
use machsym_core::symbols::demangle::{detect_language, display_name};
use machsym_core::symbols::{LookupOptions, Symbol};
use machsym_utils::{info, init_with, LogLevel, LoggingConfig};

type CliResult<T> = Result<T, Box<dyn Error>>;

/// Inspect Mach-O and dyld shared cache symbol tables.
#[derive(Parser, Debug)]
#[command(name = "machsym")]
#[command(version)]
#[command(about = "Inspect Mach-O and dyld shared cache symbol tables", long_about = None)]
struct Cli
{
    /// Log level (error, warn, info, debug, trace); overrides RUST_LOG
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct ImageArgs
{
    /// Path to a Mach-O file
    path: PathBuf,
    /// File offset of the Mach-O header (for a slice of a fat file)
    #[arg(long, default_value = "0", value_parser = parse_u64)]
    header_offset: u64,
}

#[derive(Args, Debug)]
struct FilterArgs
{
    /// Only consider symbols in this 1-based section (0 for any)
    #[arg(long, default_value_t = 0)]
    section: u8,
    /// Only consider externally visible symbols
    #[arg(long, default_value_t = false)]
    global_only: bool,
    /// Print every match instead of the first. With `find`, lists every
    /// symbol of that name and cannot be combined with `--section` or
    /// `--global-only`
    #[arg(long, default_value_t = false)]
    all: bool,
}

impl FilterArgs
{
    fn options(&self) -> LookupOptions
    {
        LookupOptions::default()
            .in_section(self.section)
            .global_only(self.global_only)
    }

    /// Listing every symbol by name looks at the whole table, so the
    /// eligibility filters have nothing to act on.
    fn check_name_filters(&self) -> CliResult<()>
    {
        if self.all && (self.section != 0 || self.global_only) {
            return Err("--all cannot be combined with --section or --global-only".into());
        }
        Ok(())
    }
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// List every symbol of an image
    Symbols
    {
        #[command(flatten)]
        image: ImageArgs,
        /// Show demangled names where possible
        #[arg(long, default_value_t = false)]
        demangle: bool,
    },
    /// List the string table of an image
    Strings
    {
        #[command(flatten)]
        image: ImageArgs,
    },
    /// Find the symbol containing an address
    Lookup
    {
        #[command(flatten)]
        image: ImageArgs,
        /// Address to resolve (hex format: 0x1000 or decimal)
        #[arg(value_parser = parse_u64)]
        address: u64,
        /// Only report symbols starting exactly at the address
        #[arg(long, default_value_t = false)]
        exact: bool,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Find symbols by name
    Find
    {
        #[command(flatten)]
        image: ImageArgs,
        /// Symbol name; a leading underscore may be omitted
        name: String,
        /// The name is already mangled; skip comparing demangled names
        #[arg(long, default_value_t = false)]
        mangled: bool,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// List the local symbols of a dyld shared cache
    CacheLocals
    {
        /// Path to the cache file (or its `.symbols` sub-cache)
        path: PathBuf,
        /// Stop after this many symbols
        #[arg(long)]
        limit: Option<usize>,
    },
}

fn main()
{
    let cli = Cli::parse();

    let config = LoggingConfig::from_env().with_level(cli.log_level);
    let _guard = match init_with(&config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = run_command(cli.command) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run_command(command: Commands) -> CliResult<()>
{
    match command {
        Commands::Symbols { image, demangle } => {
            let image = open_image(&image)?;
            for (index, item) in image.symbols()?.iter().enumerate() {
                match item {
                    Ok(symbol) => println!("{index:>6} {}", format_symbol(&symbol, demangle)),
                    Err(e) => eprintln!("{index:>6} <{e}>"),
                }
            }
            Ok(())
        }
        Commands::Strings { image } => {
            let image = open_image(&image)?;
            let Some(strings) = image.symbol_strings()? else {
                println!("no LC_SYMTAB");
                return Ok(());
            };
            for entry in &strings {
                let entry = entry?;
                println!("0x{:08x} {}", entry.offset, entry.string);
            }
            Ok(())
        }
        Commands::Lookup {
            image,
            address,
            exact,
            filter,
        } => {
            let image = open_image(&image)?;
            let resolver = image.resolver()?;
            let options = filter.options();
            let found = match (exact, filter.all) {
                (false, false) => resolver.closest_symbol(address, options).into_iter().collect(),
                (false, true) => resolver.closest_symbols(address, options),
                (true, false) => resolver.symbol_for(address, options).into_iter().collect(),
                (true, true) => resolver.symbols_for(address, options),
            };
            print_matches(&found, Some(address));
            Ok(())
        }
        Commands::Find {
            image,
            name,
            mangled,
            filter,
        } => {
            filter.check_name_filters()?;
            let image = open_image(&image)?;
            let resolver = image.resolver()?;
            let found: Vec<&Symbol> = if filter.all {
                resolver.symbols_named(&name, mangled)
            } else {
                resolver
                    .symbol_named(&name, mangled, filter.options())
                    .into_iter()
                    .collect()
            };
            print_matches(&found, None);
            Ok(())
        }
        Commands::CacheLocals { path, limit } => {
            let file = File::open(&path)?;
            let cache = CacheHeader::read(&file)?;
            info!(architecture = cache.architecture(), "opened shared cache {}", path.display());

            let Some(locals) = cache.local_symbols_info(&file)? else {
                println!("{}: no local symbols", path.display());
                return Ok(());
            };
            let symbols = locals.symbols(&file, &cache)?;
            println!(
                "{} ({}), {} local symbols",
                path.display(),
                cache.architecture(),
                symbols.count()
            );
            for item in symbols.iter().take(limit.unwrap_or(usize::MAX)) {
                match item {
                    Ok(symbol) => println!("{}", format_symbol(&symbol, false)),
                    Err(e) => eprintln!("<{e}>"),
                }
            }
            Ok(())
        }
    }
}

fn open_image(args: &ImageArgs) -> CliResult<MachImage>
{
    info!("Loading {} at offset 0x{:x}", args.path.display(), args.header_offset);
    Ok(MachImage::open(&args.path, args.header_offset)?)
}

fn format_symbol(symbol: &Symbol, demangle: bool) -> String
{
    let name = if demangle {
        display_name(&symbol.name)
    } else {
        symbol.name.clone()
    };
    format!(
        "0x{:016x} {:<6} sect {:>3} {:<7} {}",
        symbol.offset,
        symbol.record.kind.symbol_type(),
        symbol.section_number(),
        detect_language(&symbol.name),
        name
    )
}

fn print_matches(found: &[&Symbol], address: Option<u64>)
{
    if found.is_empty() {
        println!("not found");
        return;
    }
    for symbol in found {
        match address {
            Some(address) if address > symbol.offset => {
                println!("{} + 0x{:x}", format_symbol(symbol, true), address - symbol.offset);
            }
            _ => println!("{}", format_symbol(symbol, true)),
        }
    }
}

/// Parse `0x`-prefixed hex or decimal.
fn parse_u64(value: &str) -> Result<u64, String>
{
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse::<u64>(),
    };
    parsed.map_err(|e| format!("invalid number '{value}': {e}"))
}

#[cfg(test)]
mod tests
{
    use machsym_core::symbols::SymbolRecord;
    use machsym_core::types::{SymbolDescriptor, SymbolKind};

    use super::*;

    #[test]
    fn test_parse_u64()
    {
        assert_eq!(parse_u64("0x1000"), Ok(0x1000));
        assert_eq!(parse_u64("0XfF"), Ok(0xff));
        assert_eq!(parse_u64("4096"), Ok(4096));
        assert!(parse_u64("0xzz").is_err());
        assert!(parse_u64("").is_err());
    }

    #[test]
    fn test_cli_parses()
    {
        let cli = Cli::try_parse_from([
            "machsym",
            "--log-level",
            "debug",
            "lookup",
            "a.out",
            "0x1010",
            "--section",
            "1",
            "--all",
        ])
        .unwrap();
        assert_eq!(cli.log_level, Some(LogLevel::Debug));
        match cli.command {
            Commands::Lookup {
                address, exact, filter, ..
            } => {
                assert_eq!(address, 0x1010);
                assert!(!exact);
                assert!(filter.all);
                assert_eq!(filter.options(), LookupOptions::default().in_section(1));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    fn symbol(name: &str, n_type: u8, offset: u64) -> Symbol
    {
        Symbol {
            name: name.to_string(),
            offset,
            record: SymbolRecord {
                string_index: 1,
                kind: SymbolKind::new(n_type),
                section_number: 1,
                descriptor: SymbolDescriptor::default(),
                value: offset,
            },
        }
    }

    #[test]
    fn test_format_symbol_shows_language()
    {
        let rust = symbol("__ZN4core3fmt5write17h0123456789abcdefE", 0x0f, 0x4000);
        assert_eq!(
            format_symbol(&rust, true),
            "0x0000000000004000 N_SECT sect   1 rust    core::fmt::write"
        );
        assert!(format_symbol(&rust, false).ends_with(" rust    __ZN4core3fmt5write17h0123456789abcdefE"));

        let c = symbol("_main", 0x0f, 0x1000);
        assert_eq!(format_symbol(&c, false), "0x0000000000001000 N_SECT sect   1 c       _main");
        assert!(format_symbol(&symbol("__Z3foov", 0x0e, 0x10), false).contains(" c++     __Z3foov"));
    }

    #[test]
    fn test_find_all_rejects_filters()
    {
        fn parse(args: &[&str]) -> FilterArgs
        {
            match Cli::try_parse_from(args).unwrap().command {
                Commands::Find { filter, .. } => filter,
                other => panic!("unexpected command {other:?}"),
            }
        }

        assert!(parse(&["machsym", "find", "a.out", "main", "--all"]).check_name_filters().is_ok());
        assert!(parse(&["machsym", "find", "a.out", "main", "--section", "1"]).check_name_filters().is_ok());
        assert!(parse(&["machsym", "find", "a.out", "main", "--all", "--section", "1"])
            .check_name_filters()
            .is_err());
        assert!(parse(&["machsym", "find", "a.out", "main", "--all", "--global-only"])
            .check_name_filters()
            .is_err());
    }
}
