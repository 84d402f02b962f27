use clap::{Parser, Subcommand};
use std::ffi::CString;
use std::io;

use staticlang_runtime::{print_double, print_int, print_string, Runtime, RuntimeConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "slrt")]
#[command(about = "StaticLang runtime driver")]
#[command(version)]
struct Cli {
    /// Track allocations and print the memory ledger on exit (also SL_DEBUG_MEMORY)
    #[arg(long, global = true)]
    debug_memory: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print an integer
    PrintInt { value: i32 },
    /// Print a floating-point value
    PrintDouble {
        #[arg(allow_negative_numbers = true)]
        value: f64,
    },
    /// Print a string (nothing when absent)
    PrintString { value: Option<String> },
    /// Concatenate two optional strings and print the result
    Concat {
        #[arg(long)]
        a: Option<String>,
        #[arg(long)]
        b: Option<String>,
    },
    /// Compare two optional strings and print the result
    Compare {
        #[arg(long)]
        a: Option<String>,
        #[arg(long)]
        b: Option<String>,
    },
    /// Allocate a block (or a zeroed array with --count), print its address, release it
    Alloc {
        size: usize,
        #[arg(long)]
        count: Option<usize>,
    },
}

fn main() -> miette::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    tracing::debug!(debug_memory = cli.debug_memory, "starting slrt");

    let config = runtime_config(cli.debug_memory)?;
    let rt = Runtime::from_config(&config);

    run(&rt, cli.command)?;

    if rt.is_tracking() {
        rt.report_ledger();
    }
    Ok(())
}

/// `--debug-memory` forces tracking; otherwise SL_DEBUG_MEMORY decides
fn runtime_config(debug_memory: bool) -> miette::Result<RuntimeConfig> {
    let mut config =
        RuntimeConfig::from_env().map_err(|e| miette::miette!("Invalid configuration: {}", e))?;
    config.debug_memory |= debug_memory;
    Ok(config)
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn run(rt: &Runtime, command: Commands) -> miette::Result<()> {
    match command {
        Commands::PrintInt { value } => print_int(value),
        Commands::PrintDouble { value } => print_double(value),
        Commands::PrintString { value } => {
            let value = to_c_string(value)?;
            print_string(value.as_deref());
        }
        Commands::Concat { a, b } => {
            let (a, b) = (to_c_string(a)?, to_c_string(b)?);
            let joined = rt
                .concat(a.as_deref(), b.as_deref())
                .map_err(|e| miette::miette!("Concat failed: {}", e))?;
            if let Some(joined) = joined {
                print_string(Some(&joined));
                rt.release_string(joined);
            }
        }
        Commands::Compare { a, b } => {
            let (a, b) = (to_c_string(a)?, to_c_string(b)?);
            print_int(Runtime::compare(a.as_deref(), b.as_deref()));
        }
        Commands::Alloc { size, count } => {
            let block = match count {
                Some(count) => rt.try_allocate_array(size, count),
                None => rt.try_allocate(size),
            }
            .map_err(|e| miette::miette!("Allocation failed: {}", e))?;
            println!("{:p}", block.as_ptr());
            rt.release(Some(block));
        }
    }
    Ok(())
}

fn to_c_string(value: Option<String>) -> miette::Result<Option<CString>> {
    value
        .map(|s| CString::new(s).map_err(|e| miette::miette!("Invalid string argument: {}", e)))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use staticlang_runtime::DEBUG_MEMORY_ENV;

    #[test]
    fn test_parse_concat_with_absent_operand() {
        let cli = Cli::try_parse_from(["slrt", "concat", "--a", "foo"]).unwrap();
        assert!(!cli.debug_memory);
        match cli.command {
            Commands::Concat { a, b } => {
                assert_eq!(a.as_deref(), Some("foo"));
                assert_eq!(b, None);
            }
            _ => panic!("expected concat"),
        }
    }

    #[test]
    fn test_parse_global_debug_flag() {
        let cli = Cli::try_parse_from(["slrt", "alloc", "16", "--count", "4", "--debug-memory"])
            .unwrap();
        assert!(cli.debug_memory);
        assert!(matches!(
            cli.command,
            Commands::Alloc {
                size: 16,
                count: Some(4)
            }
        ));
    }

    #[test]
    #[serial]
    fn test_debug_memory_from_env() {
        std::env::set_var(DEBUG_MEMORY_ENV, "1");
        let cli = Cli::try_parse_from(["slrt", "print-int", "1"]).unwrap();
        assert!(!cli.debug_memory);
        assert!(runtime_config(cli.debug_memory).unwrap().debug_memory);

        std::env::set_var(DEBUG_MEMORY_ENV, "off");
        assert!(!runtime_config(false).unwrap().debug_memory);
        assert!(runtime_config(true).unwrap().debug_memory);

        std::env::set_var(DEBUG_MEMORY_ENV, "sometimes");
        assert!(runtime_config(false).is_err());

        std::env::remove_var(DEBUG_MEMORY_ENV);
        assert_eq!(runtime_config(false).unwrap(), RuntimeConfig::default());
        assert!(runtime_config(true).unwrap().debug_memory);
    }

    #[test]
    fn test_parse_negative_double() {
        let cli = Cli::try_parse_from(["slrt", "print-double", "-1.5"]).unwrap();
        assert!(matches!(cli.command, Commands::PrintDouble { value } if value == -1.5));
    }

    #[test]
    fn test_run_commands() {
        let rt = Runtime::plain();
        run(&rt, Commands::PrintInt { value: 1 }).unwrap();
        run(
            &rt,
            Commands::Concat {
                a: Some("foo".into()),
                b: Some("bar".into()),
            },
        )
        .unwrap();
        run(&rt, Commands::Concat { a: None, b: None }).unwrap();
        run(&rt, Commands::Alloc { size: 8, count: Some(2) }).unwrap();
    }

    #[test]
    fn test_run_rejects_interior_nul() {
        let rt = Runtime::plain();
        let result = run(
            &rt,
            Commands::PrintString {
                value: Some("a\0b".into()),
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_run_alloc_overflow_is_error() {
        let rt = Runtime::plain();
        let result = run(
            &rt,
            Commands::Alloc {
                size: usize::MAX,
                count: Some(2),
            },
        );
        assert!(result.is_err());
    }
}
