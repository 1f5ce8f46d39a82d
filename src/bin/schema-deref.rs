//! Schema Dereferencer CLI
//!
//! Reads a JSON Schema, inlines every `$ref` and writes the result.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::Parser;
use schema_deref::{
    check_schema, write_output, CircularPolicy, DerefOptions, Dereferencer, DEFAULT_MAX_DEPTH,
    DEFAULT_MAX_NESTING, STDOUT,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-deref")]
#[command(about = "Resolve and inline $ref pointers in a JSON Schema")]
#[command(version)]
struct Cli {
    /// Input schema: file path or URL (http:// or https://)
    input: String,

    /// Output file (`-` for stdout)
    output: PathBuf,

    /// Circular reference handling: marker, error, or inline
    #[arg(long, default_value = "marker", value_parser = parse_policy)]
    circular: CircularPolicy,

    /// Timeout for each external document, in milliseconds
    #[arg(long, default_value_t = 10_000)]
    timeout_ms: u64,

    /// Time budget for the whole run, in milliseconds
    #[arg(long)]
    deadline_ms: Option<u64>,

    /// Maximum number of nested $ref expansions
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// Deepest output level at which a $ref is still expanded
    #[arg(long, default_value_t = DEFAULT_MAX_NESTING)]
    max_nesting: usize,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    /// Check that the result compiles as a JSON Schema before writing it
    #[arg(long)]
    check: bool,

    /// Log loads and circular references to stderr
    #[arg(long, short)]
    verbose: bool,
}

fn parse_policy(s: &str) -> Result<CircularPolicy, String> {
    CircularPolicy::parse(s)
        .ok_or_else(|| format!("expected marker, error, or inline, got \"{}\"", s))
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => return usage_or_exit(e),
    };

    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

/// Wrong positional argument count prints the usage on stdout; other
/// argument errors (and --help / --version) are left to clap.
fn usage_or_exit(err: clap::Error) -> ExitCode {
    let wrong_count = match err.kind() {
        ErrorKind::MissingRequiredArgument => true,
        ErrorKind::UnknownArgument => is_positional(err.get(ContextKind::InvalidArg)),
        _ => false,
    };
    if !wrong_count {
        err.exit();
    }

    println!(
        "Error: You must specify the input path and the output path\n\
         \tUsage: {} \"input path\" \"output path\"",
        env!("CARGO_BIN_NAME")
    );
    ExitCode::from(2)
}

/// True when clap rejected a bare value rather than an unknown flag.
fn is_positional(arg: Option<&ContextValue>) -> bool {
    match arg {
        Some(ContextValue::String(arg)) => arg == "-" || !arg.starts_with('-'),
        _ => false,
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "warn,schema_deref=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> Result<(), u8> {
    let options = DerefOptions::new()
        .circular(cli.circular)
        .loader_timeout(Duration::from_millis(cli.timeout_ms))
        .max_depth(cli.max_depth)
        .max_nesting(cli.max_nesting)
        .deadline(cli.deadline_ms.map(Duration::from_millis));

    info!(input = %cli.input, circular = ?cli.circular, "dereferencing");
    let resolved = Dereferencer::new(options)
        .dereference_source(&cli.input)
        .map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })?;

    if cli.check {
        check_schema(&resolved).map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })?;
    }

    write_output(&resolved, &cli.output, cli.pretty).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    if cli.output != Path::new(STDOUT) {
        println!("Dereferenced schema written to {}", cli.output.display());
    }

    Ok(())
}
