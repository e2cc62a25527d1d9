//! Kiln command-line interface
//!
//! `kiln <source>` lexes, parses, resolves and interprets one source file.
//! Diagnostics go to stderr as `row:col: message` lines; the exit code is 0
//! on success and 1 on any error, including a missing `main`.

use anyhow::{Context, Result};
use clap::Parser;
use kiln_common::Diagnostics;
use kiln_interp::{install_basics, InterpConfig, Interpreter, SystemConsole};
use kiln_resolver::Resolver;
use log::debug;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The Kiln language compiler and interpreter
#[derive(Parser)]
#[command(name = "kiln")]
#[command(about = "The Kiln language compiler and interpreter")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Source file to compile and run
    source: PathBuf,

    /// Stop after resolution without executing
    #[arg(long)]
    check: bool,

    /// Write the syntax tree as JSON
    #[arg(long, value_name = "PATH")]
    dump_ast: Option<PathBuf>,

    /// Write the resolved program as JSON
    #[arg(long, value_name = "PATH")]
    dump_ir: Option<PathBuf>,

    /// Interpreter stack size in bytes
    #[arg(long, default_value_t = 4 * 1024 * 1024)]
    stack_size: usize,

    /// Abort execution after this many milliseconds
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn report(diagnostics: &Diagnostics) {
    for diagnostic in diagnostics.errors() {
        eprintln!("{}", diagnostic.report());
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false)
        .init();

    let source = fs::read_to_string(&cli.source)
        .with_context(|| format!("could not read '{}'", cli.source.display()))?;

    let (tree, mut diagnostics) = kiln_parser::parse_source(&source);
    if let Some(path) = &cli.dump_ast {
        let file = fs::File::create(path)
            .with_context(|| format!("could not create '{}'", path.display()))?;
        serde_json::to_writer_pretty(file, &tree)?;
    }
    if diagnostics.has_errors() {
        report(&diagnostics);
        return Ok(ExitCode::FAILURE);
    }
    debug!("parsed {} top-level item(s)", tree.items.len());

    let mut resolver = Resolver::new();
    let registry = install_basics(&mut resolver);
    let (program, resolve_diagnostics) = resolver.resolve(&tree);
    diagnostics.extend(resolve_diagnostics);

    if let Some(path) = &cli.dump_ir {
        let file = fs::File::create(path)
            .with_context(|| format!("could not create '{}'", path.display()))?;
        serde_json::to_writer_pretty(file, &program)?;
    }
    if diagnostics.has_errors() {
        report(&diagnostics);
        return Ok(ExitCode::FAILURE);
    }
    debug!(
        "resolved {} procedure(s), {} byte global segment",
        program.procedures.len(),
        program.global_size
    );

    if cli.check {
        return Ok(ExitCode::SUCCESS);
    }

    let mut console = SystemConsole::new();
    let config = InterpConfig { stack_size: cli.stack_size };
    let mut interp = Interpreter::new(&program, &registry, &mut console, config);

    // The timeout harness is an outer collaborator: a watchdog raises the
    // interpreter's cancellation flag, which is checked between statements.
    if let Some(timeout_ms) = cli.timeout_ms {
        let flag = Arc::new(AtomicBool::new(false));
        interp.set_interrupt(flag.clone());
        std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(timeout_ms));
            flag.store(true, Ordering::Relaxed);
        });
    }

    match interp.run() {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(error) => {
            eprintln!("{}", error);
            Ok(ExitCode::FAILURE)
        }
    }
}
