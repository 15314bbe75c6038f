//! Command line interface definition using clap.
//!
//! The binary reads a value on stdin, runs it through the configured
//! program, and prints the result. Programs are registered with repeated
//! `--program INDEX=COMMAND` flags; nothing runs without them.

use clap::Parser;

use crate::options::InvocationOptions;

mod parsing;

pub use parsing::ProgramArg;
use parsing::{parse_options, parse_program};

/// Pipe text through administrator-approved external programs.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Register a program as `INDEX=COMMAND`, for example
    /// `0=/usr/bin/tidy -q -i`.
    ///
    /// The command's first word must be an absolute path. Repeat the flag to
    /// register several programs; index 0 is required and is used whenever
    /// the selector names no registered program.
    #[arg(long = "program", value_name = "INDEX=COMMAND", value_parser = parse_program)]
    pub programs: Vec<ProgramArg>,

    /// Longest time a program may run, in milliseconds.
    #[arg(long, value_name = "MS", env = "EXTFILTER_TIMEOUT_MS")]
    pub timeout_ms: Option<u64>,

    /// Maximum program output in bytes.
    #[arg(long, value_name = "BYTES", env = "EXTFILTER_MAX_OUTPUT_BYTES")]
    pub max_output_bytes: Option<u64>,

    /// Invocation options as a JSON array:
    /// `[selector, legacy_args, escape, no_wrap]`.
    #[arg(long, value_name = "JSON", value_parser = parse_options)]
    pub options: Option<InvocationOptions>,

    /// Default options as a JSON array, used for positions the invocation
    /// options leave unset.
    #[arg(long, value_name = "JSON", value_parser = parse_options)]
    pub defaults: Option<InvocationOptions>,

    /// Discard the program's standard error instead of passing it through.
    #[arg(long)]
    pub discard_stderr: bool,

    /// Enable verbose diagnostic logging.
    #[arg(short, long)]
    pub verbose: bool,
}
