//! CLI execution logic.
//!
//! This module keeps `main` minimal: it turns the parsed [`Cli`] into a
//! [`FilterConfig`], runs standard input through the filter, and writes the
//! result to standard output.

use std::io::{self, Read, Write};

use anyhow::{Context, Result};
use tracing::debug;

use crate::{
    cli::Cli,
    external::{ConfigError, ExternalFilter, FilterConfig, FilterSettings, StderrPolicy},
    registry::ProgramRegistry,
};

/// Execute the parsed [`Cli`] against the process's stdin and stdout.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, standard input cannot
/// be read, the filter fails, or standard output cannot be written.
pub fn run(cli: &Cli) -> Result<()> {
    let stdin = io::stdin().lock();
    let stdout = io::stdout().lock();
    run_with_io(cli, stdin, stdout)
}

/// Execute the parsed [`Cli`], reading from `input` and writing to `output`.
///
/// # Errors
///
/// See [`run`].
pub fn run_with_io<R, W>(cli: &Cli, mut input: R, mut output: W) -> Result<()>
where
    R: Read,
    W: Write,
{
    let config = build_config(cli).context("invalid filter configuration")?;
    let filter = ExternalFilter::new(config);

    let mut buffer = Vec::new();
    input
        .read_to_end(&mut buffer)
        .context("read standard input")?;

    let options = cli.options.clone().unwrap_or_default();
    let transformed = filter.apply_bytes(&buffer, &options, None)?;
    debug!(
        outcome = ?transformed.outcome,
        no_wrap = transformed.no_wrap,
        "filter applied"
    );

    output
        .write_all(&transformed.text)
        .context("write standard output")?;
    output.flush().context("flush standard output")?;
    Ok(())
}

/// Build the filter configuration described by `cli`.
///
/// # Errors
///
/// Returns [`ConfigError`] when the program registry is invalid, no timeout
/// was given, or a limit is zero.
pub fn build_config(cli: &Cli) -> Result<FilterConfig, ConfigError> {
    let programs = ProgramRegistry::from_entries(
        cli.programs
            .iter()
            .map(|program| (program.index, program.entry.clone())),
    )?;
    let settings = FilterSettings {
        programs,
        defaults: cli.defaults.clone().unwrap_or_default(),
        timeout_ms: cli.timeout_ms,
        max_output_bytes: cli.max_output_bytes,
        stderr: if cli.discard_stderr {
            StderrPolicy::Discard
        } else {
            StderrPolicy::Inherit
        },
    };
    FilterConfig::try_from(settings)
}
