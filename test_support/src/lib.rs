//! Test utilities for driving filter programs.
//!
//! Helpers here build registries out of small `/bin/sh` scripts so tests do
//! not depend on compiled helper binaries or on tools outside POSIX.

use std::{fs, time::Duration};

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use extfilter::{
    external::{ExternalFilter, FilterConfig},
    registry::{ProgramEntry, ProgramRegistry},
};
use tempfile::TempDir;

/// Deadline used by tests that expect programs to finish promptly.
pub const GENEROUS_TIMEOUT: Duration = Duration::from_secs(10);

/// A registry entry that runs `script` with `/bin/sh -c`.
///
/// # Errors
///
/// Returns an error if the script cannot be quoted.
pub fn sh_entry(script: &str) -> Result<ProgramEntry> {
    let args = shlex::try_join(["-c", script]).context("quote shell script")?;
    ProgramEntry::new("/bin/sh", args).context("build /bin/sh entry")
}

/// A registry entry for an absolute program with no fixed arguments.
///
/// # Errors
///
/// Returns an error if `program` is not an absolute path.
pub fn bare_entry(program: &str) -> Result<ProgramEntry> {
    ProgramEntry::new(program, "").with_context(|| format!("build entry for {program}"))
}

/// A registry holding `entries` in the given order.
///
/// # Errors
///
/// Returns an error if an index repeats or index 0 is missing.
pub fn registry_of<I>(entries: I) -> Result<ProgramRegistry>
where
    I: IntoIterator<Item = (usize, ProgramEntry)>,
{
    ProgramRegistry::from_entries(entries).context("build program registry")
}

/// A filter over `registry` with the given deadline and default options.
///
/// # Errors
///
/// Returns an error if `timeout` is zero.
pub fn filter_with(registry: ProgramRegistry, timeout: Duration) -> Result<ExternalFilter> {
    let config = FilterConfig::new(registry, timeout).context("build filter config")?;
    Ok(ExternalFilter::new(config))
}

/// A filter that runs `script` as program 0 with [`GENEROUS_TIMEOUT`].
///
/// # Errors
///
/// Returns an error if the registry or configuration cannot be built.
pub fn sh_filter(script: &str) -> Result<ExternalFilter> {
    let registry = registry_of([(0, sh_entry(script)?)])?;
    filter_with(registry, GENEROUS_TIMEOUT)
}

/// Write `body` to a shell script file inside a fresh temporary directory.
///
/// The file is passed to `/bin/sh` as an argument rather than executed
/// directly, so it needs no execute bit. Keep the returned directory alive
/// for as long as the script is used.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be created.
pub fn script_file(body: &str) -> Result<(TempDir, Utf8PathBuf)> {
    let dir = TempDir::new().context("create temp dir")?;
    let path = Utf8PathBuf::from_path_buf(dir.path().join("filter.sh"))
        .map_err(|path| anyhow::anyhow!("non-UTF-8 temp path: {}", path.display()))?;
    fs::write(&path, format!("#!/bin/sh\n{body}\n"))
        .with_context(|| format!("write script {path}"))?;
    Ok((dir, path))
}
