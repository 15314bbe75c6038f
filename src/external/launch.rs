//! Construction of the process launched for a filter call.
//!
//! Programs normally run directly with their registered arguments. When a
//! caller supplies deprecated extra arguments, the registered program and
//! its arguments are joined with the extra text into one command line for
//! the platform shell, so the extra text keeps its historical meaning.

use std::process::{Command, Stdio};

use thiserror::Error;

use super::config::StderrPolicy;
use crate::registry::ProgramEntry;

#[cfg(windows)]
const SHELL: &str = "cmd";
#[cfg(windows)]
const SHELL_ARGS: &[&str] = &["/C"];

#[cfg(not(windows))]
const SHELL: &str = "sh";
#[cfg(not(windows))]
const SHELL_ARGS: &[&str] = &["-c"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(super) enum QuoteError {
    #[error("arguments containing carriage returns or line feeds cannot be safely quoted")]
    ContainsLineBreak,
}

/// How the selected program is started.
#[derive(Debug)]
pub(super) enum Launch<'a> {
    /// Run the program itself with its registered arguments.
    Direct(&'a ProgramEntry),
    /// Run a shell command line built from the entry and the extra text.
    Shell(String),
}

impl<'a> Launch<'a> {
    pub(super) fn new(
        entry: &'a ProgramEntry,
        legacy_args: Option<&str>,
    ) -> Result<Self, QuoteError> {
        let Some(extra) = legacy_args else {
            return Ok(Self::Direct(entry));
        };
        let mut line = quote(entry.program().as_str())?;
        if !entry.args().is_empty() {
            line.push(' ');
            line.push_str(entry.args());
        }
        line.push(' ');
        line.push_str(extra);
        Ok(Self::Shell(line))
    }

    /// Build the command with piped stdin and stdout.
    pub(super) fn command(&self, stderr: StderrPolicy) -> Command {
        let mut command = match self {
            Self::Direct(entry) => {
                let mut command = Command::new(entry.program().as_std_path());
                command.args(entry.argv());
                command
            }
            Self::Shell(line) => {
                let mut command = Command::new(SHELL);
                command.args(SHELL_ARGS).arg(line);
                command
            }
        };
        command.stdin(Stdio::piped()).stdout(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;

            // A fresh group lets a timeout kill descendants as well.
            command.process_group(0);
        }
        match stderr {
            StderrPolicy::Inherit => command.stderr(Stdio::inherit()),
            StderrPolicy::Discard => command.stderr(Stdio::null()),
        };
        command
    }

    /// Human-readable form for logs.
    pub(super) fn describe(&self) -> String {
        match self {
            Self::Direct(entry) if entry.args().is_empty() => entry.program().to_string(),
            Self::Direct(entry) => format!("{} {}", entry.program(), entry.args()),
            Self::Shell(line) => format!("{SHELL} {} {line}", SHELL_ARGS.join(" ")),
        }
    }
}

#[cfg(not(windows))]
fn quote(arg: &str) -> Result<String, QuoteError> {
    use shell_quote::{QuoteRefExt, Sh};

    if arg.contains(['\n', '\r']) {
        return Err(QuoteError::ContainsLineBreak);
    }
    let bytes: Vec<u8> = arg.quoted(Sh);
    Ok(String::from_utf8(bytes)
        .unwrap_or_else(|err| String::from_utf8_lossy(err.as_bytes()).into_owned()))
}

#[cfg(windows)]
fn quote(arg: &str) -> Result<String, QuoteError> {
    if arg.contains(['\n', '\r']) {
        return Err(QuoteError::ContainsLineBreak);
    }
    if arg.is_empty() {
        return Ok("\"\"".to_owned());
    }
    if !arg.contains([' ', '\t', '"', '^', '&', '|', '<', '>', '%', '!']) {
        return Ok(arg.to_owned());
    }
    let mut buf = String::with_capacity(arg.len() + 2);
    buf.push('"');
    for ch in arg.chars() {
        match ch {
            '"' | '^' | '&' | '|' | '<' | '>' | '!' => {
                buf.push('^');
                buf.push(ch);
            }
            '%' => buf.push_str("%%"),
            _ => buf.push(ch),
        }
    }
    buf.push('"');
    Ok(buf)
}
