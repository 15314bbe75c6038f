//! Error types for filter configuration and program execution.
//!
//! Execution helpers report a `CommandFailure` without knowing which
//! program they were driving; `filter_error` attaches that context when the
//! failure crosses the public API.

use std::{io, time::Duration};

use miette::Diagnostic;
use thiserror::Error;

use crate::registry::RegistryError;

/// Reasons a filter configuration was rejected.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// No deadline was configured. Programs must never run unbounded.
    #[error("a program timeout must be configured")]
    #[diagnostic(
        code(extfilter::config::missing_timeout),
        help("set timeout_ms to the longest time a filter program may run")
    )]
    MissingTimeout,
    /// The configured deadline was zero.
    #[error("the program timeout must be greater than zero")]
    #[diagnostic(code(extfilter::config::zero_timeout))]
    ZeroTimeout,
    /// The configured output limit was zero.
    #[error("the output limit must be greater than zero")]
    #[diagnostic(code(extfilter::config::zero_output_limit))]
    ZeroOutputLimit,
    /// The program registry was invalid.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Registry(#[from] RegistryError),
}

/// Failures raised while running a filter program.
#[derive(Debug, Error, Diagnostic)]
pub enum FilterError {
    /// The program could not be started.
    #[error("failed to launch '{program}'")]
    #[diagnostic(
        code(extfilter::launch_failed),
        help("check that the registered program exists and is executable")
    )]
    Launch {
        /// The program that failed to start.
        program: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// Reading from or writing to the program failed.
    #[error("I/O error while communicating with '{program}'")]
    #[diagnostic(code(extfilter::io_failed))]
    Io {
        /// The program being driven.
        program: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// The program wrote more output than the configured limit allows.
    #[error("'{program}' produced more than {limit} bytes of output")]
    #[diagnostic(
        code(extfilter::output_limit),
        help("raise max_output_bytes or filter smaller values")
    )]
    OutputLimit {
        /// The program being driven.
        program: String,
        /// The byte ceiling that was exceeded.
        limit: u64,
    },
    /// The program did not finish before the deadline and was killed.
    #[error("'{program}' timed out after {} ms", .timeout.as_millis())]
    #[diagnostic(code(extfilter::timeout))]
    Timeout {
        /// The program being driven.
        program: String,
        /// The deadline that elapsed.
        timeout: Duration,
    },
    /// The call was cancelled and the program was killed.
    #[error("'{program}' was cancelled")]
    #[diagnostic(code(extfilter::cancelled))]
    Cancelled {
        /// The program being driven.
        program: String,
    },
}

/// Execution failures before program context is attached.
#[derive(Debug)]
pub(super) enum CommandFailure {
    /// The process could not be spawned.
    Spawn(io::Error),
    /// An I/O error occurred while interacting with the running process.
    Io(io::Error),
    /// Output exceeded the byte budget.
    OutputLimit { limit: u64 },
    /// The process failed to exit before the timeout elapsed.
    Timeout(Duration),
    /// Cancellation was requested while the process was running.
    Cancelled,
}

#[rustfmt::skip]
impl From<io::Error> for CommandFailure { fn from(err: io::Error) -> Self { Self::Io(err) } }

/// Attach the program description to an execution failure.
pub(super) fn filter_error(failure: CommandFailure, program: &str) -> FilterError {
    let program = program.to_owned();
    match failure {
        CommandFailure::Spawn(source) => FilterError::Launch { program, source },
        CommandFailure::Io(source) => FilterError::Io { program, source },
        CommandFailure::OutputLimit { limit } => FilterError::OutputLimit { program, limit },
        CommandFailure::Timeout(timeout) => FilterError::Timeout { program, timeout },
        CommandFailure::Cancelled => FilterError::Cancelled { program },
    }
}
