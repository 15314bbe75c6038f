//! The "External" transformation: pipe text through an approved program.
//!
//! The filter writes the column value to the selected program's stdin and
//! returns whatever the program prints on stdout, optionally HTML-escaped.
//! Which programs may run is decided once, by an administrator, through the
//! [`ProgramRegistry`](crate::registry::ProgramRegistry) in the
//! [`FilterConfig`]. With an empty registry the filter hands its input back
//! unchanged.
//!
//! # Limits
//!
//! Every run is bounded by the configured timeout and output budget, and a
//! [`CancelToken`] can stop a run early. The program's exit status is logged
//! but otherwise ignored: whatever it printed is returned.
//!
//! # Security
//!
//! Deprecated extra arguments supplied through the options are appended to
//! a shell command line. They are honoured for compatibility and reported
//! with a warning on the `extfilter::deprecation` tracing target; put all
//! arguments in the registry instead.

mod cancel;
mod config;
mod error;
mod execution;
mod launch;
mod pipes;

pub use cancel::CancelToken;
pub use config::{DEFAULT_MAX_OUTPUT_BYTES, FilterConfig, FilterSettings, StderrPolicy};
pub use error::{ConfigError, FilterError};

use std::io;

use error::{CommandFailure, filter_error};
use execution::{RunLimits, run_filter};
use launch::Launch;

use crate::{
    escape::escape_html_bytes,
    options::{InvocationOptions, OptionSlot, ResolvedOptions},
    transform::{FieldMetadata, FilterWarning, Outcome, Transformation, Transformed},
};

const DESCRIPTION: &str = concat!(
    "Launches an external program and feeds it the column data via standard ",
    "input, returning the program's standard output. A typical use is Tidy, ",
    "to pretty-print HTML code. For security reasons no program is available ",
    "until an administrator lists it in the program registry; with an empty ",
    "registry the data is shown unchanged. The first option is the number of ",
    "the program to use. The second option should be blank for historical ",
    "reasons. The third option, if set to 1, HTML-escapes the output ",
    "(default 1). The fourth option, if set to 1, prevents wrapping so the ",
    "output appears on one line (default 1).",
);

/// Runs column text through an administrator-approved external program.
#[derive(Debug, Clone)]
pub struct ExternalFilter {
    config: FilterConfig,
}

impl ExternalFilter {
    /// Identifier reported by [`Transformation::name`].
    pub const NAME: &'static str = "External";

    /// Create a filter from a validated configuration.
    #[must_use]
    pub const fn new(config: FilterConfig) -> Self {
        Self { config }
    }

    /// The configuration this filter runs with.
    #[must_use]
    pub const fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Transform `buffer`, stopping early if `cancel` is triggered.
    ///
    /// Output that is not valid UTF-8 is converted lossily.
    ///
    /// # Errors
    ///
    /// See [`ExternalFilter::apply_bytes_with_cancel`].
    pub fn apply_with_cancel(
        &self,
        buffer: &str,
        options: &InvocationOptions,
        metadata: Option<&FieldMetadata>,
        cancel: &CancelToken,
    ) -> Result<Transformed, FilterError> {
        let transformed =
            self.apply_bytes_with_cancel(buffer.as_bytes(), options, metadata, cancel)?;
        Ok(transformed.map_text(|bytes| {
            String::from_utf8(bytes)
                .unwrap_or_else(|err| String::from_utf8_lossy(err.as_bytes()).into_owned())
        }))
    }

    /// Transform an arbitrary byte buffer.
    ///
    /// # Errors
    ///
    /// See [`ExternalFilter::apply_bytes_with_cancel`].
    pub fn apply_bytes(
        &self,
        buffer: &[u8],
        options: &InvocationOptions,
        metadata: Option<&FieldMetadata>,
    ) -> Result<Transformed<Vec<u8>>, FilterError> {
        self.apply_bytes_with_cancel(buffer, options, metadata, &CancelToken::new())
    }

    /// Transform an arbitrary byte buffer, stopping early if `cancel` is
    /// triggered.
    ///
    /// The bytes reach the program unchanged and its output is returned as
    /// bytes; escaping rewrites only the ASCII markup characters.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::Launch`] when the program cannot be started,
    /// [`FilterError::Timeout`] or [`FilterError::Cancelled`] when the run is
    /// cut short, [`FilterError::OutputLimit`] when the program prints too
    /// much, and [`FilterError::Io`] when the pipes fail.
    pub fn apply_bytes_with_cancel(
        &self,
        buffer: &[u8],
        options: &InvocationOptions,
        _metadata: Option<&FieldMetadata>,
        cancel: &CancelToken,
    ) -> Result<Transformed<Vec<u8>>, FilterError> {
        let no_wrap = options.disables_wrap();
        let resolved = ResolvedOptions::merge(options, self.config.defaults());
        let Some(selection) = self.config.registry().resolve(resolved.program_index()) else {
            return Ok(Transformed::passthrough(buffer, no_wrap));
        };
        if selection.fell_back() {
            tracing::debug!(
                requested = %resolved.get(OptionSlot::Selector),
                "no program registered for selector; using program 0"
            );
        }

        let mut warnings = Vec::new();
        let legacy_args = resolved.legacy_args();
        if let Some(args) = &legacy_args {
            tracing::warn!(
                target: "extfilter::deprecation",
                args = %args,
                "the command-line options field is deprecated for security reasons; \
                 add all command-line options to the program registry instead"
            );
            warnings.push(FilterWarning::DeprecatedArguments { args: args.clone() });
        }

        let entry = selection.entry();
        let program = entry.program().as_str();
        let launch = Launch::new(entry, legacy_args.as_deref()).map_err(|err| {
            filter_error(
                CommandFailure::Spawn(io::Error::new(io::ErrorKind::InvalidInput, err)),
                program,
            )
        })?;
        tracing::debug!(
            index = selection.index(),
            command = %launch.describe(),
            "running filter program"
        );
        let limits = RunLimits {
            timeout: self.config.timeout(),
            max_output_bytes: self.config.max_output_bytes(),
            cancel,
        };
        let output = run_filter(launch.command(self.config.stderr()), buffer, &limits)
            .map_err(|failure| filter_error(failure, program))?;

        let text = if resolved.escape_requested() {
            escape_html_bytes(&output).into_owned()
        } else {
            output
        };
        Ok(Transformed {
            text,
            no_wrap,
            outcome: Outcome::Filtered {
                index: selection.index(),
                fell_back: selection.fell_back(),
            },
            warnings,
        })
    }
}

impl Transformation for ExternalFilter {
    type Error = FilterError;

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn describe(&self) -> &'static str {
        DESCRIPTION
    }

    fn should_disable_wrap(&self, options: &InvocationOptions) -> bool {
        options.disables_wrap()
    }

    fn apply(
        &self,
        buffer: &str,
        options: &InvocationOptions,
        metadata: Option<&FieldMetadata>,
    ) -> Result<Transformed, FilterError> {
        self.apply_with_cancel(buffer, options, metadata, &CancelToken::new())
    }
}
