//! Filter configuration and the serialisable settings it is built from.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::ConfigError;
use crate::{
    options::{InvocationOptions, ResolvedOptions},
    registry::ProgramRegistry,
};

/// Default upper bound for captured program output (1 MiB).
pub const DEFAULT_MAX_OUTPUT_BYTES: u64 = 1024 * 1024;

/// What happens to the program's standard error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StderrPolicy {
    /// The program writes to this process's standard error.
    #[default]
    Inherit,
    /// The program's standard error is discarded.
    Discard,
}

/// Validated configuration for an [`ExternalFilter`](super::ExternalFilter).
#[derive(Debug, Clone)]
pub struct FilterConfig {
    registry: ProgramRegistry,
    defaults: ResolvedOptions,
    timeout: Duration,
    max_output_bytes: u64,
    stderr: StderrPolicy,
}

impl FilterConfig {
    /// Create a configuration for `registry` whose programs must finish
    /// within `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroTimeout`] when `timeout` is zero.
    pub fn new(registry: ProgramRegistry, timeout: Duration) -> Result<Self, ConfigError> {
        if timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(Self {
            registry,
            defaults: ResolvedOptions::default(),
            timeout,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            stderr: StderrPolicy::default(),
        })
    }

    /// Override the options used for positions a caller leaves unset.
    #[must_use]
    pub fn with_defaults(mut self, defaults: ResolvedOptions) -> Self {
        self.defaults = defaults;
        self
    }

    /// Override the maximum number of output bytes collected per call.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroOutputLimit`] when `max_bytes` is zero.
    pub fn with_max_output_bytes(mut self, max_bytes: u64) -> Result<Self, ConfigError> {
        if max_bytes == 0 {
            return Err(ConfigError::ZeroOutputLimit);
        }
        self.max_output_bytes = max_bytes;
        Ok(self)
    }

    /// Override what happens to the program's standard error.
    #[must_use]
    pub fn with_stderr(mut self, stderr: StderrPolicy) -> Self {
        self.stderr = stderr;
        self
    }

    /// The approved programs.
    #[must_use]
    pub const fn registry(&self) -> &ProgramRegistry {
        &self.registry
    }

    /// Options used for positions a caller leaves unset.
    #[must_use]
    pub const fn defaults(&self) -> &ResolvedOptions {
        &self.defaults
    }

    /// How long a program may run.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Maximum number of output bytes collected per call.
    #[must_use]
    pub const fn max_output_bytes(&self) -> u64 {
        self.max_output_bytes
    }

    /// What happens to the program's standard error.
    #[must_use]
    pub const fn stderr(&self) -> StderrPolicy {
        self.stderr
    }
}

/// Raw settings as a host application stores them.
///
/// Convert with [`FilterConfig::try_from`] to validate. The timeout has no
/// default: settings that omit it are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterSettings {
    /// Approved programs keyed by index.
    #[serde(default)]
    pub programs: ProgramRegistry,
    /// Options used for positions a caller leaves unset.
    #[serde(default)]
    pub defaults: InvocationOptions,
    /// Deadline for each program run, in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Maximum captured output in bytes.
    pub max_output_bytes: Option<u64>,
    /// What happens to the program's standard error.
    #[serde(default)]
    pub stderr: StderrPolicy,
}

impl TryFrom<FilterSettings> for FilterConfig {
    type Error = ConfigError;

    fn try_from(settings: FilterSettings) -> Result<Self, Self::Error> {
        let timeout_ms = settings.timeout_ms.ok_or(ConfigError::MissingTimeout)?;
        let defaults = ResolvedOptions::merge(&settings.defaults, &ResolvedOptions::default());
        let config = Self::new(settings.programs, Duration::from_millis(timeout_ms))?
            .with_defaults(defaults)
            .with_stderr(settings.stderr);
        match settings.max_output_bytes {
            Some(max_bytes) => config.with_max_output_bytes(max_bytes),
            None => Ok(config),
        }
    }
}
