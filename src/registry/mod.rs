//! The administrator-curated table of programs a filter may launch.
//!
//! Entries are keyed by a small integer index and keep their insertion order.
//! A registry is validated once when it is built and is immutable afterwards:
//! callers choose an entry by index but can never add a program or change a
//! path at call time.
//!
//! # Security
//!
//! Every registered program receives untrusted column data on stdin. Programs
//! that can redirect output or execute further commands should be wrapped in
//! a script that only exposes the behaviour the administrator intends.

mod error;

pub use error::RegistryError;

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Index of the entry used when a selector does not match any entry.
pub const FALLBACK_INDEX: usize = 0;

/// A single approved program and the fixed arguments it always receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawProgramEntry", into = "RawProgramEntry")]
pub struct ProgramEntry {
    program: Utf8PathBuf,
    args: String,
    argv: Vec<String>,
}

#[derive(Serialize, Deserialize)]
struct RawProgramEntry {
    program: Utf8PathBuf,
    #[serde(default)]
    args: String,
}

impl TryFrom<RawProgramEntry> for ProgramEntry {
    type Error = RegistryError;

    fn try_from(raw: RawProgramEntry) -> Result<Self, Self::Error> {
        Self::new(raw.program, raw.args)
    }
}

impl From<ProgramEntry> for RawProgramEntry {
    fn from(entry: ProgramEntry) -> Self {
        Self {
            program: entry.program,
            args: entry.args,
        }
    }
}

impl ProgramEntry {
    /// Validate and create an entry for `program` with fixed `args`.
    ///
    /// `args` uses POSIX shell word rules, so `-q --indent 'auto mode'`
    /// yields three arguments.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::RelativeProgram`] when `program` is not an
    /// absolute path, [`RegistryError::LineBreakInProgram`] when the path
    /// contains a line break, and [`RegistryError::InvalidArguments`] when
    /// `args` cannot be split into words.
    pub fn new(
        program: impl Into<Utf8PathBuf>,
        args: impl Into<String>,
    ) -> Result<Self, RegistryError> {
        let program = program.into();
        let args = args.into();
        if !program.is_absolute() {
            return Err(RegistryError::RelativeProgram { program });
        }
        if program.as_str().contains(['\n', '\r']) {
            return Err(RegistryError::LineBreakInProgram { program });
        }
        let Some(argv) = shlex::split(&args) else {
            return Err(RegistryError::InvalidArguments { program, args });
        };
        Ok(Self {
            program,
            args,
            argv,
        })
    }

    /// Parse a shell-style command line such as `/usr/bin/tidy -q -i`.
    ///
    /// The first word is the program; the remaining words become the fixed
    /// arguments.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::MalformedCommand`] when the line is empty or
    /// cannot be split, and any error raised by [`ProgramEntry::new`].
    pub fn from_command_line(line: &str) -> Result<Self, RegistryError> {
        let words = shlex::split(line).ok_or_else(|| RegistryError::MalformedCommand {
            line: line.to_owned(),
        })?;
        let mut words = words.into_iter();
        let Some(program) = words.next() else {
            return Err(RegistryError::MalformedCommand {
                line: line.to_owned(),
            });
        };
        let rest: Vec<String> = words.collect();
        let args = shlex::try_join(rest.iter().map(String::as_str)).map_err(|_| {
            RegistryError::MalformedCommand {
                line: line.to_owned(),
            }
        })?;
        Self::new(program, args)
    }

    /// Absolute path of the program.
    #[must_use]
    pub fn program(&self) -> &Utf8Path {
        &self.program
    }

    /// Fixed argument string as the administrator wrote it.
    #[must_use]
    pub fn args(&self) -> &str {
        &self.args
    }

    /// Fixed arguments split into words.
    #[must_use]
    pub fn argv(&self) -> &[String] {
        &self.argv
    }
}

/// The entry chosen for a call, together with how it was chosen.
#[derive(Debug, Clone, Copy)]
pub struct Selection<'a> {
    index: usize,
    entry: &'a ProgramEntry,
    fell_back: bool,
}

impl<'a> Selection<'a> {
    /// Index of the chosen entry.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// The chosen entry.
    #[must_use]
    pub const fn entry(&self) -> &'a ProgramEntry {
        self.entry
    }

    /// Whether the requested index was missing and the fallback was used.
    #[must_use]
    pub const fn fell_back(&self) -> bool {
        self.fell_back
    }
}

/// Ordered, validated mapping from index to approved program.
///
/// A non-empty registry always holds an entry at [`FALLBACK_INDEX`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "IndexMap<usize, ProgramEntry>",
    into = "IndexMap<usize, ProgramEntry>"
)]
pub struct ProgramRegistry {
    entries: IndexMap<usize, ProgramEntry>,
}

impl ProgramRegistry {
    /// A registry with no programs. Filters built on it pass input through.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a registry from `(index, entry)` pairs, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateIndex`] when an index repeats and
    /// [`RegistryError::MissingFallback`] when entries exist but none uses
    /// index 0.
    pub fn from_entries<I>(entries: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = (usize, ProgramEntry)>,
    {
        let mut map = IndexMap::new();
        for (index, entry) in entries {
            if map.insert(index, entry).is_some() {
                return Err(RegistryError::DuplicateIndex { index });
            }
        }
        Self::try_from(map)
    }

    /// Whether no program has been approved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of approved programs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entry registered at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ProgramEntry> {
        self.entries.get(&index)
    }

    /// Iterate over entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &ProgramEntry)> {
        self.entries.iter().map(|(index, entry)| (*index, entry))
    }

    /// Choose the entry for `requested`, falling back to index 0.
    ///
    /// Returns `None` only when the registry is empty.
    #[must_use]
    pub fn resolve(&self, requested: Option<usize>) -> Option<Selection<'_>> {
        if let Some(index) = requested
            && let Some(entry) = self.entries.get(&index)
        {
            return Some(Selection {
                index,
                entry,
                fell_back: false,
            });
        }
        self.entries.get(&FALLBACK_INDEX).map(|entry| Selection {
            index: FALLBACK_INDEX,
            entry,
            fell_back: true,
        })
    }
}

impl TryFrom<IndexMap<usize, ProgramEntry>> for ProgramRegistry {
    type Error = RegistryError;

    fn try_from(entries: IndexMap<usize, ProgramEntry>) -> Result<Self, Self::Error> {
        if !entries.is_empty() && !entries.contains_key(&FALLBACK_INDEX) {
            return Err(RegistryError::MissingFallback);
        }
        Ok(Self { entries })
    }
}

impl From<ProgramRegistry> for IndexMap<usize, ProgramEntry> {
    fn from(registry: ProgramRegistry) -> Self {
        registry.entries
    }
}
