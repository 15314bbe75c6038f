//! Errors raised while building a program registry.

use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

/// Reasons a registry or one of its entries was rejected.
#[derive(Debug, Error, Diagnostic)]
pub enum RegistryError {
    /// Programs must be named by absolute path.
    #[error("program '{program}' must be an absolute path")]
    #[diagnostic(
        code(extfilter::registry::relative_program),
        help("register the full path, for example /usr/bin/tidy")
    )]
    RelativeProgram {
        /// The rejected path.
        program: Utf8PathBuf,
    },
    /// Program paths containing line breaks cannot be placed on a command line.
    #[error("program path {program:?} contains a line break")]
    #[diagnostic(code(extfilter::registry::line_break))]
    LineBreakInProgram {
        /// The rejected path.
        program: Utf8PathBuf,
    },
    /// The fixed argument string could not be split into words.
    #[error("arguments '{args}' for program '{program}' have unbalanced quotes or escapes")]
    #[diagnostic(code(extfilter::registry::invalid_arguments))]
    InvalidArguments {
        /// Program the arguments belong to.
        program: Utf8PathBuf,
        /// The rejected argument string.
        args: String,
    },
    /// A command-line registry entry was empty or could not be split.
    #[error("cannot parse program command line '{line}'")]
    #[diagnostic(code(extfilter::registry::malformed_command))]
    MalformedCommand {
        /// The rejected command line.
        line: String,
    },
    /// Two entries share the same index.
    #[error("program index {index} is registered more than once")]
    #[diagnostic(code(extfilter::registry::duplicate_index))]
    DuplicateIndex {
        /// The repeated index.
        index: usize,
    },
    /// Entries exist but none can serve as the fallback.
    #[error("a non-empty registry must contain a program at index 0")]
    #[diagnostic(
        code(extfilter::registry::missing_fallback),
        help("index 0 runs whenever a caller selects an unknown program")
    )]
    MissingFallback,
}
