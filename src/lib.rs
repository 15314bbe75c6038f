//! Run column text through administrator-approved external programs.
//!
//! [`ExternalFilter`](external::ExternalFilter) implements the "External"
//! [`Transformation`](transform::Transformation): it feeds a value to a
//! program chosen from a fixed [`ProgramRegistry`](registry::ProgramRegistry)
//! and returns the program's output, optionally HTML-escaped. The `cli` and
//! `runner` modules expose the same filter as a command-line tool.

pub mod cli;
pub mod escape;
pub mod external;
pub mod options;
pub mod registry;
pub mod runner;
pub mod transform;
