//! The interface shared by column text transformations.
//!
//! A rendering layer holds transformations behind [`Transformation`] and
//! asks each one for its name, a description for the settings screen, the
//! no-wrap hint, and the transformed text.

use serde::{Deserialize, Serialize};

use crate::options::InvocationOptions;

/// Information about the column whose value is being transformed.
///
/// Transformations receive it for uniformity; many ignore it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMetadata {
    /// Column name.
    pub name: Option<String>,
    /// Table that owns the column.
    pub table: Option<String>,
    /// Declared column type, such as `text`.
    pub column_type: Option<String>,
}

/// How a transformation produced its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing was configured, so the input was returned unchanged.
    Passthrough,
    /// A registered program processed the input.
    Filtered {
        /// Registry index of the program that ran.
        index: usize,
        /// Whether the requested program was missing and index 0 ran instead.
        fell_back: bool,
    },
}

/// Non-fatal conditions noticed while transforming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterWarning {
    /// The caller supplied extra command-line text, which is deprecated.
    DeprecatedArguments {
        /// The text that was appended to the command line.
        args: String,
    },
}

/// Output of a transformation plus the rendering hints that go with it.
///
/// The output is text by default; byte-level callers get `Vec<u8>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transformed<T = String> {
    /// The transformed value.
    pub text: T,
    /// Whether the text should be rendered without line wrapping.
    pub no_wrap: bool,
    /// How the text was produced.
    pub outcome: Outcome,
    /// Non-fatal warnings raised during the call.
    pub warnings: Vec<FilterWarning>,
}

impl<T> Transformed<T> {
    /// A result that hands back `text` untouched.
    #[must_use]
    pub fn passthrough(text: impl Into<T>, no_wrap: bool) -> Self {
        Self {
            text: text.into(),
            no_wrap,
            outcome: Outcome::Passthrough,
            warnings: Vec::new(),
        }
    }

    /// Convert the output, keeping the hints and warnings.
    #[must_use]
    pub fn map_text<U>(self, convert: impl FnOnce(T) -> U) -> Transformed<U> {
        Transformed {
            text: convert(self.text),
            no_wrap: self.no_wrap,
            outcome: self.outcome,
            warnings: self.warnings,
        }
    }
}

/// A transformation applied to column text before display.
pub trait Transformation {
    /// Error raised when the transformation cannot complete.
    type Error: std::error::Error;

    /// Stable identifier of the transformation.
    fn name(&self) -> &'static str;

    /// Human-readable description shown to administrators.
    fn describe(&self) -> &'static str;

    /// Whether the output should be displayed without wrapping.
    fn should_disable_wrap(&self, options: &InvocationOptions) -> bool;

    /// Transform `buffer` according to `options`.
    ///
    /// # Errors
    ///
    /// Implementations return [`Transformation::Error`] when they cannot
    /// produce a result.
    fn apply(
        &self,
        buffer: &str,
        options: &InvocationOptions,
        metadata: Option<&FieldMetadata>,
    ) -> Result<Transformed, Self::Error>;
}
