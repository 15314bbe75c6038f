//! Positional invocation options and their merge over configured defaults.
//!
//! The four positions are fixed by convention:
//!
//! | Position | Meaning |
//! |---|---|
//! | 0 | registry index of the program to run |
//! | 1 | extra command-line text (deprecated) |
//! | 2 | escape flag: HTML-escape the output |
//! | 3 | no-wrap flag: render the output on one line |

mod value;

pub use value::OptionValue;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of positions an options list may hold.
pub const OPTION_SLOTS: usize = 4;

/// Named positions within an options list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionSlot {
    /// Registry index of the program to run.
    Selector,
    /// Extra command-line text appended after the program's fixed arguments.
    LegacyArgs,
    /// Whether to HTML-escape the program output.
    Escape,
    /// Whether the output should be rendered without wrapping.
    NoWrap,
}

impl OptionSlot {
    const fn position(self) -> usize {
        match self {
            Self::Selector => 0,
            Self::LegacyArgs => 1,
            Self::Escape => 2,
            Self::NoWrap => 3,
        }
    }
}

/// Errors raised when building an options list.
#[derive(Debug, Error, Diagnostic)]
pub enum OptionsError {
    /// More values were supplied than there are positions.
    #[error("expected at most {OPTION_SLOTS} options but received {count}")]
    #[diagnostic(code(extfilter::options::too_many))]
    TooMany {
        /// Number of values supplied.
        count: usize,
    },
}

/// Options supplied by a caller. Any position may be left unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "Vec<Option<OptionValue>>",
    into = "Vec<Option<OptionValue>>"
)]
pub struct InvocationOptions {
    slots: [Option<OptionValue>; OPTION_SLOTS],
}

impl InvocationOptions {
    /// An options list with every position unset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from positional values; `None` leaves a position unset.
    ///
    /// # Errors
    ///
    /// Returns [`OptionsError::TooMany`] when more than four values are given.
    pub fn from_values<I>(values: I) -> Result<Self, OptionsError>
    where
        I: IntoIterator<Item = Option<OptionValue>>,
    {
        let mut options = Self::default();
        for (position, value) in values.into_iter().enumerate() {
            let Some(slot) = options.slots.get_mut(position) else {
                return Err(OptionsError::TooMany {
                    count: position + 1,
                });
            };
            *slot = value;
        }
        Ok(options)
    }

    /// Set `slot` to `value`.
    #[must_use]
    pub fn with(mut self, slot: OptionSlot, value: impl Into<OptionValue>) -> Self {
        if let Some(target) = self.slots.get_mut(slot.position()) {
            *target = Some(value.into());
        }
        self
    }

    /// Value at `slot`, if set.
    #[must_use]
    pub fn get(&self, slot: OptionSlot) -> Option<&OptionValue> {
        self.slots.get(slot.position()).and_then(Option::as_ref)
    }

    /// Whether the output should be rendered without wrapping.
    ///
    /// An unset or empty no-wrap flag means "do not wrap", as does any value
    /// loosely equal to `1`. Every other value allows wrapping.
    #[must_use]
    pub fn disables_wrap(&self) -> bool {
        match self.get(OptionSlot::NoWrap) {
            None => true,
            Some(flag) if flag.is_empty_str() => true,
            Some(flag) => flag.loosely_eq_str("1") || flag.loosely_eq_int(1),
        }
    }
}

impl TryFrom<Vec<Option<OptionValue>>> for InvocationOptions {
    type Error = OptionsError;

    fn try_from(values: Vec<Option<OptionValue>>) -> Result<Self, Self::Error> {
        if values.len() > OPTION_SLOTS {
            return Err(OptionsError::TooMany {
                count: values.len(),
            });
        }
        Self::from_values(values)
    }
}

impl From<InvocationOptions> for Vec<Option<OptionValue>> {
    fn from(options: InvocationOptions) -> Self {
        options.slots.into()
    }
}

/// Options with every position resolved, either from the caller or from the
/// configured defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOptions {
    selector: OptionValue,
    legacy_args: OptionValue,
    escape: OptionValue,
    no_wrap: OptionValue,
}

impl Default for ResolvedOptions {
    /// Program 0, no extra arguments, escape the output, do not wrap.
    fn default() -> Self {
        Self {
            selector: OptionValue::Int(0),
            legacy_args: OptionValue::empty(),
            escape: OptionValue::Int(1),
            no_wrap: OptionValue::Int(1),
        }
    }
}

impl ResolvedOptions {
    /// Merge `caller` over `defaults`.
    ///
    /// A caller position that is unset or holds the empty string takes the
    /// default value.
    #[must_use]
    pub fn merge(caller: &InvocationOptions, defaults: &Self) -> Self {
        let pick = |slot: OptionSlot, fallback: &OptionValue| {
            caller
                .get(slot)
                .filter(|value| !value.is_empty_str())
                .unwrap_or(fallback)
                .clone()
        };
        Self {
            selector: pick(OptionSlot::Selector, &defaults.selector),
            legacy_args: pick(OptionSlot::LegacyArgs, &defaults.legacy_args),
            escape: pick(OptionSlot::Escape, &defaults.escape),
            no_wrap: pick(OptionSlot::NoWrap, &defaults.no_wrap),
        }
    }

    /// Resolved value at `slot`.
    #[must_use]
    pub const fn get(&self, slot: OptionSlot) -> &OptionValue {
        match slot {
            OptionSlot::Selector => &self.selector,
            OptionSlot::LegacyArgs => &self.legacy_args,
            OptionSlot::Escape => &self.escape,
            OptionSlot::NoWrap => &self.no_wrap,
        }
    }

    /// Registry index requested by the selector, if it names one.
    #[must_use]
    pub fn program_index(&self) -> Option<usize> {
        self.selector.as_index()
    }

    /// Deprecated extra command-line text, when non-empty.
    #[must_use]
    pub fn legacy_args(&self) -> Option<String> {
        let text = self.legacy_args.to_string();
        (!text.is_empty()).then_some(text)
    }

    /// Whether the output should be HTML-escaped.
    ///
    /// Stored settings have historically used both `1` and `"2"` to request
    /// escaping; both are honoured.
    #[must_use]
    pub fn escape_requested(&self) -> bool {
        self.escape.loosely_eq_int(1) || self.escape.loosely_eq_str("2")
    }
}
