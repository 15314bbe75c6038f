//! CLI parsing helpers for clap value parsers.

use crate::{options::InvocationOptions, registry::ProgramEntry};

/// A `--program INDEX=COMMAND` flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramArg {
    /// Registry index.
    pub index: usize,
    /// The registered program.
    pub entry: ProgramEntry,
}

pub(super) fn parse_program(s: &str) -> Result<ProgramArg, String> {
    let Some((index, command)) = s.split_once('=') else {
        return Err(format!("'{s}' must have the form INDEX=COMMAND"));
    };
    let index: usize = index
        .trim()
        .parse()
        .map_err(|_| format!("'{index}' is not a valid program index"))?;
    let entry = ProgramEntry::from_command_line(command).map_err(|err| err.to_string())?;
    Ok(ProgramArg { index, entry })
}

pub(super) fn parse_options(s: &str) -> Result<InvocationOptions, String> {
    serde_json::from_str(s).map_err(|err| format!("invalid options '{s}': {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{OptionSlot, OptionValue};
    use rstest::rstest;

    #[test]
    fn parses_index_and_command() {
        let parsed = parse_program("1=/usr/bin/tidy -q 'a b'").expect("valid program flag");
        assert_eq!(parsed.index, 1);
        assert_eq!(parsed.entry.program().as_str(), "/usr/bin/tidy");
        assert_eq!(parsed.entry.argv(), ["-q", "a b"]);
    }

    #[rstest]
    #[case::missing_separator("/usr/bin/tidy", "INDEX=COMMAND")]
    #[case::bad_index("x=/usr/bin/tidy", "not a valid program index")]
    #[case::relative_program("0=tidy", "absolute path")]
    fn rejects_malformed_programs(#[case] input: &str, #[case] needle: &str) {
        let err = parse_program(input).expect_err("malformed program flag");
        assert!(err.contains(needle), "error should mention {needle}: {err}");
    }

    #[test]
    fn parses_json_options() {
        let options = parse_options(r#"[2, "", "1"]"#).expect("valid options");
        assert_eq!(options.get(OptionSlot::Selector), Some(&OptionValue::Int(2)));
        assert_eq!(options.get(OptionSlot::Escape), Some(&OptionValue::from("1")));
    }

    #[test]
    fn rejects_non_array_options() {
        let err = parse_options(r#"{"selector": 1}"#).expect_err("object is not an array");
        assert!(err.starts_with("invalid options"));
    }
}
