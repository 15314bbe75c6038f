//! Behaviour tests for running values through registered filter programs.
//!
//! Programs are `/bin/sh -c` one-liners built by `test_support`, so these
//! tests only need a POSIX shell and coreutils.
#![cfg(unix)]

use std::{thread, time::Duration, time::Instant};

use anyhow::{Context, Result, bail, ensure};
use extfilter::{
    external::{CancelToken, ExternalFilter, FilterConfig, FilterError},
    options::{InvocationOptions, OptionSlot},
    registry::ProgramEntry,
    transform::{FilterWarning, Outcome, Transformation},
};
use rstest::rstest;
use test_support::{
    GENEROUS_TIMEOUT, bare_entry, filter_with, registry_of, script_file, sh_entry, sh_filter,
};

fn unescaped() -> InvocationOptions {
    InvocationOptions::new()
        .with(OptionSlot::Selector, 0_i64)
        .with(OptionSlot::LegacyArgs, "")
        .with(OptionSlot::Escape, 0_i64)
        .with(OptionSlot::NoWrap, 1_i64)
}

#[test]
fn uppercasing_program_transforms_input() -> Result<()> {
    let filter = sh_filter("tr a-z A-Z")?;
    let out = filter.apply("hello", &unescaped(), None)?;
    ensure!(out.text == "HELLO", "expected HELLO but got {:?}", out.text);
    let expected = Outcome::Filtered {
        index: 0,
        fell_back: false,
    };
    ensure!(out.outcome == expected, "unexpected outcome {:?}", out.outcome);
    ensure!(out.no_wrap, "no_wrap flag 1 should disable wrapping");
    ensure!(out.warnings.is_empty(), "no warnings expected");
    Ok(())
}

#[rstest]
#[case::int_one(InvocationOptions::new().with(OptionSlot::Escape, 1_i64), "&lt;b&gt;")]
#[case::string_one(InvocationOptions::new().with(OptionSlot::Escape, "1"), "&lt;b&gt;")]
#[case::string_two(InvocationOptions::new().with(OptionSlot::Escape, "2"), "&lt;b&gt;")]
#[case::unset_uses_default(InvocationOptions::new(), "&lt;b&gt;")]
#[case::int_zero(InvocationOptions::new().with(OptionSlot::Escape, 0_i64), "<b>")]
#[case::string_zero(InvocationOptions::new().with(OptionSlot::Escape, "0"), "<b>")]
fn escape_flag_controls_html_escaping(
    #[case] options: InvocationOptions,
    #[case] expected: &str,
) -> Result<()> {
    let filter = sh_filter("cat")?;
    let out = filter.apply("<b>", &options, None)?;
    ensure!(out.text == expected, "expected {expected:?} but got {:?}", out.text);
    Ok(())
}

#[test]
fn unknown_selector_falls_back_to_program_zero() -> Result<()> {
    let registry = registry_of([(0, sh_entry("echo zero")?), (1, sh_entry("echo one")?)])?;
    let filter = filter_with(registry, GENEROUS_TIMEOUT)?;

    let picked = filter.apply("", &unescaped().with(OptionSlot::Selector, 1_i64), None)?;
    ensure!(picked.text == "one\n", "selector 1 should run program 1: {:?}", picked.text);

    let fallback = filter.apply("", &unescaped().with(OptionSlot::Selector, 99_i64), None)?;
    ensure!(fallback.text == "zero\n", "selector 99 should run program 0: {:?}", fallback.text);
    let expected = Outcome::Filtered {
        index: 0,
        fell_back: true,
    };
    ensure!(
        fallback.outcome == expected,
        "fallback should be recorded: {:?}",
        fallback.outcome
    );
    Ok(())
}

#[test]
fn numeric_string_selector_matches_integer_index() -> Result<()> {
    let registry = registry_of([(0, sh_entry("echo zero")?), (2, sh_entry("echo two")?)])?;
    let filter = filter_with(registry, GENEROUS_TIMEOUT)?;
    let out = filter.apply("", &unescaped().with(OptionSlot::Selector, "2"), None)?;
    ensure!(out.text == "two\n", "selector \"2\" should run program 2: {:?}", out.text);
    Ok(())
}

#[test]
fn slow_program_is_killed_at_the_deadline() -> Result<()> {
    let registry = registry_of([(0, sh_entry("exec sleep 5")?)])?;
    let filter = filter_with(registry, Duration::from_millis(200))?;
    let started = Instant::now();
    let Err(err) = filter.apply("", &unescaped(), None) else {
        bail!("sleeping program should time out");
    };
    ensure!(
        matches!(err, FilterError::Timeout { .. }),
        "expected Timeout but got {err:?}"
    );
    ensure!(
        started.elapsed() < Duration::from_secs(4),
        "timed-out program should be killed promptly"
    );
    ensure!(err.to_string().contains("timed out after 200 ms"), "message: {err}");
    Ok(())
}

#[test]
fn cancelling_stops_a_running_program() -> Result<()> {
    let filter = sh_filter("exec sleep 5")?;
    let cancel = CancelToken::new();
    let result = thread::scope(|scope| {
        let trigger = cancel.clone();
        scope.spawn(move || {
            thread::sleep(Duration::from_millis(100));
            trigger.cancel();
        });
        filter.apply_with_cancel("", &unescaped(), None, &cancel)
    });
    match result {
        Err(FilterError::Cancelled { program }) => {
            ensure!(program == "/bin/sh", "unexpected program {program}");
        }
        other => bail!("expected Cancelled but got {other:?}"),
    }
    Ok(())
}

#[test]
fn output_beyond_the_limit_is_rejected() -> Result<()> {
    let registry = registry_of([(0, bare_entry("/bin/cat")?)])?;
    let config = FilterConfig::new(registry, GENEROUS_TIMEOUT)?.with_max_output_bytes(16)?;
    let filter = ExternalFilter::new(config);
    let Err(err) = filter.apply(&"x".repeat(64), &unescaped(), None) else {
        bail!("output larger than 16 bytes should be rejected");
    };
    ensure!(
        matches!(err, FilterError::OutputLimit { limit: 16, .. }),
        "expected OutputLimit but got {err:?}"
    );
    Ok(())
}

#[test]
fn output_limit_stops_a_program_that_keeps_running() -> Result<()> {
    let registry = registry_of([(
        0,
        sh_entry("trap '' PIPE; head -c 100 /dev/zero; sleep 5; true")?,
    )])?;
    let config = FilterConfig::new(registry, GENEROUS_TIMEOUT)?.with_max_output_bytes(16)?;
    let filter = ExternalFilter::new(config);
    let started = Instant::now();
    let Err(err) = filter.apply("", &unescaped(), None) else {
        bail!("output larger than 16 bytes should be rejected");
    };
    ensure!(
        matches!(err, FilterError::OutputLimit { limit: 16, .. }),
        "expected OutputLimit but got {err:?}"
    );
    ensure!(
        started.elapsed() < Duration::from_secs(2),
        "program should be killed once the limit is hit, took {:?}",
        started.elapsed()
    );
    Ok(())
}

#[rstest]
#[case::waiting_shell("sleep 3; echo done")]
#[case::orphaned_background_job("sleep 3 & echo started")]
fn descendants_holding_stdout_do_not_outlive_the_deadline(#[case] script: &str) -> Result<()> {
    let registry = registry_of([(0, sh_entry(script)?)])?;
    let filter = filter_with(registry, Duration::from_millis(200))?;
    let started = Instant::now();
    let Err(err) = filter.apply("", &unescaped(), None) else {
        bail!("a descendant holding stdout past the deadline should time out");
    };
    ensure!(
        matches!(err, FilterError::Timeout { .. }),
        "expected Timeout but got {err:?}"
    );
    ensure!(
        started.elapsed() < Duration::from_secs(1),
        "deadline should bound the whole call, took {:?}",
        started.elapsed()
    );
    Ok(())
}

#[test]
fn legacy_arguments_launch_is_bounded_by_the_deadline() -> Result<()> {
    let entry = ProgramEntry::new("/bin/sleep", "").context("build sleep entry")?;
    let filter = filter_with(registry_of([(0, entry)])?, Duration::from_millis(200))?;
    let options = unescaped().with(OptionSlot::LegacyArgs, "3; echo done");
    let started = Instant::now();
    let Err(err) = filter.apply("", &options, None) else {
        bail!("sleeping shell command line should time out");
    };
    ensure!(
        matches!(err, FilterError::Timeout { .. }),
        "expected Timeout but got {err:?}"
    );
    ensure!(
        started.elapsed() < Duration::from_secs(1),
        "deadline should bound the shell launch, took {:?}",
        started.elapsed()
    );
    Ok(())
}

#[test]
fn bytes_that_are_not_utf8_reach_the_program_unchanged() -> Result<()> {
    let filter = sh_filter("cat")?;
    let escaped = InvocationOptions::new().with(OptionSlot::Escape, 1_i64);
    let out = filter.apply_bytes(b"caf\xe9 <b>", &escaped, None)?;
    ensure!(
        out.text == b"caf\xe9 &lt;b&gt;",
        "unexpected output {:?}",
        String::from_utf8_lossy(&out.text)
    );
    Ok(())
}

#[test]
fn missing_program_reports_launch_failure() -> Result<()> {
    let registry = registry_of([(0, bare_entry("/nonexistent/extfilter-missing")?)])?;
    let filter = filter_with(registry, GENEROUS_TIMEOUT)?;
    let Err(err) = filter.apply("data", &unescaped(), None) else {
        bail!("missing program should fail to launch");
    };
    match err {
        FilterError::Launch { program, .. } => ensure!(
            program == "/nonexistent/extfilter-missing",
            "unexpected program {program}"
        ),
        other => bail!("expected Launch but got {other:?}"),
    }
    Ok(())
}

#[test]
fn non_zero_exit_still_returns_output() -> Result<()> {
    let filter = sh_filter("echo partial; exit 3")?;
    let out = filter.apply("", &unescaped(), None)?;
    ensure!(out.text == "partial\n", "output should survive exit 3: {:?}", out.text);
    Ok(())
}

#[test]
fn large_input_round_trips_without_deadlock() -> Result<()> {
    let registry = registry_of([(0, bare_entry("/bin/cat")?)])?;
    let config = FilterConfig::new(registry, GENEROUS_TIMEOUT)?
        .with_max_output_bytes(16 * 1024 * 1024)?;
    let filter = ExternalFilter::new(config);
    // Over 4 MiB, well past any pipe buffer.
    let input = "0123456789abcdef\n".repeat(256 * 1024);
    let out = filter.apply(&input, &unescaped(), None)?;
    ensure!(out.text.len() == input.len(), "length {} != {}", out.text.len(), input.len());
    ensure!(out.text == input, "cat should echo its input unchanged");
    Ok(())
}

#[test]
fn program_closing_stdin_early_succeeds() -> Result<()> {
    let filter = sh_filter("head -n1")?;
    let input = "first line\n".repeat(200_000);
    let out = filter.apply(&input, &unescaped(), None)?;
    ensure!(out.text == "first line\n", "head should keep one line: {:?}", out.text);
    Ok(())
}

#[test]
fn legacy_arguments_are_appended_with_a_warning() -> Result<()> {
    let entry = ProgramEntry::new("/bin/echo", "fixed").context("build echo entry")?;
    let filter = filter_with(registry_of([(0, entry)])?, GENEROUS_TIMEOUT)?;
    let options = unescaped().with(OptionSlot::LegacyArgs, "extra words");
    let out = filter.apply("", &options, None)?;
    ensure!(out.text == "fixed extra words\n", "unexpected output {:?}", out.text);
    let expected = FilterWarning::DeprecatedArguments {
        args: "extra words".to_owned(),
    };
    ensure!(
        out.warnings == [expected],
        "expected a deprecation warning: {:?}",
        out.warnings
    );
    Ok(())
}

#[test]
fn script_file_runs_through_the_shell() -> Result<()> {
    let (_dir, path) = script_file("sed 's/^/> /'")?;
    let entry = ProgramEntry::new("/bin/sh", path.as_str()).context("build script entry")?;
    let filter = filter_with(registry_of([(0, entry)])?, GENEROUS_TIMEOUT)?;
    let out = filter.apply("quoted\n", &unescaped(), None)?;
    ensure!(out.text == "> quoted\n", "unexpected output {:?}", out.text);
    Ok(())
}

#[test]
fn invalid_utf8_output_is_replaced() -> Result<()> {
    let filter = sh_filter(r"printf 'a\377b'")?;
    let out = filter.apply("", &unescaped(), None)?;
    ensure!(out.text == "a\u{fffd}b", "expected replacement character: {:?}", out.text);
    Ok(())
}

#[rstest]
#[case::no_options(InvocationOptions::new(), true)]
#[case::empty_flag(InvocationOptions::new().with(OptionSlot::NoWrap, ""), true)]
#[case::int_one(InvocationOptions::new().with(OptionSlot::NoWrap, 1_i64), true)]
#[case::string_one(InvocationOptions::new().with(OptionSlot::NoWrap, "1"), true)]
#[case::int_zero(InvocationOptions::new().with(OptionSlot::NoWrap, 0_i64), false)]
fn wrap_hint_follows_the_fourth_option(
    #[case] options: InvocationOptions,
    #[case] expected: bool,
) -> Result<()> {
    let filter = sh_filter("cat")?;
    ensure!(
        filter.should_disable_wrap(&options) == expected,
        "should_disable_wrap mismatch for {options:?}"
    );
    let out = filter.apply("x", &options, None)?;
    ensure!(out.no_wrap == expected, "apply should report the same hint");
    Ok(())
}

#[test]
fn filter_can_be_shared_across_threads() -> Result<()> {
    let filter = sh_filter("tr a-z A-Z")?;
    thread::scope(|scope| -> Result<()> {
        let handles: Vec<_> = ["one", "two", "three"]
            .into_iter()
            .map(|word| {
                let filter = &filter;
                scope.spawn(move || filter.apply(word, &unescaped(), None))
            })
            .collect();
        for (handle, expected) in handles.into_iter().zip(["ONE", "TWO", "THREE"]) {
            let out = handle
                .join()
                .map_err(|_| anyhow::anyhow!("filter thread panicked"))??;
            ensure!(out.text == expected, "expected {expected} but got {:?}", out.text);
        }
        Ok(())
    })
}
