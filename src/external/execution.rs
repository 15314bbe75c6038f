//! Running a filter program to completion.
//!
//! Input is written and output is read on two scoped threads while the
//! calling thread waits for the program, so neither pipe can fill up and
//! stall the other. Every wait, including the wait for the pipe threads to
//! drain after the program exits, is bounded by the deadline. When a wait
//! ends early the program's whole process group is killed, so descendants
//! that inherited the pipes cannot keep the threads blocked.

use std::{
    io,
    process::{Child, Command, ExitStatus},
    thread,
    time::{Duration, Instant},
};

use wait_timeout::ChildExt;

use super::{
    cancel::CancelToken,
    error::CommandFailure,
    pipes::{PipeLimit, read_output, reader_outcome, write_input, writer_outcome},
};

/// How often a waiting call checks for cancellation and overflow.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Bounds applied to a single program run.
pub(super) struct RunLimits<'a> {
    pub(super) timeout: Duration,
    pub(super) max_output_bytes: u64,
    pub(super) cancel: &'a CancelToken,
}

/// Conditions that end a wait early.
struct Watch<'a> {
    deadline: Option<Instant>,
    limits: &'a RunLimits<'a>,
    overflow: &'a CancelToken,
}

impl Watch<'_> {
    /// Length of the next wait slice, or the reason to stop waiting.
    fn next_slice(&self) -> Result<Duration, CommandFailure> {
        if self.overflow.is_cancelled() {
            return Err(CommandFailure::OutputLimit {
                limit: self.limits.max_output_bytes,
            });
        }
        if self.limits.cancel.is_cancelled() {
            return Err(CommandFailure::Cancelled);
        }
        let Some(deadline) = self.deadline else {
            return Ok(POLL_INTERVAL);
        };
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(CommandFailure::Timeout(self.limits.timeout));
        }
        Ok(remaining.min(POLL_INTERVAL))
    }
}

/// Spawn `command`, feed it `input`, and collect its standard output.
///
/// The exit status is logged but does not affect the result.
pub(super) fn run_filter(
    mut command: Command,
    input: &[u8],
    limits: &RunLimits<'_>,
) -> Result<Vec<u8>, CommandFailure> {
    if limits.cancel.is_cancelled() {
        return Err(CommandFailure::Cancelled);
    }
    let mut child = command.spawn().map_err(CommandFailure::Spawn)?;
    let stdin = child.stdin.take();
    let stdout = child.stdout.take();
    let output_limit = PipeLimit::new(limits.max_output_bytes);
    let overflow = CancelToken::new();
    let watch = Watch {
        deadline: Instant::now().checked_add(limits.timeout),
        limits,
        overflow: &overflow,
    };

    thread::scope(|scope| {
        let writer = stdin.map(|pipe| scope.spawn(move || write_input(pipe, input)));
        let reader = stdout.map(|pipe| {
            let overflow = &overflow;
            scope.spawn(move || {
                let output = read_output(pipe, output_limit);
                if matches!(output, Err(CommandFailure::OutputLimit { .. })) {
                    overflow.cancel();
                }
                output
            })
        });

        let status = wait_for_exit(&mut child, &watch).and_then(|status| {
            let drained = || {
                reader.as_ref().is_none_or(thread::ScopedJoinHandle::is_finished)
                    && writer.as_ref().is_none_or(thread::ScopedJoinHandle::is_finished)
            };
            wait_for_pipes(&child, &watch, drained).map(|()| status)
        });
        let output = reader.map_or_else(|| Ok(Vec::new()), |handle| reader_outcome(handle.join()));
        let written = writer.map_or(Ok(()), |handle| writer_outcome(handle.join()));

        let status = status?;
        let output = output?;
        written?;
        if !status.success() {
            tracing::debug!(code = ?status.code(), "filter program exited unsuccessfully");
        }
        Ok(output)
    })
}

fn wait_for_exit(child: &mut Child, watch: &Watch<'_>) -> Result<ExitStatus, CommandFailure> {
    loop {
        let slice = match watch.next_slice() {
            Ok(slice) => slice,
            Err(failure) => {
                terminate(child);
                return Err(failure);
            }
        };
        match child.wait_timeout(slice) {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {}
            Err(err) => {
                terminate(child);
                return Err(CommandFailure::Io(err));
            }
        }
    }
}

/// Wait for the pipe threads after the program itself has exited.
///
/// A descendant that inherited stdout or stdin keeps the threads busy; once
/// the watch expires the rest of the process group is killed.
fn wait_for_pipes(
    child: &Child,
    watch: &Watch<'_>,
    drained: impl Fn() -> bool,
) -> Result<(), CommandFailure> {
    while !drained() {
        match watch.next_slice() {
            Ok(slice) => thread::sleep(slice),
            Err(CommandFailure::OutputLimit { .. }) if drained() => break,
            Err(failure) => {
                kill_group(child);
                return Err(failure);
            }
        }
    }
    Ok(())
}

fn terminate(child: &mut Child) {
    kill_group(child);
    if let Err(err) = child.kill()
        && err.kind() != io::ErrorKind::InvalidInput
    {
        tracing::warn!("failed to kill filter program: {err}");
    }
    if let Err(err) = child.wait() {
        tracing::warn!("failed to reap filter program: {err}");
    }
}

/// Kill every process left in the program's process group.
#[cfg(unix)]
fn kill_group(child: &Child) {
    use rustix::{
        io::Errno,
        process::{Pid, Signal, kill_process_group},
    };

    let Some(pid) = i32::try_from(child.id()).ok().and_then(Pid::from_raw) else {
        return;
    };
    if let Err(err) = kill_process_group(pid, Signal::KILL)
        && err != Errno::SRCH
    {
        tracing::warn!("failed to kill filter process group: {err}");
    }
}

#[cfg(not(unix))]
fn kill_group(_child: &Child) {}
