//! Pipe helpers run on the writer and reader threads of a filter call.

use std::{
    io::{self, Read, Write},
    thread,
};

use super::error::CommandFailure;

const PIPE_CHUNK_SIZE: usize = 8192;

/// Byte budget for a single output pipe.
pub(super) struct PipeLimit {
    limit: u64,
    consumed: u64,
}

impl PipeLimit {
    pub(super) const fn new(limit: u64) -> Self {
        Self { limit, consumed: 0 }
    }

    pub(super) fn record(&mut self, read: usize) -> Result<(), CommandFailure> {
        let bytes = u64::try_from(read)
            .map_err(|_| CommandFailure::Io(io::Error::other("pipe read size overflow")))?;
        let new_total = self
            .consumed
            .checked_add(bytes)
            .ok_or_else(|| CommandFailure::Io(io::Error::other("pipe output size overflow")))?;
        if new_total > self.limit {
            return Err(CommandFailure::OutputLimit { limit: self.limit });
        }
        self.consumed = new_total;
        Ok(())
    }
}

/// Write all of `input` and close the pipe by dropping it.
pub(super) fn write_input<W>(mut pipe: W, input: &[u8]) -> io::Result<()>
where
    W: Write,
{
    pipe.write_all(input)?;
    pipe.flush()
}

/// Read `pipe` to end-of-stream within `limit`.
pub(super) fn read_output<R>(mut pipe: R, mut limit: PipeLimit) -> Result<Vec<u8>, CommandFailure>
where
    R: Read,
{
    let mut buf = Vec::new();
    let mut chunk = [0_u8; PIPE_CHUNK_SIZE];
    loop {
        let read = match pipe.read(&mut chunk) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(CommandFailure::Io(err)),
        };
        limit.record(read)?;
        buf.extend(chunk.iter().take(read).copied());
    }
    Ok(buf)
}

/// Interpret the writer thread's result.
///
/// A program may legitimately stop reading before the input ends (`head`,
/// for instance), so a broken pipe is not a failure.
pub(super) fn writer_outcome(joined: thread::Result<io::Result<()>>) -> Result<(), CommandFailure> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) if err.kind() == io::ErrorKind::BrokenPipe => {
            tracing::debug!("filter program closed stdin before reading all input");
            Ok(())
        }
        Ok(Err(err)) => Err(CommandFailure::Io(err)),
        Err(_) => Err(CommandFailure::Io(io::Error::other("stdin writer panicked"))),
    }
}

/// Interpret the reader thread's result.
pub(super) fn reader_outcome(
    joined: thread::Result<Result<Vec<u8>, CommandFailure>>,
) -> Result<Vec<u8>, CommandFailure> {
    joined.map_err(|_| CommandFailure::Io(io::Error::other("stdout reader panicked")))?
}
