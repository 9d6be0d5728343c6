//! Batch scripts: several device operations in one session.
//!
//! Repairs only last as long as the engine, so exercising remap-on-write
//! from the command line needs every step to run against the same engine.
//!
//! ```text
//! # comment
//! read 5120 512
//! write 5120 deadbeef
//! sync
//! stats
//! ```

use crate::engine::Engine;
use crate::error::{Error, Result};
use std::io::{BufRead, Write};
use tracing::debug;

/// One line of a batch script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchCommand {
    Read { offset: u64, length: usize },
    Write { offset: u64, data: Vec<u8> },
    Sync,
    Stats,
}

/// Totals for a finished script.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub operations: usize,
    pub faults: usize,
}

impl BatchCommand {
    /// Parse a script line. Blank lines and `#` comments yield `None`.
    pub fn parse(line: &str) -> std::result::Result<Option<Self>, String> {
        let line = line.trim();
        if line.starts_with('#') {
            return Ok(None);
        }

        let words: Vec<&str> = line.split_whitespace().collect();
        let command = match words.as_slice() {
            ["read", offset, length] => BatchCommand::Read {
                offset: parse_number(offset, "offset")?,
                length: parse_number(length, "length")?,
            },
            ["write", offset, data] => BatchCommand::Write {
                offset: parse_number(offset, "offset")?,
                data: hex::decode(data).map_err(|e| format!("invalid hex data: {}", e))?,
            },
            ["sync"] => BatchCommand::Sync,
            ["stats"] => BatchCommand::Stats,
            [name, ..] => return Err(format!("unknown or malformed command '{}'", name)),
            [] => return Ok(None),
        };

        Ok(Some(command))
    }
}

fn parse_number<T: std::str::FromStr>(word: &str, what: &str) -> std::result::Result<T, String> {
    word.parse()
        .map_err(|_| format!("invalid {} '{}'", what, word))
}

/// Run a script against `engine`, writing one result line per operation.
///
/// Device faults are reported and the script continues. Malformed lines and
/// any other error stop the script.
pub fn run_script<R: BufRead, W: Write>(engine: &Engine, script: R, mut out: W) -> Result<BatchSummary> {
    let mut summary = BatchSummary::default();

    for (index, line) in script.lines().enumerate() {
        let line = line?;
        let line_no = index + 1;
        let Some(command) = BatchCommand::parse(&line)
            .map_err(|message| Error::Script { line: line_no, message })?
        else {
            continue;
        };

        debug!(line = line_no, ?command, "batch command");
        summary.operations += 1;

        let outcome = execute(engine, &command, &mut out);
        match outcome {
            Ok(()) => {}
            Err(Error::DeviceFault { sector }) => {
                summary.faults += 1;
                writeln!(out, "{}: device fault at sector {}", describe(&command), sector)?;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(summary)
}

fn execute<W: Write>(engine: &Engine, command: &BatchCommand, out: &mut W) -> Result<()> {
    match command {
        BatchCommand::Read { offset, length } => {
            let data = engine.read(*offset, *length)?;
            writeln!(
                out,
                "{}: {} bytes {}",
                describe(command),
                data.len(),
                hex::encode(&data)
            )?;
        }
        BatchCommand::Write { offset, data } => {
            let written = engine.write(*offset, data)?;
            writeln!(out, "{}: {} bytes written", describe(command), written)?;
        }
        BatchCommand::Sync => {
            engine.sync()?;
            writeln!(out, "sync: ok")?;
        }
        BatchCommand::Stats => {
            let stats = engine.stats();
            writeln!(
                out,
                "stats: bad={} reserve={} repaired={}",
                stats.bad_sectors, stats.reserve_remaining, stats.repaired
            )?;
        }
    }
    Ok(())
}

fn describe(command: &BatchCommand) -> String {
    match command {
        BatchCommand::Read { offset, length } => format!("read {} {}", offset, length),
        BatchCommand::Write { offset, data } => format!("write {} ({} bytes)", offset, data.len()),
        BatchCommand::Sync => "sync".to_string(),
        BatchCommand::Stats => "stats".to_string(),
    }
}
