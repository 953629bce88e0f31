//! Command grammar for driving the controller on a virtual bench.
//!
//! The emulator reads one command per line:
//!
//! ```text
//! pulse [count] [every <duration>]
//! wait <duration>
//! resync | status | history
//! help [topic]
//! ```
//!
//! Durations are bare milliseconds or carry an `ms`/`s` suffix. The parser is
//! built from `winnow` combinators over `&str` and never allocates.

use core::{fmt, time::Duration};

use winnow::ModalResult;
use winnow::ascii::{digit1, space0, space1};
use winnow::combinator::{alt, eof, opt, preceded, terminated};
use winnow::prelude::*;
use winnow::token::rest;

/// Spacing used when `pulse` is given a count but no interval.
pub const DEFAULT_PULSE_SPACING: Duration = Duration::from_millis(50);

/// One parsed bench command.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BenchCommand<'a> {
    /// Inject `count` input pulses, `every` apart.
    Pulse { count: u32, every: Option<Duration> },
    /// Let virtual time run, polling the controller every millisecond.
    Wait(Duration),
    /// Invoke the timeout handler immediately.
    Resync,
    Status,
    History,
    Help(Option<&'a str>),
}

impl BenchCommand<'_> {
    /// Interval between injected pulses, falling back to [`DEFAULT_PULSE_SPACING`].
    #[must_use]
    pub fn pulse_spacing(&self) -> Option<Duration> {
        match self {
            BenchCommand::Pulse { every, .. } => Some(every.unwrap_or(DEFAULT_PULSE_SPACING)),
            _ => None,
        }
    }
}

/// Parse failure with the byte offset where the grammar gave up.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ScriptError<'a> {
    pub input: &'a str,
    pub offset: usize,
}

impl fmt::Display for ScriptError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let remainder = self.input.get(self.offset..).unwrap_or("");
        if remainder.is_empty() {
            write!(f, "unexpected end of input at column {}", self.offset + 1)
        } else {
            write!(f, "unexpected `{remainder}` at column {}", self.offset + 1)
        }
    }
}

/// Parses one command line.
pub fn parse_command(line: &str) -> Result<BenchCommand<'_>, ScriptError<'_>> {
    preceded(space0, terminated(command, (space0, eof)))
        .parse(line)
        .map_err(|err| ScriptError {
            input: line,
            offset: err.offset(),
        })
}

fn command<'a>(input: &mut &'a str) -> ModalResult<BenchCommand<'a>> {
    alt((
        pulse,
        wait,
        "resync".value(BenchCommand::Resync),
        "status".value(BenchCommand::Status),
        "history".value(BenchCommand::History),
        help,
    ))
    .parse_next(input)
}

fn pulse<'a>(input: &mut &'a str) -> ModalResult<BenchCommand<'a>> {
    preceded(
        "pulse",
        (
            opt(preceded(space1, integer)),
            opt(preceded((space1, "every", space1), duration)),
        ),
    )
    .map(|(count, every)| BenchCommand::Pulse {
        count: count.unwrap_or(1),
        every,
    })
    .parse_next(input)
}

fn wait<'a>(input: &mut &'a str) -> ModalResult<BenchCommand<'a>> {
    preceded(("wait", space1), duration)
        .map(BenchCommand::Wait)
        .parse_next(input)
}

fn help<'a>(input: &mut &'a str) -> ModalResult<BenchCommand<'a>> {
    preceded("help", opt(preceded(space1, rest)))
        .map(|topic: Option<&'a str>| {
            BenchCommand::Help(topic.map(str::trim).filter(|topic| !topic.is_empty()))
        })
        .parse_next(input)
}

fn integer(input: &mut &str) -> ModalResult<u32> {
    digit1
        .verify_map(|digits: &str| digits.parse::<u32>().ok())
        .parse_next(input)
}

fn duration(input: &mut &str) -> ModalResult<Duration> {
    (integer, opt(alt(("ms", "s"))))
        .map(|(value, unit)| match unit {
            Some("s") => Duration::from_secs(u64::from(value)),
            _ => Duration::from_millis(u64::from(value)),
        })
        .parse_next(input)
}
