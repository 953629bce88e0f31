use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use resetter_core::bench::{LineLevel, MAX_SCHEDULED_PULSES, PulseTrace, TraceOutput, VirtualClock};
use resetter_core::config::ResetterConfig;
use resetter_core::controller::{ResetController, ResyncReport, StartupReport};
use resetter_core::recorder::PulseRecorder;
use resetter_core::script::{BenchCommand, parse_command};
use resetter_core::time::PulseInstant;

/// Resolution of the emulated poll loop.
const POLL_TICK: Duration = Duration::from_millis(1);

pub const HELP_TOPICS: &[(&str, &str)] = &[
    (
        "pulse",
        "pulse [count] [every <duration>] - inject input pulses (default spacing 50ms)",
    ),
    (
        "wait",
        "wait <duration>                  - let time pass while the controller polls",
    ),
    (
        "resync",
        "resync                           - run the timeout handler immediately",
    ),
    (
        "status",
        "status                           - show controller and recorder state",
    ),
    (
        "history",
        "history                          - list recent resync events",
    ),
    (
        "help",
        "help [topic]                     - show help for a command",
    ),
];

type BenchOutput = TraceOutput<'static, VirtualClock<'static>>;
type BenchController = ResetController<'static, BenchOutput, &'static VirtualClock<'static>>;

/// Interactive session driving the core controller on a virtual bench.
pub struct Session {
    controller: BenchController,
    recorder: &'static PulseRecorder,
    clock: &'static VirtualClock<'static>,
    trace: &'static PulseTrace,
    startup: StartupReport,
    transcript: Option<TranscriptLogger>,
}

impl Session {
    /// Builds the bench and runs the controller's startup routine.
    pub fn new(config: ResetterConfig, transcript: Option<&Path>) -> io::Result<Self> {
        config
            .validate()
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err.to_string()))?;

        // The bench lives for the whole process; leaking gives the controller
        // the same `'static` borrows the firmware statics provide.
        let recorder: &'static PulseRecorder = Box::leak(Box::new(PulseRecorder::new()));
        let clock: &'static VirtualClock<'static> =
            Box::leak(Box::new(VirtualClock::with_input(recorder)));
        let trace: &'static PulseTrace = Box::leak(Box::new(PulseTrace::new()));

        let mut controller =
            ResetController::new(config, recorder, TraceOutput::new(trace, clock), clock);
        let startup = controller.startup();

        let mut transcript = transcript.map(TranscriptLogger::new).transpose()?;
        if let Some(logger) = transcript.as_mut() {
            logger.write_header(&config)?;
            logger.append_line(startup.armed_at, TranscriptRole::Controller, &startup.to_string())?;
        }

        Ok(Self {
            controller,
            recorder,
            clock,
            trace,
            startup,
            transcript,
        })
    }

    pub fn startup(&self) -> &StartupReport {
        &self.startup
    }

    pub fn now(&self) -> PulseInstant {
        self.clock.now()
    }

    /// Output pulses sent since boot, including the startup train.
    pub fn output_pulses(&self) -> u32 {
        self.trace.pulses()
    }

    pub fn handle_command(&mut self, line: &str) -> io::Result<Vec<String>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let issued_at = self.clock.now();
        if let Some(logger) = self.transcript.as_mut() {
            logger.append_line(issued_at, TranscriptRole::Host, trimmed)?;
        }

        let lines = match parse_command(trimmed) {
            Ok(BenchCommand::Pulse { count, .. }) if count as usize > MAX_SCHEDULED_PULSES => {
                vec![format!(
                    "ERR pulse count {count} exceeds {MAX_SCHEDULED_PULSES}"
                )]
            }
            Ok(command @ BenchCommand::Pulse { count, .. }) => {
                let spacing = command.pulse_spacing().unwrap_or(POLL_TICK);
                self.inject_pulses(count, spacing)
            }
            Ok(BenchCommand::Wait(duration)) => self.run_for(duration),
            Ok(BenchCommand::Resync) => {
                let report = self.controller.resync();
                vec![describe_resync(&report)]
            }
            Ok(BenchCommand::Status) => self.status_lines(),
            Ok(BenchCommand::History) => self.history_lines(),
            Ok(BenchCommand::Help(topic)) => help_lines(topic),
            Err(err) => vec![format!("ERR syntax {err}")],
        };

        self.record_output(&lines)?;
        Ok(lines)
    }

    fn inject_pulses(&mut self, count: u32, spacing: Duration) -> Vec<String> {
        let mut at = self.clock.now();
        for index in 0..count {
            if index > 0 {
                at += spacing;
            }
            if let Err(err) = self.clock.schedule_pulse(at) {
                return vec![format!("ERR schedule {err}")];
            }
        }

        let mut lines = Vec::new();
        while self.clock.scheduled() > 0 {
            self.tick(&mut lines);
        }
        lines.push(format!(
            "ok {count} pulses injected, t={}",
            self.clock.now()
        ));
        lines
    }

    fn run_for(&mut self, duration: Duration) -> Vec<String> {
        let deadline = self.clock.now() + duration;
        let mut lines = Vec::new();
        while self.clock.now().as_millis() < deadline.as_millis() {
            self.tick(&mut lines);
        }
        lines.push(format!("ok t={}", self.clock.now()));
        lines
    }

    /// One poll-loop iteration followed by one millisecond of virtual time.
    fn tick(&mut self, lines: &mut Vec<String>) {
        if let Some(report) = self.controller.poll() {
            lines.push(describe_resync(&report));
        }
        self.clock.advance(POLL_TICK);
    }

    fn status_lines(&self) -> Vec<String> {
        let config = self.controller.config();
        let mut lines = vec![
            format!(
                "phase={} t={} steps={} gate={}ms timeout={}ms",
                self.controller.phase(),
                self.controller.now(),
                config.steps,
                config.gate.as_millis(),
                config.auto_reset_time.as_millis()
            ),
        ];

        match self.recorder.pending() {
            Some(burst) => lines.push(format!(
                "pending: count={} last={} idle={}ms",
                burst.count,
                burst.last_pulse,
                self.clock.now().elapsed_since(burst.last_pulse).as_millis()
            )),
            None => lines.push("pending: none".to_string()),
        }

        let level = match self.trace.level() {
            LineLevel::Low => "low",
            LineLevel::High => "high",
        };
        lines.push(format!(
            "output: pulses={} level={level} resyncs={}",
            self.trace.pulses(),
            self.controller.history().total()
        ));
        lines
    }

    fn history_lines(&self) -> Vec<String> {
        let history = self.controller.history();
        if history.is_empty() {
            return vec!["no resyncs yet".to_string()];
        }

        history
            .oldest_first()
            .map(|report| {
                format!(
                    "{} input={} output={} steps={} idle={}ms",
                    report.at,
                    report.input_pulses,
                    report.output_pulses,
                    report.steps,
                    report.idle_for.as_millis()
                )
            })
            .collect()
    }

    fn record_output(&mut self, lines: &[String]) -> io::Result<()> {
        let now = self.clock.now();
        if let Some(logger) = self.transcript.as_mut() {
            for line in lines {
                logger.append_line(now, TranscriptRole::Controller, line)?;
            }
            logger.flush()?;
        }
        Ok(())
    }
}

fn describe_resync(report: &ResyncReport) -> String {
    format!("[{}] {report}", report.at)
}

fn help_lines(topic: Option<&str>) -> Vec<String> {
    match topic {
        Some(target) => {
            if let Some((_, detail)) = HELP_TOPICS
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(target))
            {
                vec![(*detail).to_string()]
            } else {
                vec![
                    format!("No help available for `{target}`."),
                    format!("Available topics: {}", help_topic_list()),
                ]
            }
        }
        None => {
            let mut lines = vec!["Available commands:".to_string()];
            for (_, detail) in HELP_TOPICS {
                lines.push(format!("  {detail}"));
            }
            lines.push("Type `help <topic>` for a specific command.".to_string());
            lines
        }
    }
}

fn help_topic_list() -> String {
    HELP_TOPICS
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum TranscriptRole {
    Host,
    Controller,
}

impl TranscriptRole {
    fn tag(self) -> &'static str {
        match self {
            TranscriptRole::Host => "host",
            TranscriptRole::Controller => "ctrl",
        }
    }
}

struct TranscriptLogger {
    writer: BufWriter<fs::File>,
}

impl TranscriptLogger {
    fn new(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    fn write_header(&mut self, config: &ResetterConfig) -> io::Result<()> {
        writeln!(self.writer, "# DFAM resetter emulator transcript")?;
        writeln!(
            self.writer,
            "# steps={} gate={}ms timeout={}ms startup-delay={}ms aligned={:?}",
            config.steps,
            config.gate.as_millis(),
            config.auto_reset_time.as_millis(),
            config.startup_delay.as_millis(),
            config.aligned_burst
        )?;
        writeln!(self.writer, "# Timestamps are virtual milliseconds since boot")
    }

    fn append_line(&mut self, at: PulseInstant, role: TranscriptRole, text: &str) -> io::Result<()> {
        writeln!(self.writer, "{:>8} {:<4} {text}", at.as_millis(), role.tag())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
