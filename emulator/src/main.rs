use critical_section as _;

mod session;

use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use resetter_core::alignment::AlignedBurst;
use resetter_core::config::{ResetterConfig, Steps};
use session::Session;

const USAGE: &str = "Usage: resetter-emulator [--steps <1-8>] [--gate <ms>] [--timeout <ms>] \
                     [--startup-delay <ms>] [--skip-aligned] [--transcript <path>]";

struct Options {
    config: ResetterConfig,
    transcript: Option<PathBuf>,
}

fn main() -> io::Result<()> {
    let options = parse_options().unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!("{USAGE}");
        process::exit(2);
    });

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    let mut session = Session::new(options.config, options.transcript.as_deref())?;
    let mut line = String::new();

    writeln!(
        writer,
        "DFAM Resetter Emulator ready. Type `help` for commands or `exit` to quit."
    )?;
    writeln!(writer, "{}", session.startup())?;

    loop {
        line.clear();
        write!(writer, "> ")?;
        writer.flush()?;

        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            writeln!(writer)?;
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if should_terminate(trimmed) {
            writeln!(
                writer,
                "Session closed at {} after {} output pulses.",
                session.now(),
                session.output_pulses()
            )?;
            break;
        }

        let responses = session.handle_command(trimmed)?;
        for response in responses {
            writeln!(writer, "{response}")?;
        }
    }

    Ok(())
}

fn should_terminate(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

fn parse_options() -> Result<Options, String> {
    let mut config = ResetterConfig::DEFAULT;
    let mut transcript = None;
    let mut args = env::args().skip(1);

    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) => (flag.to_string(), Some(value.to_string())),
            None => (arg, None),
        };

        if flag == "--skip-aligned" {
            config = config.with_aligned_burst(AlignedBurst::Skip);
            continue;
        }

        let value = match inline {
            Some(value) => value,
            None => args
                .next()
                .ok_or_else(|| format!("Expected value after {flag}"))?,
        };

        match flag.as_str() {
            "--steps" => {
                let raw = parse_number::<u8>(&flag, &value)?;
                let steps = Steps::new(raw).map_err(|err| err.to_string())?;
                config = config.with_steps(steps);
            }
            "--gate" => config = config.with_gate(parse_millis(&flag, &value)?),
            "--timeout" => config = config.with_auto_reset_time(parse_millis(&flag, &value)?),
            "--startup-delay" => config = config.with_startup_delay(parse_millis(&flag, &value)?),
            "--transcript" => transcript = Some(PathBuf::from(value)),
            _ => return Err(format!("Unknown option `{flag}`")),
        }
    }

    config.validate().map_err(|err| err.to_string())?;
    Ok(Options { config, transcript })
}

fn parse_number<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T, String> {
    value
        .parse::<T>()
        .map_err(|_| format!("Invalid value `{value}` for {flag}"))
}

fn parse_millis(flag: &str, value: &str) -> Result<Duration, String> {
    parse_number::<u64>(flag, value).map(Duration::from_millis)
}
