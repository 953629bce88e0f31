use std::io;
use std::path::PathBuf;

use critical_section as _;

use resetter_core::alignment::AlignedBurst;
use resetter_core::config::{ResetterConfig, Steps};

#[allow(dead_code)]
#[path = "../session.rs"]
mod session;

use session::Session;

fn main() -> io::Result<()> {
    record(
        "partial-burst",
        ResetterConfig::DEFAULT,
        &["pulse 5 every 125ms", "wait 2s", "status", "history"],
    )?;
    record(
        "aligned-burst",
        ResetterConfig::DEFAULT,
        &["pulse 8 every 125ms", "wait 3s", "history"],
    )?;
    record(
        "aligned-skip",
        ResetterConfig::DEFAULT.with_aligned_burst(AlignedBurst::Skip),
        &["pulse 16 every 125ms", "wait 1500ms", "history"],
    )?;
    record(
        "single-step",
        ResetterConfig::DEFAULT.with_steps(Steps::MIN),
        &["pulse 3", "wait 1500ms", "pulse", "wait 1500ms", "history"],
    )?;
    Ok(())
}

fn record(name: &str, config: ResetterConfig, commands: &[&str]) -> io::Result<()> {
    let path = PathBuf::from("evidence").join(format!("emulator-{name}.log"));
    let mut session = Session::new(config, Some(&path))?;
    for command in commands {
        let _ = session.handle_command(command)?;
    }
    println!("wrote {}", path.display());
    Ok(())
}
