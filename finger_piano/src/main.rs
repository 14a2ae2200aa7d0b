//! finger_piano: interactive entry point.

use std::path::PathBuf;

use clap::Parser;
use finger_piano::app::{run, SourceMode};
use finger_piano::config::AppConfig;

#[derive(Parser, Debug, Default, PartialEq)]
#[command(name = "finger_piano", about = "Camera hand-tracking five-note piano")]
struct Cli {
    /// Read settings from this TOML file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Keyboard simulation, even if a tracker is configured
    #[arg(long)]
    sim: bool,

    /// Run COMMAND as the landmark tracker instead of the configured one
    #[arg(long, requires = "command")]
    tracker: bool,

    /// Tracker program and its arguments; everything after it is passed on
    #[arg(
        value_name = "COMMAND",
        trailing_var_arg = true,
        allow_hyphen_values = true,
        requires = "tracker",
    )]
    command: Vec<String>,
}

fn select_mode(cli: Cli, cfg: &mut AppConfig) -> SourceMode {
    if cli.sim {
        return SourceMode::Simulation;
    }
    if cli.tracker {
        cfg.tracker.command = cli.command;
    }
    if cfg.tracker.command.is_empty() {
        SourceMode::Simulation
    } else {
        SourceMode::Tracker
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = try_main() {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

fn try_main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut cfg = AppConfig::load(cli.config.as_deref())?;
    let mode = select_mode(cli, &mut cfg);

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║              Finger Piano — camera hand keyboard             ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
    match mode {
        SourceMode::Simulation =>
            println!("  Mode: Keyboard simulation  (configure a tracker or pass --tracker)"),
        SourceMode::Tracker =>
            println!("  Mode: Tracker  ({})", cfg.tracker.command.join(" ")),
    }
    println!("  Notes: {}", cfg.session.original.banner());
    println!();

    run(cfg, mode)
}
