use anyhow::Context;
use clap::Parser;
use log::LevelFilter;
use rdbctl::debugger::{SessionOptions, StreamTransport};
use rdbctl::ui::config::{UiConfig, LINES_RANGE};
use rdbctl::ui::console::AppBuilder;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::time::Duration;

/// Poll timeout of a single read from the debug channel.
const CHANNEL_POLL_TIMEOUT: Duration = Duration::from_millis(50);

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Remote debug socket of the emulator
    #[clap(long, env = "RDBCTL_CONNECT", default_value = "127.0.0.1:56001")]
    connect: String,

    /// Configuration file (default: ~/.config/rdbctl/config.toml)
    #[clap(long)]
    config: Option<PathBuf>,

    /// Memory dump and disassembly lines, overrides configuration file
    #[clap(long, value_parser = parse_lines)]
    lines: Option<u32>,

    /// Don't re-anchor views at program counter when the target stops
    #[clap(long)]
    no_follow_pc: bool,

    /// Interval of polling for stop notifications in milliseconds
    #[clap(long, default_value_t = 200)]
    poll_ms: u64,

    /// Max time to wait for a reply in milliseconds
    #[clap(long, default_value_t = 5000)]
    timeout_ms: u64,

    /// Write logs into file instead of stderr
    #[clap(long)]
    log_file: Option<PathBuf>,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_lines(s: &str) -> Result<u32, String> {
    let lines: u32 = s.parse().map_err(|e| format!("{e}"))?;
    if !LINES_RANGE.contains(&lines) {
        return Err(format!(
            "must be in {}..={}",
            LINES_RANGE.start(),
            LINES_RANGE.end()
        ));
    }
    Ok(lines)
}

fn init_logger(args: &Args) -> anyhow::Result<()> {
    let level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).parse_default_env();
    if let Some(ref path) = args.log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.try_init()?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logger(&args)?;

    let config_path = args.config.clone().or_else(UiConfig::default_path);
    let config = config_path
        .as_deref()
        .map(UiConfig::load)
        .unwrap_or_default();

    let options = SessionOptions {
        lines: args.lines.unwrap_or(config.lines),
        follow_pc: config.follow_pc && !args.no_follow_pc,
        reply_timeout: Duration::from_millis(args.timeout_ms),
        poll_interval: Duration::from_millis(args.poll_ms),
    };

    let transport = StreamTransport::connect(&args.connect, CHANNEL_POLL_TIMEOUT)
        .with_context(|| format!("connect to {}", args.connect))?;
    log::info!(target: "session", "connected to {}", args.connect);

    let app = AppBuilder::new(options, config_path).build(Box::new(transport))?;
    app.run()
}
