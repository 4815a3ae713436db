use std::io::{self, BufWriter};
use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use deltawatch::config::{CliOverrides, Config};
use deltawatch::differ::ExternalDiff;
use deltawatch::error::WatchError;
use deltawatch::loop_controller::{LoopController, LoopResult};
use deltawatch::render::{RenderSink, TermCodes};
use deltawatch::runner::ShellRunner;

/// deltawatch: run commands repeatedly and show only what changed
#[derive(Parser, Debug)]
#[command(name = "deltawatch")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Commands to watch
    commands: Vec<String>,

    /// Additional command to watch (repeatable, runs before positional commands)
    #[arg(short = 'e', long = "exec", value_name = "CMD")]
    exec: Vec<String>,

    /// Move the cursor home every N renders in redraw mode (0 = never)
    #[arg(short = 'r', long = "refresh", value_name = "N")]
    refresh: Option<u32>,

    /// Seconds between runs (default: 2)
    #[arg(short = 'i', long = "interval", value_name = "SECS")]
    interval: Option<f64>,

    /// Number of runs, 0 for no limit (default: 1000)
    #[arg(short = 'c', long = "count", value_name = "N")]
    count: Option<u32>,

    /// Only refresh the timestamp when nothing changed
    #[arg(short = 's', long = "silent")]
    silent: bool,

    /// Don't print the timestamp header
    #[arg(long = "no-date")]
    no_date: bool,

    /// Don't print a newline after each render
    #[arg(long = "no-newline")]
    no_newline: bool,

    /// Same as --no-date --no-newline
    #[arg(short = 'p', long = "plain")]
    plain: bool,

    /// Redraw the screen in place
    #[arg(short = 'R', long = "redraw")]
    redraw: bool,

    /// Don't erase leftovers below the output in redraw mode
    #[arg(long = "no-clear")]
    no_clear: bool,

    /// Diff command, called as `<CMD> <old> <new>`
    #[arg(short = 'd', long = "diff", value_name = "CMD")]
    diff: Option<String>,

    /// Mark added and removed lines with + and - (default)
    #[arg(short = 'm', long = "markers", overrides_with = "no_markers")]
    markers: bool,

    /// Don't mark added and removed lines
    #[arg(long = "no-markers")]
    no_markers: bool,

    /// Show the previous version of changed lines (default)
    #[arg(short = 'o', long = "old", overrides_with = "no_old")]
    old: bool,

    /// Show removed lines as a bare marker instead of their old text
    #[arg(long = "no-old")]
    no_old: bool,

    /// Capture only stdout of the watched commands
    #[arg(long = "no-stderr")]
    no_stderr: bool,

    /// Shell used to run commands (default: sh)
    #[arg(long = "shell", value_name = "PROG")]
    shell: Option<String>,

    /// Run the watched commands concurrently
    #[arg(short = 'P', long = "parallel")]
    parallel: bool,

    /// Config file (TOML format)
    #[arg(long = "config")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

fn setup_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("deltawatch=debug,info")
    } else {
        EnvFilter::new("warn")
    };

    // stdout carries the rendered output
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Flags only override the config when given
fn flag(set: bool, value: bool) -> Option<bool> {
    set.then_some(value)
}

/// A `--foo`/`--no-foo` pair; the later one wins through `overrides_with`
fn toggle(on: bool, off: bool) -> Option<bool> {
    flag(off, false).or(flag(on, true))
}

fn overrides(cli: &Cli) -> CliOverrides {
    let mut commands = cli.exec.clone();
    commands.extend(cli.commands.iter().cloned());

    CliOverrides {
        commands,
        refresh: cli.refresh,
        interval: cli.interval,
        repeat: cli.count,
        silent: flag(cli.silent, true),
        show_date: flag(cli.no_date || cli.plain, false),
        trailing_newline: flag(cli.no_newline || cli.plain, false),
        redraw: flag(cli.redraw, true),
        clear_after: flag(cli.no_clear, false),
        diff_command: cli.diff.clone(),
        markers: toggle(cli.markers, cli.no_markers),
        show_old: toggle(cli.old, cli.no_old),
        merge_stderr: flag(cli.no_stderr, false),
        shell: cli.shell.clone(),
        parallel: flag(cli.parallel, true),
    }
}

fn load_config(cli: &Cli) -> Result<Config, WatchError> {
    // Start with default config or load from file
    let mut config = match cli.config {
        Some(ref path) => Config::from_file(path)?,
        None => match Config::default_path().filter(|p| p.is_file()) {
            Some(path) => {
                debug!("Loading config from {}", path.display());
                Config::from_file(&path)?
            }
            None => Config::default(),
        },
    };

    config.merge_cli_args(overrides(cli));
    config.validate()?;

    Ok(config)
}

async fn run(config: Config) -> Result<LoopResult, WatchError> {
    info!(
        "Watching {} command(s) every {}s",
        config.commands.len(),
        config.interval
    );
    match config.repeat_limit() {
        Some(n) => info!("Stopping after {} run(s)", n),
        None => info!("Running until interrupted"),
    }

    let runner = ShellRunner::new(&config);
    let differ = ExternalDiff::new(&config);
    debug!("Diff command: {}", differ.command());

    let sink = RenderSink::new(BufWriter::new(io::stdout()));
    let mut controller = LoopController::new(config, runner, differ, sink)?;

    // Dropping the loop on Ctrl+C kills running children and removes the buffers
    tokio::select! {
        result = controller.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
            Err(WatchError::ShutdownRequested)
        }
    }
}

/// Leave the cursor line clean after an interrupted redraw
fn restore_terminal() {
    use std::io::Write;

    let mut stdout = io::stdout();
    let _ = write!(stdout, "{}", TermCodes::ansi().erase_line);
    let _ = stdout.flush();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    // Load configuration
    let config = match load_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{} {}", "ERROR:".red().bold(), e);
            if e.is_usage() {
                eprintln!("Usage: deltawatch [OPTIONS] [COMMANDS]...  (see --help)");
                std::process::exit(2);
            }
            std::process::exit(1);
        }
    };
    let redraw = config.redraw;

    match run(config).await {
        Ok(_) => std::process::exit(0),
        Err(WatchError::ShutdownRequested) => {
            if redraw {
                restore_terminal();
            }
            std::process::exit(130); // Standard exit code for Ctrl+C
        }
        Err(e) => {
            eprintln!("{} {}", "ERROR:".red().bold(), e);
            std::process::exit(1);
        }
    }
}
