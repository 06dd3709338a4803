//! lifestats - printer usage counters on an emulated EEPROM
//!
//! CLI entry point with global panic handler.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use lifestats::config::{lifestats_home, Config};
use lifestats::error::{exit_codes, StatsError};
use lifestats::storage::FileStorage;

// =============================================================================
// CLI Definition
// =============================================================================

/// lifestats - printer usage counters on an emulated EEPROM
#[derive(Parser)]
#[command(name = "lifestats")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file to use instead of the layered lookup
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter (e.g. "debug", "lifestats=trace")
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the stored counters
    Show {
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
        /// Print hours and meters instead of raw counters
        #[arg(long, short)]
        summary: bool,
    },

    /// Zero the trip counters and persist them
    ResetTrip {
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Run the engine against a scripted print (saves only as the engine would)
    Simulate {
        /// Printing minutes
        #[arg(long, short)]
        minutes: u32,
        /// Idle minutes before the print starts
        #[arg(long, default_value_t = 0)]
        idle_minutes: u32,
        /// Filament fed per printing minute (mm)
        #[arg(long, default_value_t = lifestats::cli::simulate::DEFAULT_FEED_RATE)]
        feed_rate: f32,
        /// Extrusion multiplier
        #[arg(long, default_value_t = 1.0)]
        scale: f32,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() -> ExitCode {
    setup_panic_handler();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("lifestats error: {}", e);
            ExitCode::from(exit_codes::FAILURE as u8)
        }
    }
}

/// Set up the global panic handler.
///
/// On panic, logs to ~/.lifestats/crash.log and exits with code 3.
fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("lifestats panic: {}", info);

        if let Some(home) = lifestats_home() {
            let crash_log = home.join("crash.log");
            if let Ok(mut file) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&crash_log)
            {
                let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
                let _ = writeln!(file, "[{}] {}", timestamp, info);
            }
        }

        std::process::exit(exit_codes::CRASH);
    }));
}

/// Install the tracing subscriber. Logs go to stderr so JSON output stays clean.
fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("warn"));

    // Ignore the error if a subscriber is already set.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}

/// Run the CLI and return the exit code.
fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let cwd = std::env::current_dir()?;
    let config = load_config(cli.config.as_deref(), &cwd)?;

    match cli.command {
        Commands::Show {
            json,
            quiet,
            summary,
        } => run_show(config, json, quiet, summary),
        Commands::ResetTrip { json, quiet } => run_reset_trip(config, json, quiet),
        Commands::Simulate {
            minutes,
            idle_minutes,
            feed_rate,
            scale,
            json,
            quiet,
        } => {
            use lifestats::cli::SimulateOptions;

            let options = SimulateOptions {
                minutes,
                idle_minutes,
                feed_rate,
                scale,
                json,
                quiet,
            };
            run_simulate(config, &options)
        }
    }
}

/// Resolve configuration: an explicit file, or the layered lookup.
fn load_config(explicit: Option<&Path>, cwd: &Path) -> Result<Config, StatsError> {
    match explicit {
        Some(path) => Config::load_explicit(path),
        None => Ok(Config::load_from_cwd(cwd)),
    }
}

/// Open the EEPROM image named by the config.
fn open_storage(config: &Config) -> Result<FileStorage, StatsError> {
    let path = config.image_path().ok_or_else(|| {
        StatsError::config("Could not determine image path (no home directory)")
    })?;
    FileStorage::open(path, config.storage.capacity)
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::from(exit_codes::SUCCESS as u8)
    } else {
        ExitCode::from(exit_codes::FAILURE as u8)
    }
}

fn print_output(output: &str) {
    if let Some(line) = terminal_text(output) {
        println!("{}", line);
    }
}

/// Text to print for a formatted output, without its trailing newlines.
fn terminal_text(output: &str) -> Option<&str> {
    if output.is_empty() {
        None
    } else {
        Some(output.trim_end_matches('\n'))
    }
}

// =============================================================================
// Command Implementations
// =============================================================================

fn run_show(
    config: Config,
    json: bool,
    quiet: bool,
    summary: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use lifestats::cli::{ShowCommand, ShowOptions};

    let storage = open_storage(&config)?;
    let cmd = ShowCommand::new(storage, config);
    let options = ShowOptions {
        json,
        quiet,
        summary,
    };

    let output = cmd.run();
    print_output(&cmd.format_output(&output, &options));

    Ok(exit_code(output.success))
}

fn run_reset_trip(
    config: Config,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use lifestats::cli::{ResetTripCommand, ResetTripOptions};

    let storage = open_storage(&config)?;
    let mut cmd = ResetTripCommand::new(storage, config);
    let options = ResetTripOptions { json, quiet };

    let output = cmd.run();
    print_output(&cmd.format_output(&output, &options));

    Ok(exit_code(output.success))
}

fn run_simulate(
    config: Config,
    options: &lifestats::cli::SimulateOptions,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use lifestats::cli::SimulateCommand;

    let storage = open_storage(&config)?;
    let mut cmd = SimulateCommand::new(storage, config);

    let output = cmd.run(options);
    print_output(&cmd.format_output(&output, options));

    Ok(exit_code(output.success))
}

// =============================================================================
// Tests
// =============================================================================
