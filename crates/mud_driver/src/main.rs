//! # mud-driver
//!
//! Starts the game loop with the placeholder guest game. Logs go to the
//! console and to the driver and game log files.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use mud_driver::config::{self, DEFAULT_CONFIG_FILE};
use mud_driver::logging::{DRIVER_LOG_FILE, GAME_LOG_FILE};
use mud_driver::{
    console, ConfigOverrides, DriverConfig, DriverError, DriverResult, DriverRuntime, GameLoop, GuestHooks, LogFiles,
    GAME_LOG_TARGET,
};
use tracing::{error, info, Level};
use tracing_subscriber::filter::Targets;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "mud-driver", version, about = "MUD game driver")]
struct Cli {
    /// Path to the driver configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Root directory of the mudlib, overrides the file
    #[arg(long)]
    mud_dir: Option<PathBuf>,

    /// Memory reserve in bytes, overrides the file
    #[arg(long)]
    memory_reserve: Option<u64>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Print a configuration template and exit
    #[arg(long)]
    print_template: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_effective: bool,

    /// Attach stdin as a player connection
    #[arg(long)]
    console: bool,

    /// Shut down after this many heartbeats (0 = run until shutdown)
    #[arg(long, default_value_t = 0)]
    heartbeats: u64,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.print_template {
        print!("{}", config::template());
        return ExitCode::SUCCESS;
    }

    let overrides = ConfigOverrides {
        mud_dir: cli.mud_dir.clone(),
        memory_reserve: cli.memory_reserve,
    };
    let config = match DriverConfig::load(&cli.config, &overrides) {
        Ok(config) => config,
        Err(e) => return fail(&cli, &e),
    };
    if cli.print_effective {
        print!("{}", config.effective_settings());
        return ExitCode::SUCCESS;
    }

    let files = match LogFiles::open(&config) {
        Ok(files) => files,
        Err(e) => return fail(&cli, &e),
    };
    init_tracing(&cli.log_level, Some(files));

    match run(&cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(%e, "driver failed");
            ExitCode::FAILURE
        }
    }
}

/// Reports a startup error on the console only, the logs aren't open yet.
fn fail(cli: &Cli, e: &DriverError) -> ExitCode {
    init_tracing(&cli.log_level, None);
    error!(%e, "driver failed to start");
    ExitCode::FAILURE
}

/// Console output always, plus the driver and game logs once they are open.
fn init_tracing(level: &str, files: Option<LogFiles>) {
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let (driver_log, game_log) = match files {
        Some(files) => (
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Arc::new(files.driver))
                    .with_filter(filter()),
            ),
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Arc::new(files.game))
                    .with_filter(Targets::new().with_target(GAME_LOG_TARGET, Level::TRACE)),
            ),
        ),
        None => (None, None),
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_filter(filter()))
        .with(driver_log)
        .with(game_log)
        .init();
}

fn run(cli: &Cli, config: &DriverConfig) -> DriverResult<()> {
    info!(
        mud_dir = %config.mud_dir.display(),
        driver_log = %config.driver_log_dir.join(DRIVER_LOG_FILE).display(),
        game_log = %config.game_log_dir.join(GAME_LOG_FILE).display(),
        "configuration loaded"
    );

    let runtime = DriverRuntime::from_config(config);
    if cli.console {
        let stdin = io::BufReader::new(io::stdin());
        let (session, _reader) = console::spawn(stdin, &runtime.connections, Arc::clone(&runtime.signals))?;
        info!(session = %session.id(), "console attached");
    }

    let hooks = GuestHooks::with_heartbeat_limit(cli.heartbeats);
    let mut game = GameLoop::new(runtime, hooks).with_heartbeat_interval(config.heartbeat_interval);
    let stats = game.run()?;
    info!(
        ticks = stats.ticks,
        sessions = stats.sessions_processed,
        heartbeats = stats.heartbeats,
        reclaimed = stats.objects_reclaimed,
        oom = stats.oom_detections,
        "driver stopped"
    );
    Ok(())
}
