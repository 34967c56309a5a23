//! Server Panel - Game server supervisor for a physical control panel.

use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use server_panel::config::{ConfigLoader, PanelConfig};
use server_panel::console::{drive_from_lines, ConsoleDisplay, ConsoleIndicators};
use server_panel::controller::ScreenController;
use server_panel::display;
use server_panel::events::classify_all;
use server_panel::panel::Panel;
use server_panel::usage::VcgencmdSampler;

#[derive(Parser)]
#[command(
    name = "server-panel",
    about = "Start, stop and watch a game server from a control panel",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Config file to use instead of the default search paths.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the panel until Ctrl-C. Each line on stdin is a button press;
    /// `status` prints the current state.
    Run {
        /// Server install directory.
        #[arg(long)]
        server_dir: Option<PathBuf>,
        /// Screen session name.
        #[arg(long)]
        session: Option<String>,
        /// Server main log file.
        #[arg(long)]
        log: Option<PathBuf>,
        /// Do not announce CPU and GPU usage.
        #[arg(long)]
        no_usage: bool,
    },
    /// Classify every line of an existing log file.
    Classify {
        /// Log file to read.
        file: PathBuf,
        /// Only print lines that carry a lifecycle event.
        #[arg(long)]
        events_only: bool,
    },
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

fn load_config(path: Option<PathBuf>) -> Option<PanelConfig> {
    let loader = path.map_or_else(ConfigLoader::new, ConfigLoader::with_path);
    match loader.load() {
        Ok(config) => Some(config),
        Err(e) => {
            display::print_error(&e.to_string());
            None
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let Some(mut config) = load_config(cli.config) else {
        return ExitCode::FAILURE;
    };

    match cli.command {
        Commands::Run {
            server_dir,
            session,
            log,
            no_usage,
        } => {
            if let Some(dir) = server_dir {
                config.server.install_dir = dir;
            }
            if let Some(session) = session {
                config.server.session_name = session;
            }
            if let Some(log) = log {
                config.log.path = log;
            }
            if no_usage {
                config.usage.enabled = false;
            }
            run_panel(config).await
        }
        Commands::Classify { file, events_only } => classify_file(&file, events_only).await,
    }
}

async fn run_panel(config: PanelConfig) -> ExitCode {
    tracing::info!(
        session = %config.server.session_name,
        executable = %config.server.executable().display(),
        log = %config.log.path.display(),
        "Starting server panel"
    );

    let cancel = CancellationToken::new();
    let controller = Arc::new(ScreenController::from_config(&config.server));
    let sampler = Arc::new(VcgencmdSampler::from_config(&config.usage));
    let indicators = Arc::new(ConsoleIndicators::from_config(&config.display));
    let (handle, task) = Panel::new(config, controller, indicators, Arc::new(ConsoleDisplay::new()))
        .with_sampler(sampler)
        .with_cancellation(cancel.clone())
        .start();

    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, shutting down panel");
            ctrl_c.cancel();
        }
    });

    display::print_notice("Press Enter to start or stop the server");
    drive_from_lines(&handle, spawn_stdin_reader(), &cancel).await;
    cancel.cancel();

    if let Err(e) = task.await {
        tracing::error!(error = %e, "Panel task failed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

/// Forward stdin lines from a plain thread.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (line_tx, line_rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if line_tx.blocking_send(line).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read stdin");
                    return;
                }
            }
        }
        tracing::debug!("Stdin closed");
    });
    line_rx
}

async fn classify_file(path: &std::path::Path, events_only: bool) -> ExitCode {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            display::print_error(&format!("Failed to read {}: {e}", path.display()));
            return ExitCode::FAILURE;
        }
    };

    let text = String::from_utf8_lossy(&bytes);
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let events = classify_all(line);
        if events_only && !events.iter().any(|e| e.is_lifecycle()) {
            continue;
        }
        display::print_classification(index + 1, line, &events);
    }
    ExitCode::SUCCESS
}
