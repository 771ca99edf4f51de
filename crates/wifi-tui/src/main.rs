//! Wi-Fi network manager binary.
//!
//! Runs the interactive terminal UI by default, or prints one resolved
//! network list with `--headless`.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;
use wifi_tui::{
    App, Backend, Command, Config, Dispatcher, MockBackend, Outcome, execute,
    logging::{self, LogTarget},
    run_tui,
};

#[derive(Parser, Debug)]
#[command(
    name = "wifi-tui",
    about = "Browse and manage Wi-Fi networks from the terminal",
    version
)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the network list once and exit
    #[arg(long)]
    headless: bool,

    /// Start with periodic scanning paused
    #[arg(long)]
    no_scan: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    let target = if cli.headless {
        LogTarget::Stderr
    } else {
        LogTarget::File
    };
    // Held until exit so buffered log lines are flushed
    let _log_guard = logging::init(&config.log, target, cli.verbose)?;

    let backend: Arc<dyn Backend> = Arc::new(MockBackend::demo());
    info!("Using backend {}", backend.name());

    if cli.headless {
        return print_networks(backend.as_ref()).await;
    }

    let (tx, rx) = mpsc::channel(config.ui.channel_capacity);
    let dispatcher = Dispatcher::new(backend, tx.clone());
    let app = App::new(&config, cli.no_scan);

    run_tui(app, dispatcher, rx, tx, &config.ui).await
}

async fn print_networks(backend: &dyn Backend) -> Result<()> {
    let Outcome::NetworkList { result, .. } =
        execute(backend, Command::Refresh { scan: true }).await
    else {
        anyhow::bail!("unexpected outcome for a network refresh");
    };

    for conn in result? {
        let strength = if conn.is_visible {
            format!("{:>3}%", conn.strength())
        } else {
            "   -".to_string()
        };
        println!(
            "{} {:<32} {} {:<8} {}",
            if conn.is_active { "*" } else { " " },
            conn.ssid,
            strength,
            conn.security,
            if conn.is_known { "saved" } else { "" }
        );
    }
    Ok(())
}
