//! lemonade-installer - installs or upgrades Lemonade from its published builds
//!
//! All pipeline logic lives in the `installer` crate; this binary only maps
//! flags onto configuration and prints pipeline events.

use anyhow::Context;
use clap::Parser;
use installer::{Channel, ConsoleObserver, Controller, InstallerConfig, LoggingRegistrar, ShortcutOptions};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "lemonade-installer")]
#[command(about = "Install or upgrade Lemonade", long_about = None)]
#[command(version)]
struct Cli {
    /// Update channel to install from (release or nightly)
    #[arg(short, long, default_value = "release")]
    channel: Channel,

    /// Create a desktop shortcut
    #[arg(long)]
    desktop_shortcut: bool,

    /// Create a start menu shortcut
    #[arg(long)]
    start_menu_shortcut: bool,

    /// Installation directory (defaults to <local data dir>/Lemonade)
    #[arg(long)]
    install_dir: Option<PathBuf>,

    /// Where the archive is staged while downloading
    #[arg(long)]
    temp_dir: Option<PathBuf>,

    /// Build target used to pick release assets
    #[arg(long)]
    build_target: Option<String>,

    /// Skip fetching the standalone uninstaller
    #[arg(long)]
    no_uninstaller: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn config(&self) -> anyhow::Result<InstallerConfig> {
        let mut config = InstallerConfig::from_env().context("invalid LEMONADE_* environment")?;

        if let Some(dir) = &self.install_dir {
            config.install_dir = dir.clone();
        }
        if let Some(dir) = &self.temp_dir {
            config.temp_dir = Some(dir.clone());
        }
        if let Some(target) = &self.build_target {
            config.build_target = target.clone();
        }
        if self.no_uninstaller {
            config.uninstaller = None;
        }

        Ok(config)
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "info,installer=debug"
    } else {
        "warn,installer=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenv::dotenv().ok(); // Ignore error if .env not present

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.config()?;
    let controller = Controller::new(config)
        .context("cannot set up installer")?
        .with_registrar(LoggingRegistrar)
        .with_observer(ConsoleObserver::new(cli.verbose));

    controller.select_channel(cli.channel);
    controller.set_shortcuts(ShortcutOptions {
        desktop: cli.desktop_shortcut,
        start_menu: cli.start_menu_shortcut,
    });

    // The observer already printed the outcome
    match controller.start_install().await {
        Ok(_) => Ok(ExitCode::SUCCESS),
        Err(failure) => {
            if cli.verbose {
                eprintln!("{}", failure.cause.detailed_report());
            }
            Ok(ExitCode::FAILURE)
        }
    }
}
