//! Example demonstrating a full install run
//!
//! Installs the latest nightly into a temporary directory and prints every
//! pipeline event as it arrives.
//!
//! Run this example with:
//! ```
//! cargo run --example install_example
//! ```

use installer::{Channel, Controller, EventSender, InstallerConfig, LoggingRegistrar, PipelineEvent, ShortcutOptions};
use tempfile::tempdir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🚀 Starting install example");

    let temp_dir = tempdir()?;
    let config = InstallerConfig::builder()
        .install_dir(temp_dir.path().join("Lemonade"))
        .temp_dir(temp_dir.path().join("downloads"))
        .build();
    println!("📁 Install directory: {}", config.install_dir.display());

    let (events, mut rx) = EventSender::channel();
    let controller = Controller::new(config)?
        .with_registrar(LoggingRegistrar)
        .with_observer(events);
    controller.select_channel(Channel::LatestNightly);
    controller.set_shortcuts(ShortcutOptions {
        desktop: true,
        start_menu: false,
    });

    // Render events on their own task, the way a UI would
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                PipelineEvent::StageChanged(stage) => println!("➡️  {}", stage),
                PipelineEvent::DownloadProgress(percent) => println!("⏬ {}%", percent),
                PipelineEvent::ExtractionProgress(percent) => println!("📦 {}%", percent),
                PipelineEvent::Complete { executable_path } => {
                    println!("✅ Installed {}", executable_path.display())
                }
                PipelineEvent::Failed { stage, cause } => println!("❌ Failed at {}: {}", stage, cause),
            }
        }
    });

    let result = controller.start_install().await;
    drop(controller);
    printer.await?;

    match result {
        Ok(outcome) => println!("📊 {} bytes downloaded from {}", outcome.bytes_downloaded, outcome.source_url),
        Err(failure) => println!("💥 {}", failure),
    }

    Ok(())
}
