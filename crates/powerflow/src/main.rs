use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use powerflow::hub::Hub;
use powerflow::Config;
use powerflow::Document;
use powerflow::HomeAssistant;
use powerflow::PublishedDocument;
use powerflow::Supervisor;
use powerflow::Synchronizer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Live power-flow display fed by Home Assistant.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "powerflow.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::from_file(&args.config)
        .with_context(|| format!("Could not load config from {}", args.config.display()))?;

    tracing_subscriber::registry()
        .with(config.logging.targets())
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("powerflow starting");
    tracing::info!("Loaded config from: {}", args.config.display());

    let hub = HomeAssistant::try_new(&config.hub.url, &config.hub.token)
        .context("Could not create Home Assistant client")?;
    if let Err(e) = hub.check_api().await {
        tracing::error!("Could not connect to home assistant: {}", e);
        return Err(e).context("Could not connect to home assistant");
    }

    let translator = config.translator()?;
    let (surface, document_rx) = PublishedDocument::new(Document::power_flow());

    #[cfg(feature = "display_api")]
    let api = config.api.clone().map(|api| {
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let handle = tokio::spawn(powerflow::api::serve(
            api.listen,
            api.port,
            document_rx.clone(),
            shutdown_rx,
        ));
        (shutdown_tx, handle)
    });
    #[cfg(not(feature = "display_api"))]
    drop(document_rx);

    let mut supervisor = Supervisor::new(Synchronizer::new(hub, surface, translator));
    tracing::info!("Entering sync loop");
    tracing::info!("Press Ctrl+C to exit");

    supervisor
        .run_until(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("Received shutdown signal"),
                Err(e) => {
                    // Without a signal handler the loop simply runs until killed.
                    tracing::error!("Failed to listen for shutdown signal: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        })
        .await;

    #[cfg(feature = "display_api")]
    if let Some((shutdown_tx, handle)) = api {
        let _ = shutdown_tx.send(());
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("Display API failed: {}", e),
            Err(e) => tracing::error!("Display API task failed: {}", e),
        }
    }

    tracing::info!("powerflow shutdown complete");

    Ok(())
}
