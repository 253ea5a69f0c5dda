mod app;
mod config;
mod error;
mod input;
mod messages;
mod panel;
mod preview;
mod services;
mod steps;
mod transport;
mod view;

use app::App;
use config::Config;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing; stdout belongs to the panel
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting journey recorder");

    // Load configuration
    let config = Config::load()?;
    config.validate()?;

    App::new(config).run().await
}
