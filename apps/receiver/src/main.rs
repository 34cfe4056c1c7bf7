//! loranode receiver entry point.

mod app;
mod config;

use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Logs go to stderr: stdout may be the link itself.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "starting loranode receiver"
    );

    let path = std::env::args_os().nth(1).map(std::path::PathBuf::from);
    let config = config::Config::load(path)?;
    tracing::info!(
        mode = ?config.mode,
        device = %config.link.device,
        root = %config.storage.root,
        "configuration loaded"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(config))?;

    tracing::info!("receiver shut down cleanly");
    Ok(())
}
