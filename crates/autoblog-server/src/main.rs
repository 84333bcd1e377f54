use anyhow::{Context, Result};
use autoblog_config::Config;
use autoblog_server::{AppState, InteractionStore, app};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("Config path: {}", Config::config_path().display());
    let config = Config::load_or_default()?;

    let store = match &config.server.data_path {
        Some(data_path) => InteractionStore::open(data_path).await?,
        None => {
            log::warn!("No data_path configured, highlights are kept in memory only");
            InteractionStore::in_memory()
        }
    };

    let listener = tokio::net::TcpListener::bind(&config.server.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.listen_addr))?;
    log::info!("autoblog-server listening on {}", listener.local_addr()?);

    axum::serve(listener, app(AppState::new(store))).await?;
    Ok(())
}
