//! FloraCat recommendation API server

mod app;

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use floracat_core::config::FloraCatConfig;
use floracat_db::CatalogStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.logging.level.clone())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(errors) = config.validate() {
        for e in &errors {
            error!("configuration error: {}", e);
        }
        anyhow::bail!("invalid configuration");
    }

    info!("starting floracat-api...");

    let store = CatalogStore::connect(&config.database).await?;
    if config.database.auto_migrate {
        store.migrate().await?;
    }

    let bind_addr: SocketAddr = format!("{}:{}", config.server.bind_address, config.server.port).parse()?;
    let state = app::AppState::new(store, config.clone());
    let router = app::build_router(state);

    let listener = TcpListener::bind(bind_addr).await?;
    info!("floracat-api listening on http://{}", bind_addr);

    let serve = axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>());
    tokio::select! {
        result = serve => {
            if let Err(e) = result {
                error!("server error: {}", e);
            }
        }
        _ = signal::ctrl_c() => {
            info!("received shutdown signal, stopping server...");
        }
    }

    info!("floracat-api stopped");
    Ok(())
}

fn load_config() -> anyhow::Result<FloraCatConfig> {
    if std::path::Path::new("config/floracat.toml").exists() {
        Ok(FloraCatConfig::from_file("config/floracat.toml").map_err(|e| anyhow::anyhow!(e.to_string()))?)
    } else if std::path::Path::new("floracat.toml").exists() {
        Ok(FloraCatConfig::from_file("floracat.toml").map_err(|e| anyhow::anyhow!(e.to_string()))?)
    } else {
        warn!("no configuration file found, falling back to environment and defaults");
        Ok(FloraCatConfig::from_env().map_err(|e| anyhow::anyhow!(e.to_string()))?)
    }
}
