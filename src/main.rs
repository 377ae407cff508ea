use std::{net::SocketAddr, process::ExitCode, sync::Arc};

use recipe_api::{
    config::Config,
    jwt::SessionKeys,
    media::MediaStorage,
    memory::MemoryStore,
    postgres::PgStore,
    routes::{routes, AppState},
    store::Store,
};
use tracing_subscriber::{fmt, EnvFilter};
use warp::Filter;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Could not read .env: {e}");
        }
    }

    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => Arc::new(PgStore::connect(url, config.max_connections).await?),
        None => {
            log::warn!("DATABASE_URL not set, data is kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let keys = SessionKeys::new(config.jwt_secret.as_bytes(), config.session_hours)?;
    tokio::fs::create_dir_all(&config.media_root).await?;
    let media = MediaStorage::new(config.media_root.clone());

    let api = routes(AppState::new(store, keys, media)).with(warp::log("recipe_api"));

    let address = SocketAddr::from(([0, 0, 0, 0], config.port));
    let (bound, server) = warp::serve(api).bind_with_graceful_shutdown(address, async {
        tokio::signal::ctrl_c().await.ok();
        log::info!("Shutting down");
    });

    log::info!("Server running on {bound}");
    server.await;

    Ok(())
}
