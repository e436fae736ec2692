mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing::info;

use bazaar_api::AppState;
use bazaar_api::images::ImageStore;
use bazaar_auth::AuthConfig;
use bazaar_db::Database;
use bazaar_gateway::Dispatcher;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bazaar=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database and image storage
    let db = Arc::new(Database::open(&config.db_path)?);
    let images = Arc::new(ImageStore::new(config.upload_dir.clone()).await?);

    let state = AppState {
        db,
        dispatcher: Dispatcher::new(config.chat_scope),
        images,
        auth: AuthConfig {
            session_ttl: chrono::Duration::hours(config.session_ttl_hours),
        },
        cookie_key: config.cookie_key.clone(),
    };

    let app = bazaar_api::router(state).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Bazaar listening on {}", addr);
    info!(
        "Sessions last {} hours, chat scope {:?}",
        config.session_ttl_hours, config.chat_scope
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let Ok(mut sigterm) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        else {
            ctrl_c.await.ok();
            info!("Received Ctrl+C, shutting down...");
            return;
        };
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
