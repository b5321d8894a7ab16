mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use mediaviewer_api::homeserver::{HomeserverResolver, ResolverConfig, WellKnownCache};
use mediaviewer_api::routes;
use mediaviewer_api::state::{AppState, AppStateInner};
use mediaviewer_db::Database;
use mediaviewer_db::shortcut_id::ShortcutMinter;

use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "mediaviewer=debug,mediaviewer_api=debug,mediaviewer_db=info,tower_http=debug"
                    .into()
            }),
        )
        .init();

    let config = Config::from_env()?;

    // Schema is migrated here; refuse to start on failure
    let db = Database::open(&config.database_path).with_context(|| {
        format!(
            "failed to open database at {}",
            config.database_path.display()
        )
    })?;

    let minter = match config.node_id {
        Some(id) => ShortcutMinter::new(id.into())?,
        None => ShortcutMinter::random(),
    };

    let resolver = HomeserverResolver::new(
        ResolverConfig {
            default_url: config.default_homeserver_url.clone(),
            force_default: config.force_default_homeserver,
            ..Default::default()
        },
        Arc::new(WellKnownCache::new()),
    )?;

    if !config.frontend_dir.join("index.html").is_file() {
        warn!(
            "No index.html in {}, the viewer page will not be served",
            config.frontend_dir.display()
        );
    }

    let state: AppState = Arc::new(AppStateInner {
        db,
        minter,
        resolver,
        trust_forward_headers: config.trust_forward_headers,
        frontend_dir: config.frontend_dir.clone(),
    });

    let app = routes::router(state);

    info!("Media viewer listening on {}", config.listen_address);
    let listener = tokio::net::TcpListener::bind(config.listen_address).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Media viewer stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
