//! Server mode

use actix_web::{
    App, HttpServer,
    middleware::{Compress, DefaultHeaders},
    web,
};
use anyhow::{Context, Result};
use tracing::warn;

use crate::api::{AppState, SessionAuth, api_v1_routes, health_routes};
use crate::config::StaticConfig;
use crate::runtime::lifetime;

/// Run the HTTP server until it stops or Ctrl+C arrives.
///
/// Logging must be initialised before calling this.
pub async fn run_server(config: &StaticConfig) -> Result<()> {
    let startup = lifetime::startup::prepare_server_startup(config)
        .await
        .inspect_err(|e| tracing::error!("Server startup failed: {:#}", e))?;

    let db_for_shutdown = startup.storage.get_db().clone();
    let state = web::Data::new(AppState::new(startup.storage, config, startup.geoip));

    let cpu_count = config.server.cpu_count.clamp(1, 32);
    warn!("Using {} CPU cores for the server", cpu_count);

    let bind_address = format!("{}:{}", config.server.host, config.server.port);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Compress::default())
            .wrap(SessionAuth::new(state.jwt.clone(), state.cookie_name.clone()))
            .wrap(DefaultHeaders::new().add(("Cache-Control", "no-store")))
            .app_data(state.clone())
            .app_data(web::JsonConfig::default().limit(64 * 1024))
            .service(health_routes())
            .service(api_v1_routes(&state))
    })
    .keep_alive(std::time::Duration::from_secs(30))
    .client_request_timeout(std::time::Duration::from_millis(5000))
    .workers(cpu_count)
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {}", bind_address))?;

    warn!("Starting server at http://{}", bind_address);
    let server = server.run();

    tokio::select! {
        res = server => {
            res.context("HTTP server failed")?;
        }
        _ = lifetime::shutdown::listen_for_shutdown(db_for_shutdown) => {
            warn!("Graceful shutdown complete");
        }
    }

    Ok(())
}
