//! Server mode
//!
//! This module contains the HTTP server startup logic.
//! It configures and starts the HTTP server with all necessary routes.

use actix_web::{
    App, HttpServer,
    middleware::{Compress, DefaultHeaders},
    web,
};
use anyhow::{Context, Result};
use tracing::warn;

use crate::api::middleware::ApiAuth;
use crate::api::services::{MAX_UPLOAD_SIZE, api_routes};
use crate::config::AuthConfig;
use crate::runtime::lifetime;
use crate::runtime::lifetime::startup::StartupContext;

/// Register shared state and the authenticated API scope
pub fn configure_app(
    cfg: &mut web::ServiceConfig,
    state: &StartupContext,
    api_prefix: &str,
    auth: &AuthConfig,
) {
    cfg.app_data(web::Data::new(state.storage.clone()))
        .app_data(web::Data::new(state.jwt.clone()))
        .app_data(web::Data::new(state.settings.clone()))
        .app_data(web::Data::new(state.registry.clone()))
        .app_data(web::Data::new(state.version.clone()))
        .app_data(web::Data::new(state.status.clone()))
        .app_data(web::Data::new(state.time.clone()))
        .app_data(web::Data::new(state.ca_store.clone()))
        .app_data(web::PayloadConfig::new(MAX_UPLOAD_SIZE))
        .service(
            web::scope(api_prefix)
                .wrap(ApiAuth::new(api_prefix))
                .configure(|scope| api_routes(scope, auth)),
        );
}

/// Run the HTTP server
///
/// This function:
/// 1. Prepares storage, peer façades and services
/// 2. Configures and starts the HTTP server under the API prefix
/// 3. Listens for graceful shutdown signals
///
/// **Note**: Logging system must be initialized before calling this function
pub async fn run_server() -> Result<()> {
    let startup = lifetime::startup::prepare_server_startup()
        .await
        .map_err(|e| {
            tracing::error!("Server startup failed: {}", e);
            e
        })?;

    let config = crate::config::get_config();

    let api_prefix = config.server.api_prefix.trim_end_matches('/').to_string();
    let auth_config = config.auth.clone();

    let cpu_count = config.server.cpu_count.clamp(1, 32);
    warn!("Using {} CPU cores for the server", cpu_count);

    // Clone db reference before storage moves into HttpServer closure
    let db_for_shutdown = startup.storage.db().clone();

    let prefix = api_prefix.clone();
    let server = HttpServer::new(move || {
        App::new()
            .wrap(Compress::default())
            .wrap(
                DefaultHeaders::new()
                    .add(("Cache-Control", "no-cache, no-store, must-revalidate")),
            )
            .configure(|cfg| configure_app(cfg, &startup, &prefix, &auth_config))
    })
    .keep_alive(std::time::Duration::from_secs(30))
    .client_request_timeout(std::time::Duration::from_millis(5000))
    .client_disconnect_timeout(std::time::Duration::from_millis(1000))
    .workers(cpu_count);

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    warn!("Starting server at http://{}{}", bind_address, api_prefix);
    let server = server
        .bind(&bind_address)
        .with_context(|| format!("Failed to bind {}", bind_address))?
        .run();

    // Wait for server or shutdown signal
    tokio::select! {
        res = server => {
            res?;
        }
        _ = lifetime::shutdown::listen_for_shutdown(&db_for_shutdown) => {
            warn!("Graceful shutdown: all tasks completed");
        }
    }

    Ok(())
}
