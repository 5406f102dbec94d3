use std::net::SocketAddr;

use anyhow::Context;
use axum::{Router, middleware, routing::get};
use cbx_api::{ApiConfig, ApiState};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from `.env` and the environment
    dotenvy::dotenv().ok();
    let config = ApiConfig::from_env().context("invalid configuration")?;

    cbx_api::tracing::init_tracing(&config.env);

    let pool = cbx_db::create_pool(&config.database_url, config.db_max_connections).await?;
    cbx_db::ensure_db_and_migrate(&config.database_url, &pool).await?;
    tracing::info!("database ready");

    let metrics_handle = cbx_api::metrics::init_metrics()?;

    let state = ApiState::new(&config, pool);

    let cors = cbx_api::middleware::cors::create_cors_layer(config.parsed_allowed_origins());

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    // Metrics are served without the API state
    let metrics_app = Router::new()
        .route("/metrics", get(cbx_api::metrics::metrics_handler))
        .with_state(metrics_handle);

    let app = cbx_api::router::router()
        .with_state(state)
        .merge(metrics_app)
        .layer(cors)
        .layer(trace_layer)
        .layer(middleware::from_fn(cbx_api::metrics::track_metrics))
        .layer(middleware::from_fn(
            cbx_api::middleware::request_id::request_id_middleware,
        ));
    let app = cbx_api::middleware::security_headers::apply_security_headers(app, config.env);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    tracing::info!(%address, environment = ?config.env, "server listening");

    // Rate limiting keys on the peer address when no forwarding header is present
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
