mod analytics;
mod coordinator;
mod domain;
mod error;
mod middleware;
mod services;
mod state;
mod store;
mod web;

use crate::state::SharedState;
use crate::store::{seed, Store};
use axum::Router;
use base64::{engine::general_purpose, Engine as _};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let session_key = match std::env::var("SESSION_KEY") {
        Ok(b64) => general_purpose::STANDARD
            .decode(b64)
            .map_err(|e| anyhow::anyhow!("SESSION_KEY must be base64: {e}"))?,
        Err(_) => {
            // Sessions will not survive a restart without a configured key.
            tracing::warn!("SESSION_KEY not set, generating an ephemeral key");
            let mut key = vec![0u8; 32];
            rand_core::RngCore::fill_bytes(&mut rand_core::OsRng, &mut key);
            key
        }
    };

    let store = Arc::new(Store::new());
    seed::seed_all(&store).await?;

    let shared: SharedState = Arc::new(state::AppState::new(store, session_key));

    // Hourly sweep of stale rate-limit buckets.
    let login_limiter = shared.login_limiter.clone();
    let submit_limiter = shared.submit_limiter.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(std::time::Duration::from_secs(3600));
        loop {
            tick.tick().await;
            login_limiter.cleanup().await;
            submit_limiter.cleanup().await;
        }
    });

    let app = Router::new()
        .merge(web::routes(shared.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| {
        let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
        format!("0.0.0.0:{}", port)
    });
    tracing::info!("Listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;
    Ok(())
}
