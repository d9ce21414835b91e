//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors, but application-level
//! errors should use `kernel::error::AppError`.

mod settings;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderValue, Method, header},
    routing::get,
};
use chrono::Utc;
use identity::domain::notifier::Notifier;
use identity::domain::repository::EphemeralTokenRepository;
use identity::{
    GoogleIdTokenVerifier, HttpRelayNotifier, IdentityAppState, LogNotifier, PgIdentityStore,
    identity_router,
};
use serde_json::{Value, json};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::settings::Settings;
use kernel::error::app_error::AppResult;

const TOKEN_CLEANUP_INTERVAL: Duration = Duration::from_secs(10 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&settings.database_url)
        .await?;

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("../../../database/migrations")
        .run(&pool)
        .await?;

    tracing::info!("Migrations completed");

    let store = PgIdentityStore::new(pool.clone());

    // Startup cleanup; a failure here should not prevent server startup
    cleanup_expired_tokens(&store).await;
    spawn_token_cleanup(store.clone());

    let notifier: Arc<dyn Notifier> = match settings.mail_relay {
        Some(relay) => Arc::new(HttpRelayNotifier::new(relay.url, relay.token)?),
        None => {
            tracing::warn!("MAIL_RELAY_URL not set, outgoing email will only be logged");
            Arc::new(LogNotifier)
        }
    };

    if settings.google.client_id.is_empty() {
        tracing::warn!("GOOGLE_CLIENT_ID not set, Google sign-in is disabled");
    }
    let verifier = GoogleIdTokenVerifier::new(settings.google)?;

    // CORS: the web client sends the refresh cookie, so credentials are allowed
    let client_origin: HeaderValue = settings
        .identity
        .client_url
        .trim_end_matches('/')
        .parse()?;

    let cors = CorsLayer::new()
        .allow_origin(client_origin)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]))
        .allow_credentials(true);

    let state = IdentityAppState::new(store, verifier, notifier, settings.identity);

    // Build router
    let app = Router::new()
        .route("/health", get(health))
        .with_state(pool)
        .merge(identity_router(state))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    tracing::info!("Listening on {}", settings.bind_addr);

    let listener = TcpListener::bind(settings.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// GET /health
async fn health(State(pool): State<PgPool>) -> AppResult<Json<Value>> {
    sqlx::query("SELECT 1").execute(&pool).await?;
    Ok(Json(json!({ "status": "ok" })))
}

async fn cleanup_expired_tokens(store: &PgIdentityStore) {
    match store.cleanup_expired(Utc::now()).await {
        Ok(deleted) => {
            tracing::info!(tokens_deleted = deleted, "Expired token cleanup completed");
        }
        Err(e) => {
            tracing::warn!(error = %e, "Expired token cleanup failed, continuing anyway");
        }
    }
}

fn spawn_token_cleanup(store: PgIdentityStore) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TOKEN_CLEANUP_INTERVAL);
        // The first tick fires immediately; startup already cleaned up
        interval.tick().await;
        loop {
            interval.tick().await;
            cleanup_expired_tokens(&store).await;
        }
    });
}
