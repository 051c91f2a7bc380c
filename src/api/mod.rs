//! Claim HTTP API
//!
//! | Method/Path | Mode |
//! |---|---|
//! | `POST /claim/build` | preview, no side effects |
//! | `POST /claim/submit` | single submission against an existing encounter |
//! | `POST /claim/bundle/submit` | transaction creating the encounter (and parties) |
//! | `GET /claim` | local records, newest first |
//! | `GET /claim/patient/:id` | local records of one patient |
//! | `GET /claim/stats` | aggregates over local records |
//! | `GET /health` | liveness |

pub mod error;
pub mod handlers;

pub use error::{ApiError, ApiErrorBody};

use crate::config::ServerConfig;
use crate::core::ClaimOrchestrator;
use crate::domain::{ClaimwrightError, Result};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared state of every handler
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ClaimOrchestrator>,
}

impl AppState {
    pub fn new(orchestrator: Arc<ClaimOrchestrator>) -> Self {
        Self { orchestrator }
    }
}

/// Builds the router without binding it
pub fn router(state: AppState, cors_permissive: bool) -> Router {
    let app = Router::new()
        .route("/health", get(handlers::health))
        .route("/claim", get(handlers::list_claims))
        .route("/claim/build", post(handlers::build_claim))
        .route("/claim/submit", post(handlers::submit_claim))
        .route("/claim/bundle/submit", post(handlers::submit_bundle))
        .route("/claim/stats", get(handlers::claim_stats))
        .route("/claim/patient/:id", get(handlers::list_patient_claims))
        .layer(TraceLayer::new_for_http());

    let app = if cors_permissive {
        app.layer(CorsLayer::permissive())
    } else {
        app
    };

    app.with_state(state)
}

/// Serves the API until `shutdown` turns `true`
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(
    config: &ServerConfig,
    state: AppState,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .map_err(|e| {
            ClaimwrightError::Io(format!("Failed to bind {}: {e}", config.bind_address))
        })?;

    tracing::info!(address = %config.bind_address, "Claim API listening");

    axum::serve(listener, router(state, config.cors_permissive))
        .with_graceful_shutdown(async move {
            while !*shutdown.borrow_and_update() {
                if shutdown.changed().await.is_err() {
                    break;
                }
            }
            tracing::info!("Claim API shutting down");
        })
        .await?;

    Ok(())
}
