//! The relay server: one `POST /api/chat` route that turns a complete
//! backend completion into a paced byte stream, plus a health probe.

pub mod backend;
pub mod pacer;
pub mod relay;

use std::error::Error;
use std::sync::Arc;

use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};

use crate::server::backend::{HfGenerator, TextGenerator};

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:3000";

#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<dyn TextGenerator>,
}

#[derive(serde::Serialize)]
struct Health {
    status: String,
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "trickle relay is ready".to_string(),
    })
}

pub fn router(state: AppState) -> Router {
    // Browser clients may sit on another origin than the relay.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(relay::relay_chat))
        .layer(cors)
        .with_state(state)
}

pub async fn run(listen: &str) -> Result<(), Box<dyn Error>> {
    let state = AppState {
        generator: Arc::new(HfGenerator::new()),
    };

    let listener = tokio::net::TcpListener::bind(listen).await?;
    tracing::info!("trickle relay listening on http://{listen}");

    axum::serve(listener, router(state)).await?;
    Ok(())
}
