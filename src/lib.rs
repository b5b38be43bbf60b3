pub mod cache;
pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod middleware;
pub mod models;
pub mod redis_client;
pub mod services;
pub mod store;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use services::mailer::Mailer;
use store::EventStore;

// Shared state для всего приложения
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EventStore>,
    pub mailer: Mailer,
    pub config: config::Config,
}

impl AppState {
    pub fn new(
        store: Arc<dyn EventStore>,
        config: config::Config,
    ) -> Result<Arc<Self>, services::mailer::MailError> {
        let mailer = Mailer::new(config.email.clone())?;
        Ok(Arc::new(Self {
            store,
            mailer,
            config,
        }))
    }
}

/// Полный роутер приложения: баннер, health-check и API под `/api`.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "EventForm+ API v1.0" }))
        .route("/health", get(|| async { "OK" }))
        .nest("/api", controllers::routes())
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
