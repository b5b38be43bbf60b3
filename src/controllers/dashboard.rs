use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use super::owned_form;
use crate::error::AppResult;
use crate::middleware::AuthUser;
use crate::services::stats::{compute_stats, DashboardStats, Period};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/events/{id}/dashboard", get(dashboard))
}

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    #[serde(default)]
    pub period: Period,
}

// GET /api/events/{id}/dashboard?period=
async fn dashboard(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<Uuid>,
    Query(params): Query<DashboardQuery>,
    user: AuthUser,
) -> AppResult<Json<DashboardStats>> {
    owned_form(&state, event_id, &user).await?;

    let responses = state.store.list_responses(event_id).await?;
    let stats = compute_stats(
        &responses,
        params.period,
        Utc::now(),
        &state.config.report_offset(),
    );
    tracing::debug!(
        "Dashboard for event {} ({}): {} responses",
        event_id,
        params.period,
        stats.total_responses
    );
    Ok(Json(stats))
}
