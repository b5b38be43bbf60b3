use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::{owned_form, ResponseFilter};
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{EventForm, FormResponse};
use crate::services::stats::{check_in_percentage, CheckInStats};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events/{id}/check-in", get(check_in_list))
        .route("/events/{id}/check-in/{response_id}", post(check_in))
}

#[derive(Debug, Deserialize)]
pub struct CheckInQuery {
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckInList {
    pub event: EventForm,
    pub summary: CheckInStats,
    pub responses: Vec<FormResponse>,
}

// GET /api/events/{id}/check-in?search=
async fn check_in_list(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<Uuid>,
    Query(params): Query<CheckInQuery>,
    user: AuthUser,
) -> AppResult<Json<CheckInList>> {
    let form = owned_form(&state, event_id, &user).await?;
    let all = state.store.list_responses(event_id).await?;

    // Сводка по всем участникам, список с учетом поиска
    let completed = all.iter().filter(|r| r.checked_in).count();
    let summary = CheckInStats {
        total: all.len(),
        completed,
        percentage: check_in_percentage(completed, all.len()),
    };

    let filter = ResponseFilter {
        search: params.search,
        ..Default::default()
    };
    let responses = filter
        .apply(&all, Utc::now(), &state.config.report_offset())
        .into_iter()
        .cloned()
        .collect();

    Ok(Json(CheckInList {
        event: form,
        summary,
        responses,
    }))
}

// POST /api/events/{id}/check-in/{response_id}
async fn check_in(
    State(state): State<Arc<AppState>>,
    Path((event_id, response_id)): Path<(Uuid, Uuid)>,
    user: AuthUser,
) -> AppResult<Json<FormResponse>> {
    owned_form(&state, event_id, &user).await?;

    let response = state
        .store
        .check_in(event_id, response_id, Utc::now())
        .await?
        .ok_or_else(AppError::response_not_found)?;

    tracing::info!("Checked in response {} for event {}", response_id, event_id);
    Ok(Json(response))
}
