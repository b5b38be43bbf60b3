use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::{load_form, owned_form, ResponseFilter};
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{FormResponse, NewResponse};
use crate::services::formatting::{format_response_detail, ResponseDetail};
use crate::services::respondent::detect_respondent_name;
use crate::services::validation::validate_submission;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/events/{id}/responses",
            get(list_responses).post(submit_response),
        )
        .route(
            "/events/{id}/responses/{response_id}",
            get(get_response).delete(delete_response),
        )
}

// POST /api/events/{id}/responses
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    #[serde(rename = "formData", default)]
    pub form_data: HashMap<String, Value>,
}

async fn submit_response(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<Uuid>,
    Json(req): Json<SubmitRequest>,
) -> AppResult<impl IntoResponse> {
    let form = load_form(&state, event_id).await?;

    let answers = validate_submission(&form, &req.form_data).map_err(|errors| {
        tracing::debug!("Rejected submission for event {}: {} errors", event_id, errors.len());
        AppError::Validation(errors)
    })?;
    let respondent_name = detect_respondent_name(&form, &answers);

    let response = state
        .store
        .insert_response(NewResponse {
            event_id,
            respondent_name,
            answers,
        })
        .await?;

    tracing::info!("New response {} for event {}", response.id, event_id);
    Ok((StatusCode::CREATED, Json(response)))
}

// GET /api/events/{id}/responses?search=&period=
async fn list_responses(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<Uuid>,
    Query(filter): Query<ResponseFilter>,
    user: AuthUser,
) -> AppResult<Json<Vec<FormResponse>>> {
    owned_form(&state, event_id, &user).await?;

    let responses = state.store.list_responses(event_id).await?;
    let filtered = filter
        .apply(&responses, Utc::now(), &state.config.report_offset())
        .into_iter()
        .cloned()
        .collect();
    Ok(Json(filtered))
}

// GET /api/events/{id}/responses/{response_id}
async fn get_response(
    State(state): State<Arc<AppState>>,
    Path((event_id, response_id)): Path<(Uuid, Uuid)>,
    user: AuthUser,
) -> AppResult<Json<ResponseDetail>> {
    let form = owned_form(&state, event_id, &user).await?;

    let response = state
        .store
        .get_response(event_id, response_id)
        .await?
        .ok_or_else(AppError::response_not_found)?;

    Ok(Json(format_response_detail(
        &form,
        &response,
        &state.config.report_offset(),
    )))
}

// DELETE /api/events/{id}/responses/{response_id}
async fn delete_response(
    State(state): State<Arc<AppState>>,
    Path((event_id, response_id)): Path<(Uuid, Uuid)>,
    user: AuthUser,
) -> AppResult<StatusCode> {
    owned_form(&state, event_id, &user).await?;

    if !state.store.delete_response(event_id, response_id).await? {
        return Err(AppError::response_not_found());
    }
    tracing::info!("Deleted response {} of event {}", response_id, event_id);
    Ok(StatusCode::NO_CONTENT)
}
