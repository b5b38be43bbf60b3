use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::load_form;
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{EventForm, EventSummary, FormResponse, NewEvent};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route("/events/{id}", get(get_event).delete(delete_event))
}

// GET /api/events
async fn list_events(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<Json<Vec<EventSummary>>> {
    let events = state.store.list_events(user.user_id).await?;
    Ok(Json(events))
}

// POST /api/events
async fn create_event(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<NewEvent>,
) -> AppResult<impl IntoResponse> {
    req.validate()?;

    let form = state.store.create_event(user.user_id, req).await?;
    tracing::info!(
        "User {} created event {} with {} fields",
        user.user_id,
        form.event.id,
        form.field_count()
    );
    Ok((StatusCode::CREATED, Json(form)))
}

// GET /api/events/{id}?includeResponses=true
#[derive(Debug, Deserialize)]
pub struct EventQuery {
    #[serde(rename = "includeResponses", default)]
    pub include_responses: bool,
}

#[derive(Debug, Serialize)]
pub struct EventView {
    #[serde(flatten)]
    pub form: EventForm,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responses: Option<Vec<FormResponse>>,
}

async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<Uuid>,
    Query(params): Query<EventQuery>,
    user: Option<AuthUser>,
) -> AppResult<Json<EventView>> {
    let form = load_form(&state, event_id).await?;

    // Схема публичная, ответы видит только владелец
    let responses = if params.include_responses {
        match user {
            Some(user) if user.user_id == form.event.user_id => {
                Some(state.store.list_responses(event_id).await?)
            }
            _ => return Err(AppError::Forbidden),
        }
    } else {
        None
    };

    Ok(Json(EventView { form, responses }))
}

// DELETE /api/events/{id}
async fn delete_event(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<Uuid>,
    user: AuthUser,
) -> AppResult<StatusCode> {
    super::owned_form(&state, event_id, &user).await?;

    if !state.store.delete_event(event_id).await? {
        return Err(AppError::event_not_found());
    }
    tracing::info!("User {} deleted event {}", user.user_id, event_id);
    Ok(StatusCode::NO_CONTENT)
}
