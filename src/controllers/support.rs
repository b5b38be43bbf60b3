use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::owned_form;
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::services::mailer::TransactionalEmail;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/support", post(send_support))
        .route("/emails", post(send_email))
}

// POST /api/support
// Адресат фиксирован в конфиге, лишние поля (например `to`) отклоняются
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SupportRequest {
    #[validate(length(min = 1, max = 200, message = "subject is required"))]
    pub subject: String,
    #[validate(length(min = 1, max = 10000, message = "message is required"))]
    pub message: String,
}

async fn send_support(
    State(state): State<Arc<AppState>>,
    user: Option<AuthUser>,
    Json(req): Json<SupportRequest>,
) -> AppResult<StatusCode> {
    req.validate()?;

    state
        .mailer
        .send_support(
            user.as_ref().map(|u| u.email.as_str()),
            &req.subject,
            &req.message,
        )
        .await?;
    Ok(StatusCode::ACCEPTED)
}

// POST /api/emails
// Письмо уходит только на адрес вошедшего пользователя
#[derive(Debug, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum EmailRequest {
    Welcome,
    EventReminder {
        #[serde(rename = "eventId")]
        event_id: Uuid,
    },
}

async fn send_email(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<EmailRequest>,
) -> AppResult<StatusCode> {
    let account = state
        .store
        .find_user_by_email(&user.email)
        .await?
        .ok_or_else(|| AppError::Unauthorized("account no longer exists".to_string()))?;

    let email = match req {
        EmailRequest::Welcome => TransactionalEmail::Welcome { name: account.name },
        EmailRequest::EventReminder { event_id } => {
            let form = owned_form(&state, event_id, &user).await?;
            TransactionalEmail::EventReminder {
                name: account.name,
                event_title: form.event.title,
            }
        }
    };

    state
        .mailer
        .send_transactional(&user.email, email, &state.config.app.site_url)
        .await?;
    Ok(StatusCode::ACCEPTED)
}
