use axum::{extract::State, routing::get, Json, Router};
use std::sync::Arc;

use crate::error::AppResult;
use crate::middleware::AuthUser;
use crate::models::Subscription;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/subscription", get(get_subscription))
}

// GET /api/subscription
async fn get_subscription(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<Json<Subscription>> {
    let subscription = state
        .store
        .get_subscription(user.user_id)
        .await?
        .unwrap_or_else(|| Subscription::free(user.user_id));
    Ok(Json(subscription))
}
