pub mod auth;
pub mod check_in;
pub mod dashboard;
pub mod events;
pub mod export;
pub mod responses;
pub mod subscription;
pub mod support;

use axum::Router;
use chrono::{DateTime, FixedOffset, Utc};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{EventForm, FormResponse};
use crate::services::stats::Period;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(auth::routes())
        .merge(events::routes())
        .merge(responses::routes())
        .merge(check_in::routes())
        .merge(dashboard::routes())
        .merge(export::routes())
        .merge(subscription::routes())
        .merge(support::routes())
}

/* ---------- helpers ---------- */

pub(crate) async fn load_form(state: &AppState, event_id: Uuid) -> AppResult<EventForm> {
    state
        .store
        .get_form(event_id)
        .await?
        .ok_or_else(AppError::event_not_found)
}

// Схема события, доступная только владельцу
pub(crate) async fn owned_form(
    state: &AppState,
    event_id: Uuid,
    user: &AuthUser,
) -> AppResult<EventForm> {
    let form = load_form(state, event_id).await?;
    if form.event.user_id != user.user_id {
        tracing::warn!(
            "User {} tried to access event {} owned by {}",
            user.user_id,
            event_id,
            form.event.user_id
        );
        return Err(AppError::Forbidden);
    }
    Ok(form)
}

/// Фильтры списка ответов: подстрока имени и период.
#[derive(Debug, Default, Deserialize)]
pub struct ResponseFilter {
    pub search: Option<String>,
    #[serde(default)]
    pub period: Period,
}

impl ResponseFilter {
    pub fn apply<'a>(
        &self,
        responses: &'a [FormResponse],
        now: DateTime<Utc>,
        offset: &FixedOffset,
    ) -> Vec<&'a FormResponse> {
        let needle = self
            .search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        responses
            .iter()
            .filter(|r| self.period.contains(r.submitted_at, now, offset))
            .filter(|r| match &needle {
                Some(needle) => r.respondent_name.to_lowercase().contains(needle),
                None => true,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::collections::BTreeMap;

    fn response(name: &str, submitted_at: DateTime<Utc>) -> FormResponse {
        FormResponse {
            id: Uuid::new_v4(),
            event_id: Uuid::nil(),
            respondent_name: name.to_string(),
            answers: BTreeMap::new(),
            checked_in: false,
            checked_in_at: None,
            submitted_at,
        }
    }

    #[test]
    fn search_and_period_combine() {
        let now = Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap();
        let offset = FixedOffset::east_opt(0).unwrap();
        let responses = vec![
            response("Ana Souza", now - Duration::hours(1)),
            response("Bruno", now - Duration::hours(2)),
            response("Mariana", now - Duration::days(20)),
        ];

        let filter = ResponseFilter {
            search: Some(" ANA ".to_string()),
            period: Period::LastDays(7),
        };
        let names: Vec<&str> = filter
            .apply(&responses, now, &offset)
            .iter()
            .map(|r| r.respondent_name.as_str())
            .collect();
        assert_eq!(names, vec!["Ana Souza"]);

        assert_eq!(ResponseFilter::default().apply(&responses, now, &offset).len(), 3);
    }
}
