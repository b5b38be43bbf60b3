use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::form::NewSection;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub primary_color: Option<String>,
    pub accent_color: Option<String>,
    pub background_image_url: Option<String>,
    pub logo_url: Option<String>,
    pub font_family: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Событие в списке владельца вместе с количеством ответов.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EventSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub event: Event,
    pub responses: i64,
}

// Тело запроса на создание события вместе с секциями и полями.
// Порядок секций и полей берется из позиции в массиве.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub title: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(length(max = 32))]
    pub primary_color: Option<String>,
    #[validate(length(max = 32))]
    pub accent_color: Option<String>,
    #[validate(url)]
    pub background_image_url: Option<String>,
    #[validate(url)]
    pub logo_url: Option<String>,
    pub font_family: Option<String>,
    pub event_date: Option<NaiveDate>,
    #[serde(default)]
    #[validate(nested)]
    pub sections: Vec<NewSection>,
}
