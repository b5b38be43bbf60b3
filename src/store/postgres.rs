use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, Postgres, Transaction};
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use super::{EventStore, StoreError, StoreResult};
use crate::database::Database;
use crate::models::{
    Answers, Event, EventForm, EventSummary, Field, FieldType, FormResponse, NewEvent,
    NewResponse, NewSection, NewUser, Section, Subscription, User,
};
use crate::models::form::UnknownFieldType;

const EVENT_COLUMNS: &str = "e.id, e.user_id, e.title, e.description, e.primary_color, \
     e.accent_color, e.background_image_url, e.logo_url, e.font_family, e.event_date, \
     e.created_at, e.updated_at";

const RESPONSE_COLUMNS: &str =
    "id, event_id, respondent_name, responses, checked_in, checked_in_at, created_at";

// Код ошибки Postgres для нарушения уникальности
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Clone)]
pub struct PgEventStore {
    db: Database,
}

impl PgEventStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

// === Строки БД ===

#[derive(FromRow)]
struct SectionRow {
    id: Uuid,
    event_id: Uuid,
    title: String,
    description: Option<String>,
    order_index: i32,
}

#[derive(FromRow)]
struct FieldRow {
    id: Uuid,
    section_id: Uuid,
    field_type: String,
    label: String,
    placeholder: Option<String>,
    required: bool,
    is_name_field: bool,
    options: Option<String>,
    order_index: i32,
}

impl TryFrom<FieldRow> for Field {
    type Error = StoreError;

    fn try_from(row: FieldRow) -> Result<Self, Self::Error> {
        let field_type: FieldType = row
            .field_type
            .parse()
            .map_err(|e: UnknownFieldType| StoreError::Corrupt(e.to_string()))?;
        // options хранятся как JSON-массив строк в TEXT-колонке
        let options = match row.options.as_deref() {
            None | Some("") => Vec::new(),
            Some(raw) => serde_json::from_str(raw).map_err(|e| {
                StoreError::Corrupt(format!("field {} options: {}", row.id, e))
            })?,
        };
        Ok(Field {
            id: row.id,
            section_id: row.section_id,
            field_type,
            label: row.label,
            placeholder: row.placeholder,
            required: row.required,
            is_name_field: row.is_name_field,
            options,
            order_index: row.order_index,
        })
    }
}

#[derive(FromRow)]
struct ResponseRow {
    id: Uuid,
    event_id: Uuid,
    respondent_name: String,
    responses: Json<Answers>,
    checked_in: bool,
    checked_in_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<ResponseRow> for FormResponse {
    fn from(row: ResponseRow) -> Self {
        FormResponse {
            id: row.id,
            event_id: row.event_id,
            respondent_name: row.respondent_name,
            answers: row.responses.0,
            checked_in: row.checked_in,
            checked_in_at: row.checked_in_at,
            submitted_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct SubscriptionRow {
    id: Uuid,
    user_id: Uuid,
    plan: String,
    status: String,
    current_period_end: Option<DateTime<Utc>>,
}

fn unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .map(|code| code == UNIQUE_VIOLATION)
        .unwrap_or(false)
}

// === Вспомогательные функции создания формы ===

async fn insert_section(
    tx: &mut Transaction<'_, Postgres>,
    event_id: Uuid,
    index: usize,
    section: NewSection,
) -> StoreResult<Section> {
    let section_row: SectionRow = sqlx::query_as(
        "INSERT INTO form_sections (id, event_id, title, description, order_index)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING id, event_id, title, description, order_index",
    )
    .bind(Uuid::new_v4())
    .bind(event_id)
    .bind(&section.title)
    .bind(&section.description)
    .bind(index as i32)
    .fetch_one(&mut **tx)
    .await?;

    let mut fields = Vec::with_capacity(section.fields.len());
    for (field_index, field) in section.fields.into_iter().enumerate() {
        let options = if field.options.is_empty() {
            None
        } else {
            let encoded = serde_json::to_string(&field.options)
                .map_err(|e| StoreError::Corrupt(e.to_string()))?;
            Some(encoded)
        };

        let field_row: FieldRow = sqlx::query_as(
            "INSERT INTO form_fields
                (id, section_id, type, label, placeholder, required, is_name_field,
                 options, order_index)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING id, section_id, type AS field_type, label, placeholder, required,
                       is_name_field, options, order_index",
        )
        .bind(Uuid::new_v4())
        .bind(section_row.id)
        .bind(field.field_type.as_str())
        .bind(&field.label)
        .bind(&field.placeholder)
        .bind(field.required)
        .bind(field.is_name_field)
        .bind(options)
        .bind(field_index as i32)
        .fetch_one(&mut **tx)
        .await?;
        fields.push(Field::try_from(field_row)?);
    }

    Ok(Section {
        id: section_row.id,
        event_id: section_row.event_id,
        title: section_row.title,
        description: section_row.description,
        order_index: section_row.order_index,
        fields,
    })
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (id, email, name, password_hash)
             VALUES ($1, $2, $3, $4)
             RETURNING id, email, name, password_hash, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .fetch_one(&self.db.pool)
        .await
        .map_err(|e| {
            if unique_violation(&e) {
                StoreError::Conflict(format!("email {} already registered", user.email))
            } else {
                StoreError::Database(e)
            }
        })
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, name, password_hash, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.db.pool)
        .await?;
        Ok(user)
    }

    async fn list_events(&self, owner: Uuid) -> StoreResult<Vec<EventSummary>> {
        let events = sqlx::query_as::<_, EventSummary>(&format!(
            "SELECT {EVENT_COLUMNS}, COUNT(r.id) AS responses
             FROM events e
             LEFT JOIN form_responses r ON r.event_id = e.id
             WHERE e.user_id = $1
             GROUP BY e.id
             ORDER BY e.created_at DESC"
        ))
        .bind(owner)
        .fetch_all(&self.db.pool)
        .await?;
        Ok(events)
    }

    async fn create_event(&self, owner: Uuid, event: NewEvent) -> StoreResult<EventForm> {
        // Событие, секции и поля создаются в одной транзакции:
        // при ошибке не остается наполовину созданной формы
        let mut tx = self.db.pool.begin().await?;

        let created: Event = sqlx::query_as(&format!(
            "INSERT INTO events AS e
                (id, user_id, title, description, primary_color, accent_color,
                 background_image_url, logo_url, font_family, event_date)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {EVENT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(owner)
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.primary_color)
        .bind(&event.accent_color)
        .bind(&event.background_image_url)
        .bind(&event.logo_url)
        .bind(&event.font_family)
        .bind(event.event_date)
        .fetch_one(&mut *tx)
        .await?;

        let mut sections = Vec::with_capacity(event.sections.len());
        for (index, section) in event.sections.into_iter().enumerate() {
            sections.push(insert_section(&mut tx, created.id, index, section).await?);
        }

        tx.commit().await?;
        info!("Event {} created with {} sections", created.id, sections.len());

        Ok(EventForm {
            event: created,
            sections,
        })
    }

    async fn get_form(&self, event_id: Uuid) -> StoreResult<Option<EventForm>> {
        let event: Option<Event> = sqlx::query_as(&format!(
            "SELECT {EVENT_COLUMNS} FROM events e WHERE e.id = $1"
        ))
        .bind(event_id)
        .fetch_optional(&self.db.pool)
        .await?;

        let Some(event) = event else {
            return Ok(None);
        };

        let section_rows: Vec<SectionRow> = sqlx::query_as(
            "SELECT id, event_id, title, description, order_index
             FROM form_sections
             WHERE event_id = $1
             ORDER BY order_index",
        )
        .bind(event_id)
        .fetch_all(&self.db.pool)
        .await?;

        let field_rows: Vec<FieldRow> = sqlx::query_as(
            "SELECT f.id, f.section_id, f.type AS field_type, f.label, f.placeholder,
                    f.required, f.is_name_field, f.options, f.order_index
             FROM form_fields f
             JOIN form_sections s ON s.id = f.section_id
             WHERE s.event_id = $1
             ORDER BY s.order_index, f.order_index",
        )
        .bind(event_id)
        .fetch_all(&self.db.pool)
        .await?;

        // Раскладываем поля по секциям, порядок уже задан в ORDER BY
        let mut by_section: HashMap<Uuid, Vec<Field>> = HashMap::new();
        for row in field_rows {
            let field = Field::try_from(row)?;
            by_section.entry(field.section_id).or_default().push(field);
        }

        let sections = section_rows
            .into_iter()
            .map(|row| Section {
                fields: by_section.remove(&row.id).unwrap_or_default(),
                id: row.id,
                event_id: row.event_id,
                title: row.title,
                description: row.description,
                order_index: row.order_index,
            })
            .collect();

        Ok(Some(EventForm { event, sections }))
    }

    async fn delete_event(&self, event_id: Uuid) -> StoreResult<bool> {
        // Секции, поля и ответы удаляются по ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(event_id)
            .execute(&self.db.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_responses(&self, event_id: Uuid) -> StoreResult<Vec<FormResponse>> {
        let rows: Vec<ResponseRow> = sqlx::query_as(&format!(
            "SELECT {RESPONSE_COLUMNS} FROM form_responses
             WHERE event_id = $1
             ORDER BY created_at DESC"
        ))
        .bind(event_id)
        .fetch_all(&self.db.pool)
        .await?;
        Ok(rows.into_iter().map(FormResponse::from).collect())
    }

    async fn get_response(
        &self,
        event_id: Uuid,
        response_id: Uuid,
    ) -> StoreResult<Option<FormResponse>> {
        let row: Option<ResponseRow> = sqlx::query_as(&format!(
            "SELECT {RESPONSE_COLUMNS} FROM form_responses WHERE id = $1 AND event_id = $2"
        ))
        .bind(response_id)
        .bind(event_id)
        .fetch_optional(&self.db.pool)
        .await?;
        Ok(row.map(FormResponse::from))
    }

    async fn insert_response(&self, response: NewResponse) -> StoreResult<FormResponse> {
        let row: ResponseRow = sqlx::query_as(&format!(
            "INSERT INTO form_responses (id, event_id, respondent_name, responses)
             VALUES ($1, $2, $3, $4)
             RETURNING {RESPONSE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(response.event_id)
        .bind(&response.respondent_name)
        .bind(Json(&response.answers))
        .fetch_one(&self.db.pool)
        .await?;
        Ok(row.into())
    }

    async fn delete_response(&self, event_id: Uuid, response_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM form_responses WHERE id = $1 AND event_id = $2")
            .bind(response_id)
            .bind(event_id)
            .execute(&self.db.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn check_in(
        &self,
        event_id: Uuid,
        response_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<FormResponse>> {
        let row: Option<ResponseRow> = sqlx::query_as(&format!(
            "UPDATE form_responses
             SET checked_in = TRUE, checked_in_at = COALESCE(checked_in_at, $3)
             WHERE id = $1 AND event_id = $2
             RETURNING {RESPONSE_COLUMNS}"
        ))
        .bind(response_id)
        .bind(event_id)
        .bind(at)
        .fetch_optional(&self.db.pool)
        .await?;
        Ok(row.map(FormResponse::from))
    }

    async fn get_subscription(&self, user_id: Uuid) -> StoreResult<Option<Subscription>> {
        let row: Option<SubscriptionRow> = sqlx::query_as(
            "SELECT id, user_id, plan, status, current_period_end
             FROM subscriptions
             WHERE user_id = $1
             ORDER BY updated_at DESC
             LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.db.pool)
        .await?;

        row.map(|row| {
            Ok(Subscription {
                id: Some(row.id),
                user_id: row.user_id,
                plan: row.plan.parse().map_err(StoreError::Corrupt)?,
                status: row.status.parse().map_err(StoreError::Corrupt)?,
                current_period_end: row.current_period_end,
            })
        })
        .transpose()
    }
}
