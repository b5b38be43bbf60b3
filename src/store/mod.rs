//! store
//!
//! Слой доступа к данным. Обработчики работают только с трейтом [`EventStore`],
//! конкретная реализация передается через `AppState`:
//! - [`PgEventStore`]: Postgres через sqlx, основная реализация;
//! - [`InMemoryEventStore`]: хранилище в памяти для локального запуска и тестов;
//! - [`CachedEventStore`]: обертка, кеширующая схемы форм в Redis.

pub mod cached;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    EventForm, EventSummary, FormResponse, NewEvent, NewResponse, NewUser, Subscription, User,
};

pub use cached::CachedEventStore;
pub use memory::InMemoryEventStore;
pub use postgres::PgEventStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait EventStore: Send + Sync {
    // --- Пользователи ---
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    // --- События и схема формы ---
    async fn list_events(&self, owner: Uuid) -> StoreResult<Vec<EventSummary>>;
    async fn create_event(&self, owner: Uuid, event: NewEvent) -> StoreResult<EventForm>;
    async fn get_form(&self, event_id: Uuid) -> StoreResult<Option<EventForm>>;
    /// Удаляет событие каскадно вместе с секциями, полями и ответами.
    async fn delete_event(&self, event_id: Uuid) -> StoreResult<bool>;

    // --- Ответы и check-in ---
    async fn list_responses(&self, event_id: Uuid) -> StoreResult<Vec<FormResponse>>;
    async fn get_response(
        &self,
        event_id: Uuid,
        response_id: Uuid,
    ) -> StoreResult<Option<FormResponse>>;
    async fn insert_response(&self, response: NewResponse) -> StoreResult<FormResponse>;
    async fn delete_response(&self, event_id: Uuid, response_id: Uuid) -> StoreResult<bool>;
    /// Отмечает приход участника. Повторный check-in сохраняет первое время.
    async fn check_in(
        &self,
        event_id: Uuid,
        response_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<FormResponse>>;

    // --- Подписки ---
    async fn get_subscription(&self, user_id: Uuid) -> StoreResult<Option<Subscription>>;
}
