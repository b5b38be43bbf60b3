use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use super::{EventStore, StoreResult};
use crate::cache::FormCache;
use crate::models::{
    EventForm, EventSummary, FormResponse, NewEvent, NewResponse, NewUser, Subscription, User,
};

/// Обертка над хранилищем, читающая схемы форм через Redis.
///
/// Ошибки Redis не ломают запрос: логируем и идем в основное хранилище.
pub struct CachedEventStore<S> {
    inner: S,
    cache: FormCache,
}

impl<S: EventStore> CachedEventStore<S> {
    pub fn new(inner: S, cache: FormCache) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl<S: EventStore> EventStore for CachedEventStore<S> {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        self.inner.create_user(user).await
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.inner.find_user_by_email(email).await
    }

    async fn list_events(&self, owner: Uuid) -> StoreResult<Vec<EventSummary>> {
        self.inner.list_events(owner).await
    }

    async fn create_event(&self, owner: Uuid, event: NewEvent) -> StoreResult<EventForm> {
        let form = self.inner.create_event(owner, event).await?;
        if let Err(e) = self.cache.save_form(&form).await {
            warn!("Failed to cache form {}: {:?}", form.event.id, e);
        }
        Ok(form)
    }

    async fn get_form(&self, event_id: Uuid) -> StoreResult<Option<EventForm>> {
        // Сначала пробуем кеш
        match self.cache.get_form(event_id).await {
            Ok(Some(form)) => return Ok(Some(form)),
            Ok(None) => {}
            Err(e) => warn!("Form cache read failed for {}: {:?}", event_id, e),
        }

        // Cache miss: идем в базу и кладем результат в кеш
        let form = self.inner.get_form(event_id).await?;
        if let Some(form) = &form {
            if let Err(e) = self.cache.save_form(form).await {
                warn!("Failed to cache form {}: {:?}", event_id, e);
            }
        }
        Ok(form)
    }

    async fn delete_event(&self, event_id: Uuid) -> StoreResult<bool> {
        let deleted = self.inner.delete_event(event_id).await?;
        if let Err(e) = self.cache.invalidate_form(event_id).await {
            warn!("Failed to invalidate form cache for {}: {:?}", event_id, e);
        }
        Ok(deleted)
    }

    async fn list_responses(&self, event_id: Uuid) -> StoreResult<Vec<FormResponse>> {
        self.inner.list_responses(event_id).await
    }

    async fn get_response(
        &self,
        event_id: Uuid,
        response_id: Uuid,
    ) -> StoreResult<Option<FormResponse>> {
        self.inner.get_response(event_id, response_id).await
    }

    async fn insert_response(&self, response: NewResponse) -> StoreResult<FormResponse> {
        self.inner.insert_response(response).await
    }

    async fn delete_response(&self, event_id: Uuid, response_id: Uuid) -> StoreResult<bool> {
        self.inner.delete_response(event_id, response_id).await
    }

    async fn check_in(
        &self,
        event_id: Uuid,
        response_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<FormResponse>> {
        self.inner.check_in(event_id, response_id, at).await
    }

    async fn get_subscription(&self, user_id: Uuid) -> StoreResult<Option<Subscription>> {
        self.inner.get_subscription(user_id).await
    }
}
