use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use super::{EventStore, StoreError, StoreResult};
use crate::models::{
    Event, EventForm, EventSummary, Field, FormResponse, NewEvent, NewResponse, NewUser, Section,
    Subscription, User,
};

#[derive(Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    forms: HashMap<Uuid, EventForm>,
    responses: HashMap<Uuid, FormResponse>,
    subscriptions: HashMap<Uuid, Subscription>,
}

/// Хранилище в памяти. Секции и поля живут внутри `EventForm`,
/// поэтому каскадное удаление сводится к удалению формы и ее ответов.
#[derive(Default)]
pub struct InMemoryEventStore {
    state: RwLock<MemoryState>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Записать подписку напрямую (оплата подписок вне этого сервиса).
    pub fn put_subscription(&self, subscription: Subscription) {
        self.state
            .write()
            .subscriptions
            .insert(subscription.user_id, subscription);
    }
}

fn build_form(owner: Uuid, new_event: NewEvent, now: DateTime<Utc>) -> EventForm {
    let event_id = Uuid::new_v4();
    let sections = new_event
        .sections
        .into_iter()
        .enumerate()
        .map(|(index, section)| {
            let section_id = Uuid::new_v4();
            let fields = section
                .fields
                .into_iter()
                .enumerate()
                .map(|(field_index, field)| Field {
                    id: Uuid::new_v4(),
                    section_id,
                    field_type: field.field_type,
                    label: field.label,
                    placeholder: field.placeholder,
                    required: field.required,
                    is_name_field: field.is_name_field,
                    options: field.options,
                    order_index: field_index as i32,
                })
                .collect();
            Section {
                id: section_id,
                event_id,
                title: section.title,
                description: section.description,
                order_index: index as i32,
                fields,
            }
        })
        .collect();

    EventForm {
        event: Event {
            id: event_id,
            user_id: owner,
            title: new_event.title,
            description: new_event.description,
            primary_color: new_event.primary_color,
            accent_color: new_event.accent_color,
            background_image_url: new_event.background_image_url,
            logo_url: new_event.logo_url,
            font_family: new_event.font_family,
            event_date: new_event.event_date,
            created_at: now,
            updated_at: now,
        },
        sections,
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut state = self.state.write();
        if state.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!(
                "email {} already registered",
                user.email
            )));
        }
        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            name: user.name,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        state.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .state
            .read()
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn list_events(&self, owner: Uuid) -> StoreResult<Vec<EventSummary>> {
        let state = self.state.read();
        let mut events: Vec<EventSummary> = state
            .forms
            .values()
            .filter(|form| form.event.user_id == owner)
            .map(|form| EventSummary {
                event: form.event.clone(),
                responses: state
                    .responses
                    .values()
                    .filter(|r| r.event_id == form.event.id)
                    .count() as i64,
            })
            .collect();
        events.sort_by(|a, b| b.event.created_at.cmp(&a.event.created_at));
        Ok(events)
    }

    async fn create_event(&self, owner: Uuid, event: NewEvent) -> StoreResult<EventForm> {
        let form = build_form(owner, event, Utc::now());
        self.state.write().forms.insert(form.event.id, form.clone());
        Ok(form)
    }

    async fn get_form(&self, event_id: Uuid) -> StoreResult<Option<EventForm>> {
        Ok(self.state.read().forms.get(&event_id).cloned())
    }

    async fn delete_event(&self, event_id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write();
        if state.forms.remove(&event_id).is_none() {
            return Ok(false);
        }
        state.responses.retain(|_, r| r.event_id != event_id);
        Ok(true)
    }

    async fn list_responses(&self, event_id: Uuid) -> StoreResult<Vec<FormResponse>> {
        let mut responses: Vec<FormResponse> = self
            .state
            .read()
            .responses
            .values()
            .filter(|r| r.event_id == event_id)
            .cloned()
            .collect();
        responses.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(responses)
    }

    async fn get_response(
        &self,
        event_id: Uuid,
        response_id: Uuid,
    ) -> StoreResult<Option<FormResponse>> {
        Ok(self
            .state
            .read()
            .responses
            .get(&response_id)
            .filter(|r| r.event_id == event_id)
            .cloned())
    }

    async fn insert_response(&self, response: NewResponse) -> StoreResult<FormResponse> {
        let mut state = self.state.write();
        // Как и внешний ключ в Postgres: ответ без события не сохраняем
        if !state.forms.contains_key(&response.event_id) {
            return Err(StoreError::Conflict(format!(
                "event {} does not exist",
                response.event_id
            )));
        }
        let created = FormResponse {
            id: Uuid::new_v4(),
            event_id: response.event_id,
            respondent_name: response.respondent_name,
            answers: response.answers,
            checked_in: false,
            checked_in_at: None,
            submitted_at: Utc::now(),
        };
        state.responses.insert(created.id, created.clone());
        Ok(created)
    }

    async fn delete_response(&self, event_id: Uuid, response_id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write();
        let belongs = state
            .responses
            .get(&response_id)
            .map(|r| r.event_id == event_id)
            .unwrap_or(false);
        if belongs {
            state.responses.remove(&response_id);
        }
        Ok(belongs)
    }

    async fn check_in(
        &self,
        event_id: Uuid,
        response_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<FormResponse>> {
        let mut state = self.state.write();
        let Some(response) = state
            .responses
            .get_mut(&response_id)
            .filter(|r| r.event_id == event_id)
        else {
            return Ok(None);
        };
        response.checked_in = true;
        response.checked_in_at.get_or_insert(at);
        Ok(Some(response.clone()))
    }

    async fn get_subscription(&self, user_id: Uuid) -> StoreResult<Option<Subscription>> {
        Ok(self.state.read().subscriptions.get(&user_id).cloned())
    }
}
