use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Значение ответа на одно поле формы.
///
/// В JSON хранится без тега: массив строк, строка, число или булево.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Many(Vec<String>),
    Text(String),
    Number(f64),
    Flag(bool),
}

impl AnswerValue {
    /// Пустая строка или пустой список считаются отсутствующим ответом.
    pub fn is_empty(&self) -> bool {
        match self {
            AnswerValue::Text(s) => s.trim().is_empty(),
            AnswerValue::Many(items) => items.iter().all(|s| s.trim().is_empty()),
            AnswerValue::Number(_) | AnswerValue::Flag(_) => false,
        }
    }
}

pub type Answers = BTreeMap<Uuid, AnswerValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormResponse {
    pub id: Uuid,
    pub event_id: Uuid,
    pub respondent_name: String,
    pub answers: Answers,
    pub checked_in: bool,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub submitted_at: DateTime<Utc>,
}

// Ответ, прошедший валидацию и готовый к сохранению
#[derive(Debug, Clone)]
pub struct NewResponse {
    pub event_id: Uuid,
    pub respondent_name: String,
    pub answers: Answers,
}
