//! validation.rs
//!
//! Проверка ответа на форму перед сохранением.
//!
//! На вход приходит произвольный JSON `{ "<field id>": значение }`. Для каждого
//! поля формы значение приводится к типу поля (`AnswerValue`), проверяется
//! обязательность и формат. Ключи, не принадлежащие форме события, отклоняются.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;
use validator::ValidateEmail;

use crate::models::{AnswerValue, Answers, EventForm, Field, FieldType};

pub const MAX_TEXT_LEN: usize = 10_000;
const PHONE_DIGITS: std::ops::RangeInclusive<usize> = 7..=15;

/// Ошибки по полям: id поля → сообщение.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }
}

fn scalar_to_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Приводит JSON-значение к типу поля. `Ok(None)`: ответа нет.
fn coerce(field: &Field, value: &Value) -> Result<Option<AnswerValue>, String> {
    if value.is_null() {
        return Ok(None);
    }

    let answer = match field.field_type {
        FieldType::Checkbox => match value {
            Value::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    match scalar_to_text(item) {
                        Some(s) if s.trim().is_empty() => {}
                        Some(s) => values.push(s),
                        None => return Err("expected a list of options".to_string()),
                    }
                }
                AnswerValue::Many(values)
            }
            Value::String(s) => AnswerValue::Many(vec![s.clone()]),
            _ => return Err("expected a list of options".to_string()),
        },
        FieldType::Number => match value {
            Value::Number(n) => AnswerValue::Number(n.as_f64().ok_or("must be a number")?),
            Value::String(s) if s.trim().is_empty() => return Ok(None),
            Value::String(s) => {
                let n: f64 = s.trim().parse().map_err(|_| "must be a number".to_string())?;
                if !n.is_finite() {
                    return Err("must be a number".to_string());
                }
                AnswerValue::Number(n)
            }
            _ => return Err("must be a number".to_string()),
        },
        _ => match scalar_to_text(value) {
            Some(s) => AnswerValue::Text(s),
            None => return Err("expected a text value".to_string()),
        },
    };

    Ok(if answer.is_empty() { None } else { Some(answer) })
}

fn valid_phone(raw: &str) -> bool {
    let allowed = raw
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '(' | ')' | '-' | ' ' | '.'));
    let digits = raw.chars().filter(|c| c.is_ascii_digit()).count();
    allowed && PHONE_DIGITS.contains(&digits)
}

fn check_format(field: &Field, answer: &AnswerValue) -> Result<(), String> {
    match (field.field_type, answer) {
        (_, AnswerValue::Text(s)) if s.chars().count() > MAX_TEXT_LEN => {
            Err(format!("must be at most {} characters", MAX_TEXT_LEN))
        }
        (FieldType::Email, AnswerValue::Text(s)) => {
            if s.trim().to_string().validate_email() {
                Ok(())
            } else {
                Err("must be a valid email address".to_string())
            }
        }
        (FieldType::Phone, AnswerValue::Text(s)) => {
            if valid_phone(s.trim()) {
                Ok(())
            } else {
                Err("must be a valid phone number".to_string())
            }
        }
        (FieldType::Date, AnswerValue::Text(s)) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(|_| ())
            .map_err(|_| "must be a date in YYYY-MM-DD format".to_string()),
        (FieldType::Select | FieldType::Radio, AnswerValue::Text(s)) => {
            if field.options.is_empty() || field.options.iter().any(|o| o == s) {
                Ok(())
            } else {
                Err(format!("'{}' is not one of the available options", s))
            }
        }
        (FieldType::Checkbox, AnswerValue::Many(items)) => {
            match items
                .iter()
                .find(|item| !field.options.is_empty() && !field.options.contains(item))
            {
                Some(item) => Err(format!("'{}' is not one of the available options", item)),
                None => Ok(()),
            }
        }
        _ => Ok(()),
    }
}

/// Проверяет ответ и возвращает типизированные значения по id полей.
pub fn validate_submission(
    form: &EventForm,
    raw: &HashMap<String, Value>,
) -> Result<Answers, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let mut answers = Answers::new();

    // Ключи должны ссылаться на поля этого события
    for key in raw.keys() {
        let known = Uuid::parse_str(key)
            .ok()
            .and_then(|id| form.find_field(id))
            .is_some();
        if !known {
            errors.add(key.clone(), "unknown field");
        }
    }

    for (_, field) in form.fields() {
        let key = field.id.to_string();
        let coerced = match raw.get(&key) {
            Some(value) => coerce(field, value),
            None => Ok(None),
        };

        match coerced {
            Err(message) => errors.add(key, message),
            Ok(None) if field.required => errors.add(key, "this field is required"),
            Ok(None) => {}
            Ok(Some(answer)) => match check_format(field, &answer) {
                Ok(()) => {
                    answers.insert(field.id, answer);
                }
                Err(message) => errors.add(key, message),
            },
        }
    }

    if errors.is_empty() {
        Ok(answers)
    } else {
        Err(errors)
    }
}
