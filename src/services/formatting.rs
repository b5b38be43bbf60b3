use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::{AnswerValue, EventForm, Field, FieldType, FormResponse};

pub const NOT_ANSWERED: &str = "Not answered";

/// Куда идет отформатированный ответ: карточка ответа или ячейка CSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerStyle {
    Detail,
    Csv,
}

impl AnswerStyle {
    pub fn separator(&self) -> &'static str {
        match self {
            AnswerStyle::Detail => ", ",
            AnswerStyle::Csv => "; ",
        }
    }

    pub fn placeholder(&self) -> &'static str {
        match self {
            AnswerStyle::Detail => NOT_ANSWERED,
            AnswerStyle::Csv => "",
        }
    }
}

// Дата из <input type="date"> приходит как YYYY-MM-DD
fn format_date(raw: &str) -> String {
    match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
        Ok(date) => date.format("%d/%m/%Y").to_string(),
        Err(_) => raw.to_string(),
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Человекочитаемое значение ответа на поле.
pub fn format_answer(field: &Field, value: Option<&AnswerValue>, style: AnswerStyle) -> String {
    let value = match value {
        Some(v) if !v.is_empty() => v,
        _ => return style.placeholder().to_string(),
    };

    let text = |s: &str| match field.field_type {
        FieldType::Date => format_date(s),
        _ => s.to_string(),
    };

    match value {
        AnswerValue::Many(items) => items
            .iter()
            .filter(|s| !s.trim().is_empty())
            .map(|s| text(s.as_str()))
            .collect::<Vec<_>>()
            .join(style.separator()),
        AnswerValue::Text(s) => text(s.as_str()),
        AnswerValue::Number(n) => format_number(*n),
        AnswerValue::Flag(b) => b.to_string(),
    }
}

/// Дата отправки в локальном времени отчета.
pub fn format_submission_time(at: DateTime<Utc>, offset: &FixedOffset) -> String {
    at.with_timezone(offset).format("%d/%m/%Y %H:%M:%S").to_string()
}

// --- Карточка ответа для администратора ---

#[derive(Debug, Clone, Serialize)]
pub struct FieldDetail {
    pub field_id: Uuid,
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionDetail {
    pub title: String,
    pub fields: Vec<FieldDetail>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseDetail {
    pub id: Uuid,
    pub respondent_name: String,
    pub submitted_at: DateTime<Utc>,
    pub submitted_at_local: String,
    pub checked_in: bool,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub sections: Vec<SectionDetail>,
}

pub fn format_response_detail(
    form: &EventForm,
    response: &FormResponse,
    offset: &FixedOffset,
) -> ResponseDetail {
    let sections = form
        .sections
        .iter()
        .map(|section| SectionDetail {
            title: section.title.clone(),
            fields: section
                .fields
                .iter()
                .map(|field| FieldDetail {
                    field_id: field.id,
                    label: field.label.clone(),
                    value: format_answer(
                        field,
                        response.answers.get(&field.id),
                        AnswerStyle::Detail,
                    ),
                })
                .collect(),
        })
        .collect();

    ResponseDetail {
        id: response.id,
        respondent_name: response.respondent_name.clone(),
        submitted_at: response.submitted_at,
        submitted_at_local: format_submission_time(response.submitted_at, offset),
        checked_in: response.checked_in,
        checked_in_at: response.checked_in_at,
        sections,
    }
}
