//! export.rs
//!
//! Выгрузка ответов события в CSV.
//!
//! Формат:
//! - BOM в начале, чтобы Excel открывал UTF-8 без кракозябр;
//! - заголовок: имя, дата отправки и по колонке на каждое поле формы
//!   (`{секция} - {поле}`) в порядке секций и полей;
//! - каждая ячейка в двойных кавычках, кавычки внутри удваиваются;
//! - строки разделены `\n`.

use chrono::FixedOffset;

use super::formatting::{format_answer, format_submission_time, AnswerStyle};
use crate::models::{EventForm, FormResponse};

pub const BOM: char = '\u{feff}';
pub const NAME_HEADER: &str = "Respondent Name";
pub const DATE_HEADER: &str = "Submission Date";

fn quote(cell: &str) -> String {
    format!("\"{}\"", cell.replace('"', "\"\""))
}

fn push_row<I>(out: &mut String, cells: I)
where
    I: IntoIterator<Item = String>,
{
    let row = cells
        .into_iter()
        .map(|cell| quote(&cell))
        .collect::<Vec<_>>()
        .join(",");
    out.push_str(&row);
}

pub fn export_csv<'a, I>(form: &EventForm, responses: I, offset: &FixedOffset) -> String
where
    I: IntoIterator<Item = &'a FormResponse>,
{
    let mut out = String::new();
    out.push(BOM);

    let header = [NAME_HEADER.to_string(), DATE_HEADER.to_string()]
        .into_iter()
        .chain(
            form.fields()
                .map(|(section, field)| format!("{} - {}", section.title, field.label)),
        );
    push_row(&mut out, header);

    for response in responses {
        out.push('\n');
        let row = [
            response.respondent_name.clone(),
            format_submission_time(response.submitted_at, offset),
        ]
        .into_iter()
        .chain(form.fields().map(|(_, field)| {
            format_answer(field, response.answers.get(&field.id), AnswerStyle::Csv)
        }));
        push_row(&mut out, row);
    }

    out
}

/// Имя файла выгрузки по названию события.
pub fn export_filename(title: &str) -> String {
    let cleaned: String = title
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == ' ' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let base = if cleaned.trim().is_empty() {
        "event"
    } else {
        cleaned.trim()
    };
    format!("{}_responses.csv", base)
}
