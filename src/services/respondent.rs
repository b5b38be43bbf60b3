use crate::models::{Answers, EventForm, Field};

use super::formatting::{format_answer, AnswerStyle};

pub const ANONYMOUS: &str = "Anonymous";

// Подсказки в подписи поля для форм, где поле имени не отмечено явно
const NAME_HINTS: [&str; 2] = ["nome", "name"];

fn looks_like_name(field: &Field) -> bool {
    let label = field.label.to_lowercase();
    NAME_HINTS.iter().any(|hint| label.contains(hint))
}

fn answer_for(field: &Field, answers: &Answers) -> Option<String> {
    answers
        .get(&field.id)
        .filter(|value| !value.is_empty())
        .map(|value| format_answer(field, Some(value), AnswerStyle::Detail).trim().to_string())
}

/// Имя участника для списков и check-in.
///
/// Сначала поле с флагом `is_name_field`, затем первое поле с "nome"/"name"
/// в подписи. Без ответа на такие поля участник анонимный.
pub fn detect_respondent_name(form: &EventForm, answers: &Answers) -> String {
    let flagged = form
        .fields()
        .filter(|(_, field)| field.is_name_field)
        .find_map(|(_, field)| answer_for(field, answers));

    flagged
        .or_else(|| {
            form.fields()
                .filter(|(_, field)| looks_like_name(field))
                .find_map(|(_, field)| answer_for(field, answers))
        })
        .unwrap_or_else(|| ANONYMOUS.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnswerValue, Event, FieldType, Section};
    use chrono::Utc;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn field(label: &str, is_name_field: bool) -> Field {
        Field {
            id: Uuid::new_v4(),
            section_id: Uuid::nil(),
            field_type: FieldType::Text,
            label: label.to_string(),
            placeholder: None,
            required: false,
            is_name_field,
            options: vec![],
            order_index: 0,
        }
    }

    fn form(fields: Vec<Field>) -> EventForm {
        let now = Utc::now();
        EventForm {
            event: Event {
                id: Uuid::nil(),
                user_id: Uuid::nil(),
                title: "Evento".to_string(),
                description: None,
                primary_color: None,
                accent_color: None,
                background_image_url: None,
                logo_url: None,
                font_family: None,
                event_date: None,
                created_at: now,
                updated_at: now,
            },
            sections: vec![Section {
                id: Uuid::nil(),
                event_id: Uuid::nil(),
                title: "Dados".to_string(),
                description: None,
                order_index: 0,
                fields,
            }],
        }
    }

    #[test]
    fn explicit_flag_wins_over_label() {
        let by_label = field("Nome completo", false);
        let flagged = field("Como quer ser chamado", true);
        let answers = BTreeMap::from([
            (by_label.id, AnswerValue::Text("Ana Souza".into())),
            (flagged.id, AnswerValue::Text("Aninha".into())),
        ]);
        let form = form(vec![by_label, flagged]);

        assert_eq!(detect_respondent_name(&form, &answers), "Aninha");
    }

    #[test]
    fn label_heuristic_is_case_insensitive() {
        let email = field("E-mail", false);
        let name = field("Full NAME", false);
        let answers = BTreeMap::from([
            (email.id, AnswerValue::Text("ana@example.com".into())),
            (name.id, AnswerValue::Text("  Ana  ".into())),
        ]);
        let form = form(vec![email, name]);

        assert_eq!(detect_respondent_name(&form, &answers), "Ana");
    }

    #[test]
    fn empty_name_falls_back_to_anonymous() {
        let name = field("Nome", false);
        let answers = BTreeMap::from([(name.id, AnswerValue::Text("".into()))]);
        let form = form(vec![name]);

        assert_eq!(detect_respondent_name(&form, &answers), ANONYMOUS);
        assert_eq!(detect_respondent_name(&form, &BTreeMap::new()), ANONYMOUS);
    }
}
