use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::Event;

/// Тип поля формы. Определяет, какое значение ожидается в ответе.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Email,
    Number,
    Phone,
    Date,
    Select,
    Checkbox,
    Radio,
    Textarea,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Email => "email",
            FieldType::Number => "number",
            FieldType::Phone => "phone",
            FieldType::Date => "date",
            FieldType::Select => "select",
            FieldType::Checkbox => "checkbox",
            FieldType::Radio => "radio",
            FieldType::Textarea => "textarea",
        }
    }

    /// Поля с фиксированным набором вариантов ответа.
    pub fn has_options(&self) -> bool {
        matches!(self, FieldType::Select | FieldType::Checkbox | FieldType::Radio)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown field type '{0}'")]
pub struct UnknownFieldType(pub String);

impl FromStr for FieldType {
    type Err = UnknownFieldType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "text" => FieldType::Text,
            "email" => FieldType::Email,
            "number" => FieldType::Number,
            "phone" => FieldType::Phone,
            "date" => FieldType::Date,
            "select" => FieldType::Select,
            "checkbox" => FieldType::Checkbox,
            "radio" => FieldType::Radio,
            "textarea" => FieldType::Textarea,
            other => return Err(UnknownFieldType(other.to_string())),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: Uuid,
    pub section_id: Uuid,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub label: String,
    pub placeholder: Option<String>,
    pub required: bool,
    pub is_name_field: bool,
    pub options: Vec<String>,
    pub order_index: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: Uuid,
    pub event_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub order_index: i32,
    pub fields: Vec<Field>,
}

/// Событие со всей схемой формы: секции и поля упорядочены по order_index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventForm {
    #[serde(flatten)]
    pub event: Event,
    pub sections: Vec<Section>,
}

impl EventForm {
    /// Все поля формы в порядке отображения вместе с их секцией.
    pub fn fields(&self) -> impl Iterator<Item = (&Section, &Field)> {
        self.sections
            .iter()
            .flat_map(|section| section.fields.iter().map(move |field| (section, field)))
    }

    pub fn field_count(&self) -> usize {
        self.sections.iter().map(|s| s.fields.len()).sum()
    }

    pub fn find_field(&self, id: Uuid) -> Option<&Field> {
        self.fields().map(|(_, f)| f).find(|f| f.id == id)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewSection {
    #[validate(length(min = 1, max = 200, message = "section title must be 1-200 characters"))]
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub fields: Vec<NewField>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_field_options"))]
pub struct NewField {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[validate(length(min = 1, max = 300, message = "field label must be 1-300 characters"))]
    pub label: String,
    pub placeholder: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub is_name_field: bool,
    #[serde(default)]
    pub options: Vec<String>,
}

fn validate_field_options(field: &NewField) -> Result<(), ValidationError> {
    if field.field_type.has_options() && field.options.is_empty() {
        let mut err = ValidationError::new("options_required");
        err.message = Some(format!("field '{}' needs at least one option", field.label).into());
        return Err(err);
    }
    if field.options.iter().any(|o| o.trim().is_empty()) {
        return Err(ValidationError::new("empty_option"));
    }
    Ok(())
}
