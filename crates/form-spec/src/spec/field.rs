use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::answers::FieldValue;

/// Stable identity of a field, allocated once at construction.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct FieldId(String);

impl FieldId {
    /// Allocates a fresh, process-unique id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FieldId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for FieldId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Palette of supported input controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Text,
    Number,
    Email,
    Password,
    Date,
    Checkbox,
    Radio,
    Dropdown,
    Textarea,
}

impl InputType {
    pub const ALL: [InputType; 9] = [
        InputType::Text,
        InputType::Number,
        InputType::Email,
        InputType::Password,
        InputType::Date,
        InputType::Checkbox,
        InputType::Radio,
        InputType::Dropdown,
        InputType::Textarea,
    ];

    /// Choice types carry an `options` list.
    pub fn is_choice(self) -> bool {
        matches!(
            self,
            InputType::Checkbox | InputType::Radio | InputType::Dropdown
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InputType::Text => "text",
            InputType::Number => "number",
            InputType::Email => "email",
            InputType::Password => "password",
            InputType::Date => "date",
            InputType::Checkbox => "checkbox",
            InputType::Radio => "radio",
            InputType::Dropdown => "dropdown",
            InputType::Textarea => "textarea",
        }
    }
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InputType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "text" => Ok(InputType::Text),
            "number" => Ok(InputType::Number),
            "email" => Ok(InputType::Email),
            "password" => Ok(InputType::Password),
            "date" => Ok(InputType::Date),
            "checkbox" => Ok(InputType::Checkbox),
            "radio" => Ok(InputType::Radio),
            "dropdown" | "select" => Ok(InputType::Dropdown),
            "textarea" => Ok(InputType::Textarea),
            _ => Err(format!("unknown input type '{}'", value)),
        }
    }
}

/// Role of a date field inside a start/end pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DateFieldType {
    Start,
    End,
}

/// Definition of a single answerable field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    #[serde(default = "FieldId::generate")]
    pub id: FieldId,
    #[serde(default)]
    pub label: String,
    pub input_type: InputType,
    #[serde(default, alias = "isrequired")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default)]
    pub allow_multiple_selection: bool,
    #[serde(default)]
    pub validate_number: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_validation: Option<String>,
    #[serde(default)]
    pub soft_validation: bool,
    #[serde(default)]
    pub date_validation: bool,
    /// Derived from the row; recomputed whenever the schema is loaded or edited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_field_type: Option<DateFieldType>,
    #[serde(default)]
    pub has_visibility_condition: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility_condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<FieldValue>,
}

impl FieldSpec {
    /// Builds a blank field of the given type with a freshly allocated id.
    pub fn new(input_type: InputType) -> Self {
        Self {
            id: FieldId::generate(),
            label: String::new(),
            input_type,
            required: false,
            options: Vec::new(),
            allow_multiple_selection: false,
            validate_number: false,
            number_validation: None,
            soft_validation: false,
            date_validation: false,
            date_field_type: None,
            has_visibility_condition: false,
            visibility_condition: None,
            value: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Checkbox fields and multi-select dropdowns hold a list of values.
    pub fn expects_multiple(&self) -> bool {
        match self.input_type {
            InputType::Checkbox => true,
            InputType::Dropdown => self.allow_multiple_selection,
            _ => false,
        }
    }

    /// The condition source when one is switched on and non-blank.
    pub fn active_condition(&self) -> Option<&str> {
        if !self.has_visibility_condition {
            return None;
        }
        self.visibility_condition
            .as_deref()
            .map(str::trim)
            .filter(|condition| !condition.is_empty())
    }

    /// Value a freshly rendered control starts with.
    pub fn blank_value(&self) -> FieldValue {
        match &self.value {
            Some(value) => value.clone().normalized_for(self),
            None if self.expects_multiple() => FieldValue::Multi(Vec::new()),
            None => FieldValue::Scalar(String::new()),
        }
    }

    pub(crate) fn is_paired_date(&self) -> bool {
        self.input_type == InputType::Date && self.date_validation
    }
}
