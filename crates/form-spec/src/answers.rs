use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::Value;
use thiserror::Error;

use crate::spec::field::{FieldId, FieldSpec};
use crate::spec::form::FormSpec;

/// Current answer of a field: a single string or a list for multi-valued controls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum FieldValue {
    Scalar(String),
    Multi(Vec<String>),
}

impl FieldValue {
    pub fn scalar(value: impl Into<String>) -> Self {
        FieldValue::Scalar(value.into())
    }

    pub fn multi<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldValue::Multi(values.into_iter().map(Into::into).collect())
    }

    /// Converts a JSON answer; objects and nested arrays are rejected.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Array(items) => items
                .iter()
                .map(scalar_text)
                .collect::<Option<Vec<_>>>()
                .map(FieldValue::Multi),
            other => scalar_text(other).map(FieldValue::Scalar),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Scalar(text) => Value::String(text.clone()),
            FieldValue::Multi(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Scalar(text) => text.trim().is_empty(),
            FieldValue::Multi(items) => items.is_empty(),
        }
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            FieldValue::Scalar(text) => Some(text),
            FieldValue::Multi(_) => None,
        }
    }

    pub fn as_multi(&self) -> Option<&[String]> {
        match self {
            FieldValue::Multi(items) => Some(items),
            FieldValue::Scalar(_) => None,
        }
    }

    /// Flattens to display text; lists are joined with `", "`.
    pub fn display(&self) -> String {
        match self {
            FieldValue::Scalar(text) => text.clone(),
            FieldValue::Multi(items) => items.join(", "),
        }
    }

    /// Coerces the value into the shape the field's control holds.
    pub fn normalized_for(self, field: &FieldSpec) -> Self {
        if field.expects_multiple() {
            match self {
                FieldValue::Scalar(text) if text.is_empty() => FieldValue::Multi(Vec::new()),
                FieldValue::Scalar(text) => FieldValue::Multi(vec![text]),
                multi => multi,
            }
        } else {
            match self {
                FieldValue::Multi(mut items) if items.len() == 1 => {
                    FieldValue::Scalar(items.remove(0))
                }
                FieldValue::Multi(items) => FieldValue::Scalar(items.join(", ")),
                scalar => scalar,
            }
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        FieldValue::from_json(&raw).ok_or_else(|| {
            de::Error::custom("expected a string, number, boolean, or a list of those")
        })
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::Null => Some(String::new()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Errors raised while reading an answers document.
#[derive(Debug, Error)]
pub enum AnswersError {
    #[error("answers must be a JSON object keyed by field id or label")]
    NotAnObject,
    #[error("answer for '{0}' must be a string, number, boolean, or a list of those")]
    UnsupportedValue(String),
}

/// Live answers keyed by field id, kept apart from the authored schema.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ValueStore {
    values: BTreeMap<FieldId, FieldValue>,
}

impl ValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blank answers for every field of the form.
    pub fn blank_for(form: &FormSpec) -> Self {
        let values = form
            .fields()
            .map(|field| (field.id.clone(), field.blank_value()))
            .collect();
        Self { values }
    }

    /// Reads an answers object keyed by field id, falling back to labels.
    ///
    /// Keys that match neither are kept verbatim so validation can report them.
    pub fn from_answers_json(form: &FormSpec, answers: &Value) -> Result<Self, AnswersError> {
        let object = answers.as_object().ok_or(AnswersError::NotAnObject)?;
        let mut store = Self::new();
        for (key, raw) in object {
            let value = FieldValue::from_json(raw)
                .ok_or_else(|| AnswersError::UnsupportedValue(key.clone()))?;
            let id = FieldId::from(key.as_str());
            let field = form.field(&id).or_else(|| form.field_by_label(key));
            match field {
                Some(field) => store.insert(field.id.clone(), value.normalized_for(field)),
                None => store.insert(id, value),
            }
        }
        Ok(store)
    }

    pub fn get(&self, id: &FieldId) -> Option<&FieldValue> {
        self.values.get(id)
    }

    pub fn insert(&mut self, id: FieldId, value: FieldValue) {
        self.values.insert(id, value);
    }

    pub fn remove(&mut self, id: &FieldId) -> Option<FieldValue> {
        self.values.remove(id)
    }

    pub fn contains(&self, id: &FieldId) -> bool {
        self.values.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldId, &FieldValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .map(|(id, value)| (id.to_string(), value.to_json()))
                .collect(),
        )
    }
}

/// Blocking validation failure attached to a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationError {
    pub field_id: FieldId,
    pub message: String,
    pub code: String,
}

impl ValidationError {
    pub fn new(field_id: &FieldId, code: &str, message: impl Into<String>) -> Self {
        Self {
            field_id: field_id.clone(),
            message: message.into(),
            code: code.into(),
        }
    }
}

/// Non-blocking notice produced by soft validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FieldWarning {
    pub field_id: FieldId,
    pub message: String,
}

/// Outcome of validating a whole answer set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ValidationError>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_required: Vec<FieldId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unknown_fields: Vec<FieldId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<FieldWarning>,
}
