use std::collections::BTreeMap;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::answers::FieldValue;
use crate::spec::field::{FieldId, FieldSpec, InputType};
use crate::spec::form::FormSpec;

/// Placeholder shown for questions a submission did not answer.
pub const NOT_ANSWERED: &str = "N/A";

/// Identifies the single submission per (form, subject, occasion).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionKey {
    pub form_id: String,
    #[serde(alias = "patientId")]
    pub subject_id: String,
    #[serde(alias = "timepointId")]
    pub occasion_id: String,
}

impl SubmissionKey {
    pub fn new(
        form_id: impl Into<String>,
        subject_id: impl Into<String>,
        occasion_id: impl Into<String>,
    ) -> Self {
        Self {
            form_id: form_id.into(),
            subject_id: subject_id.into(),
            occasion_id: occasion_id.into(),
        }
    }
}

impl fmt::Display for SubmissionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "form '{}', subject '{}', occasion '{}'",
            self.form_id, self.subject_id, self.occasion_id
        )
    }
}

/// Stored field: the authored shape plus the captured answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoredField {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<FieldId>,
    #[serde(default)]
    pub label: String,
    pub input_type: InputType,
    #[serde(default)]
    pub value: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl StoredField {
    pub fn capture(field: &FieldSpec, value: Option<&FieldValue>) -> Self {
        Self {
            id: Some(field.id.clone()),
            label: field.label.clone(),
            input_type: field.input_type,
            value: value.cloned(),
            options: field.options.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct StoredRow {
    #[serde(default)]
    pub fields: Vec<StoredField>,
}

/// A completed answer set for one form, subject and occasion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    /// Assigned by the store on first save.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub form_id: String,
    #[serde(alias = "patientId")]
    pub subject_id: String,
    #[serde(alias = "timepointId")]
    pub occasion_id: String,
    #[serde(default, alias = "additionalFields")]
    pub rows: Vec<StoredRow>,
}

impl Submission {
    pub fn new(key: &SubmissionKey, rows: Vec<StoredRow>) -> Self {
        Self {
            id: None,
            form_id: key.form_id.clone(),
            subject_id: key.subject_id.clone(),
            occasion_id: key.occasion_id.clone(),
            rows,
        }
    }

    pub fn key(&self) -> SubmissionKey {
        SubmissionKey::new(&self.form_id, &self.subject_id, &self.occasion_id)
    }

    pub fn fields(&self) -> impl Iterator<Item = &StoredField> {
        self.rows.iter().flat_map(|row| row.fields.iter())
    }

    /// Stored field for `field`, by id first and then by label.
    pub fn answer_for(&self, field: &FieldSpec) -> Option<&StoredField> {
        self.fields()
            .find(|stored| stored.id.as_ref() == Some(&field.id))
            .or_else(|| self.fields().find(|stored| stored.label == field.label))
    }
}

/// One submission flattened into label/value pairs for a responses table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_id: Option<String>,
    pub subject_id: String,
    pub occasion_id: String,
    /// Answers keyed by field label.
    pub answers: BTreeMap<String, String>,
}

/// Tabulates submissions by the form's labels.
pub fn summarize(form: &FormSpec, submissions: &[Submission]) -> Vec<ResponseSummary> {
    submissions
        .iter()
        .map(|submission| {
            let answers = form
                .fields()
                .map(|field| {
                    let text = submission
                        .answer_for(field)
                        .and_then(|stored| stored.value.as_ref())
                        .filter(|value| !value.is_empty())
                        .map(FieldValue::display)
                        .unwrap_or_else(|| NOT_ANSWERED.to_string());
                    (field.label.clone(), text)
                })
                .collect();
            ResponseSummary {
                submission_id: submission.id.clone(),
                subject_id: submission.subject_id.clone(),
                occasion_id: submission.occasion_id.clone(),
                answers,
            }
        })
        .collect()
}
