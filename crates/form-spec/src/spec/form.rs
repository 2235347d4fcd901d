use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::layout::assign_date_field_types;
use crate::spec::field::{FieldId, FieldSpec};
use crate::spec::row::RowSpec;

/// Top-level form definition. Identity is assigned by the store.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct FormSpec {
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "additionalFields")]
    pub rows: Vec<RowSpec>,
}

impl FormSpec {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            rows: Vec::new(),
        }
    }

    /// All fields in schema order (row by row, left to right).
    pub fn fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.rows.iter().flat_map(|row| row.fields.iter())
    }

    pub fn field_count(&self) -> usize {
        self.rows.iter().map(RowSpec::len).sum()
    }

    pub fn field(&self, id: &FieldId) -> Option<&FieldSpec> {
        self.fields().find(|field| &field.id == id)
    }

    /// First field carrying `label`; labels are how conditions refer to fields.
    /// Blank labels never match, so `''` stays an empty literal.
    pub fn field_by_label(&self, label: &str) -> Option<&FieldSpec> {
        if label.trim().is_empty() {
            return None;
        }
        self.fields().find(|field| field.label == label)
    }

    /// `(row, field)` indices of the field with the given id.
    pub fn locate(&self, id: &FieldId) -> Option<(usize, usize)> {
        self.rows
            .iter()
            .enumerate()
            .find_map(|(row_idx, row)| row.position(id).map(|field_idx| (row_idx, field_idx)))
    }

    pub fn row_of(&self, id: &FieldId) -> Option<&RowSpec> {
        self.locate(id).map(|(row_idx, _)| &self.rows[row_idx])
    }

    /// Re-derives every row's paired date tags; stored tags are never trusted.
    pub fn normalize(&mut self) {
        for row in &mut self.rows {
            assign_date_field_types(row);
        }
    }

    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }
}
