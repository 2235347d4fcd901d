use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::spec::field::{FieldId, FieldSpec};

/// Layout class of a row, derived from how many fields it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RowLayout {
    Single,
    Pair,
    Wide,
}

impl RowLayout {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowLayout::Single => "single",
            RowLayout::Pair => "pair",
            RowLayout::Wide => "wide",
        }
    }
}

/// Horizontal group of fields.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct RowSpec {
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

impl RowSpec {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Empty rows never survive a deletion, so they report `Single` here.
    pub fn layout(&self) -> RowLayout {
        match self.fields.len() {
            0 | 1 => RowLayout::Single,
            2 => RowLayout::Pair,
            _ => RowLayout::Wide,
        }
    }

    pub fn position(&self, id: &FieldId) -> Option<usize> {
        self.fields.iter().position(|field| &field.id == id)
    }
}
