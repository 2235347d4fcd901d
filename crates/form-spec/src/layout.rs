//! Authoring operations over a form's rows and fields.
//!
//! Every operation addresses rows and fields by index, the way a freshly
//! rendered builder issues them. An index that is out of range turns the call
//! into a no-op; the return value says whether anything changed.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::expr::Expr;
use crate::number_format::NumberFormat;
use crate::spec::field::{DateFieldType, FieldId, FieldSpec, InputType};
use crate::spec::form::FormSpec;
use crate::spec::row::RowSpec;
use crate::visibility::VisibilityEngine;

/// Where a newly dropped field lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowTarget {
    NewRow,
    Existing(usize),
}

/// Tags the two validated date fields of a row as `start`/`end`.
///
/// Exactly two qualifying fields get tagged in row order; any other count
/// clears the tag on every field of the row.
pub fn assign_date_field_types(row: &mut RowSpec) {
    let paired: Vec<usize> = row
        .fields
        .iter()
        .enumerate()
        .filter(|(_, field)| field.is_paired_date())
        .map(|(idx, _)| idx)
        .collect();

    for field in &mut row.fields {
        field.date_field_type = None;
    }
    if let [start, end] = paired[..] {
        row.fields[start].date_field_type = Some(DateFieldType::Start);
        row.fields[end].date_field_type = Some(DateFieldType::End);
    }
}

/// Exclusive owner of a form while it is being authored.
#[derive(Debug, Clone, Default)]
pub struct LayoutBuilder {
    form: FormSpec,
}

impl LayoutBuilder {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            form: FormSpec::new(title),
        }
    }

    /// Takes over an existing schema, re-deriving paired date tags.
    pub fn from_form(form: FormSpec) -> Self {
        Self {
            form: form.normalized(),
        }
    }

    pub fn form(&self) -> &FormSpec {
        &self.form
    }

    pub fn into_form(self) -> FormSpec {
        self.form
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.form.title = title.into();
    }

    /// Clears the title and every row.
    pub fn reset(&mut self) {
        self.form = FormSpec::default();
    }

    pub fn insert_field(&mut self, target: RowTarget, input_type: InputType) -> Option<FieldId> {
        let field = FieldSpec::new(input_type);
        let id = field.id.clone();
        match target {
            RowTarget::NewRow => {
                self.form.rows.push(RowSpec::new(vec![field]));
                let last = self.form.rows.len() - 1;
                assign_date_field_types(&mut self.form.rows[last]);
            }
            RowTarget::Existing(row_idx) => {
                let Some(row) = self.form.rows.get_mut(row_idx) else {
                    debug!(row = row_idx, "insert_field ignored: row out of range");
                    return None;
                };
                row.fields.push(field);
                assign_date_field_types(row);
            }
        }
        Some(id)
    }

    /// Appends a row holding one default text field.
    pub fn add_new_row(&mut self) -> FieldId {
        let field = FieldSpec::new(InputType::Text);
        let id = field.id.clone();
        self.form.rows.push(RowSpec::new(vec![field]));
        id
    }

    /// Appends a default text field to an existing row.
    pub fn add_field(&mut self, row_idx: usize) -> Option<FieldId> {
        self.insert_field(RowTarget::Existing(row_idx), InputType::Text)
    }

    /// Stable move of one field inside its row. `to` is clamped to the row end.
    pub fn reorder_within_row(&mut self, row_idx: usize, from: usize, to: usize) -> bool {
        let Some(row) = self.form.rows.get_mut(row_idx) else {
            debug!(row = row_idx, "reorder ignored: row out of range");
            return false;
        };
        if from >= row.fields.len() {
            debug!(row = row_idx, from, "reorder ignored: field out of range");
            return false;
        }
        let field = row.fields.remove(from);
        let to = to.min(row.fields.len());
        row.fields.insert(to, field);
        assign_date_field_types(row);
        true
    }

    /// Removes a field; a row left empty is removed too, shifting later rows up.
    pub fn remove_field(&mut self, row_idx: usize, field_idx: usize) -> bool {
        let Some(row) = self.form.rows.get_mut(row_idx) else {
            debug!(row = row_idx, "remove_field ignored: row out of range");
            return false;
        };
        if field_idx >= row.fields.len() {
            debug!(row = row_idx, field = field_idx, "remove_field ignored: field out of range");
            return false;
        }
        row.fields.remove(field_idx);
        if row.fields.is_empty() {
            self.form.rows.remove(row_idx);
        } else {
            assign_date_field_types(row);
        }
        true
    }

    pub fn remove_row(&mut self, row_idx: usize) -> bool {
        if row_idx >= self.form.rows.len() {
            debug!(row = row_idx, "remove_row ignored: row out of range");
            return false;
        }
        self.form.rows.remove(row_idx);
        true
    }

    pub fn change_field_type(
        &mut self,
        row_idx: usize,
        field_idx: usize,
        new_type: InputType,
    ) -> bool {
        let Some(row) = self.form.rows.get_mut(row_idx) else {
            debug!(row = row_idx, "change_field_type ignored: row out of range");
            return false;
        };
        let Some(field) = row.fields.get_mut(field_idx) else {
            debug!(row = row_idx, field = field_idx, "change_field_type ignored: field out of range");
            return false;
        };
        if field.input_type == new_type {
            return true;
        }
        field.input_type = new_type;
        if new_type.is_choice() {
            field.options.clear();
        }
        if new_type != InputType::Dropdown {
            field.allow_multiple_selection = false;
        }
        assign_date_field_types(row);
        true
    }

    pub fn set_label(&mut self, row_idx: usize, field_idx: usize, label: impl Into<String>) -> bool {
        let label = label.into();
        self.edit_field(row_idx, field_idx, |field| field.label = label)
    }

    pub fn set_required(&mut self, row_idx: usize, field_idx: usize, required: bool) -> bool {
        self.edit_field(row_idx, field_idx, |field| field.required = required)
    }

    /// Appends an empty option to be filled in afterwards.
    pub fn add_option(&mut self, row_idx: usize, field_idx: usize) -> bool {
        self.edit_field(row_idx, field_idx, |field| field.options.push(String::new()))
    }

    pub fn set_option(
        &mut self,
        row_idx: usize,
        field_idx: usize,
        option_idx: usize,
        text: impl Into<String>,
    ) -> bool {
        let text = text.into();
        match self.field_mut(row_idx, field_idx) {
            Some(field) => match field.options.get_mut(option_idx) {
                Some(option) => {
                    *option = text;
                    true
                }
                None => {
                    debug!(option = option_idx, "set_option ignored: option out of range");
                    false
                }
            },
            None => false,
        }
    }

    pub fn remove_option(&mut self, row_idx: usize, field_idx: usize, option_idx: usize) -> bool {
        match self.field_mut(row_idx, field_idx) {
            Some(field) if option_idx < field.options.len() => {
                field.options.remove(option_idx);
                true
            }
            Some(_) => {
                debug!(option = option_idx, "remove_option ignored: option out of range");
                false
            }
            None => false,
        }
    }

    /// Only dropdowns can switch multiple selection on.
    pub fn set_allow_multiple_selection(
        &mut self,
        row_idx: usize,
        field_idx: usize,
        allow: bool,
    ) -> bool {
        match self.field_mut(row_idx, field_idx) {
            Some(field) if field.input_type == InputType::Dropdown || !allow => {
                field.allow_multiple_selection = allow;
                true
            }
            _ => false,
        }
    }

    /// `Some("D.F")` switches number-format validation on, `None` off.
    pub fn set_number_validation(
        &mut self,
        row_idx: usize,
        field_idx: usize,
        format: Option<String>,
    ) -> bool {
        self.edit_field(row_idx, field_idx, |field| {
            field.validate_number = format.is_some();
            field.number_validation = format;
        })
    }

    pub fn set_soft_validation(&mut self, row_idx: usize, field_idx: usize, soft: bool) -> bool {
        self.edit_field(row_idx, field_idx, |field| field.soft_validation = soft)
    }

    pub fn set_date_validation(&mut self, row_idx: usize, field_idx: usize, enabled: bool) -> bool {
        let applied = self.edit_field(row_idx, field_idx, |field| field.date_validation = enabled);
        if applied {
            assign_date_field_types(&mut self.form.rows[row_idx]);
        }
        applied
    }

    pub fn set_visibility_condition(
        &mut self,
        row_idx: usize,
        field_idx: usize,
        condition: Option<String>,
    ) -> bool {
        self.edit_field(row_idx, field_idx, |field| {
            field.has_visibility_condition = condition.is_some();
            field.visibility_condition = condition;
        })
    }

    fn field_mut(&mut self, row_idx: usize, field_idx: usize) -> Option<&mut FieldSpec> {
        let field = self
            .form
            .rows
            .get_mut(row_idx)
            .and_then(|row| row.fields.get_mut(field_idx));
        if field.is_none() {
            debug!(row = row_idx, field = field_idx, "field edit ignored: index out of range");
        }
        field
    }

    fn edit_field<F>(&mut self, row_idx: usize, field_idx: usize, edit: F) -> bool
    where
        F: FnOnce(&mut FieldSpec),
    {
        match self.field_mut(row_idx, field_idx) {
            Some(field) => {
                edit(field);
                true
            }
            None => false,
        }
    }
}

/// Authoring problem reported by [`check_form`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayoutIssue {
    DuplicateId { id: FieldId },
    EmptyRow { row: usize },
    MissingOptions { id: FieldId },
    DuplicateLabel { label: String },
    InvalidNumberFormat { id: FieldId, format: String },
    InvalidCondition { id: FieldId, message: String },
    CyclicCondition { id: FieldId },
}

impl fmt::Display for LayoutIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutIssue::DuplicateId { id } => write!(f, "duplicate field id '{}'", id),
            LayoutIssue::EmptyRow { row } => write!(f, "row {} has no fields", row),
            LayoutIssue::MissingOptions { id } => {
                write!(f, "choice field '{}' has no options", id)
            }
            LayoutIssue::DuplicateLabel { label } => write!(
                f,
                "label '{}' is used more than once; conditions resolve to the first field",
                label
            ),
            LayoutIssue::InvalidNumberFormat { id, format } => {
                write!(f, "field '{}' has malformed number format '{}'", id, format)
            }
            LayoutIssue::InvalidCondition { id, message } => {
                write!(f, "field '{}' has an invalid visibility condition: {}", id, message)
            }
            LayoutIssue::CyclicCondition { id } => write!(
                f,
                "field '{}' visibility depends on itself; it will always be shown",
                id
            ),
        }
    }
}

/// Lints a schema before it is published.
pub fn check_form(form: &FormSpec) -> Vec<LayoutIssue> {
    let mut issues = Vec::new();

    for (row_idx, row) in form.rows.iter().enumerate() {
        if row.is_empty() {
            issues.push(LayoutIssue::EmptyRow { row: row_idx });
        }
    }

    let mut seen_ids = HashSet::new();
    let mut seen_labels = HashSet::new();
    let mut reported_labels = HashSet::new();
    for field in form.fields() {
        if !seen_ids.insert(&field.id) {
            issues.push(LayoutIssue::DuplicateId {
                id: field.id.clone(),
            });
        }
        if !field.label.is_empty()
            && !seen_labels.insert(field.label.as_str())
            && reported_labels.insert(field.label.as_str())
        {
            issues.push(LayoutIssue::DuplicateLabel {
                label: field.label.clone(),
            });
        }
        if field.input_type.is_choice() && field.options.iter().all(|opt| opt.trim().is_empty()) {
            issues.push(LayoutIssue::MissingOptions {
                id: field.id.clone(),
            });
        }
        if field.input_type == InputType::Number
            && field.validate_number
            && let Some(format) = &field.number_validation
            && NumberFormat::parse(format).is_none()
        {
            issues.push(LayoutIssue::InvalidNumberFormat {
                id: field.id.clone(),
                format: format.clone(),
            });
        }
        if let Some(condition) = field.active_condition()
            && let Err(err) = Expr::parse(condition, |label| form.field_by_label(label).is_some())
        {
            issues.push(LayoutIssue::InvalidCondition {
                id: field.id.clone(),
                message: err.to_string(),
            });
        }
    }

    let engine = VisibilityEngine::new(form);
    for id in engine.cyclic_fields() {
        issues.push(LayoutIssue::CyclicCondition { id: id.clone() });
    }

    issues
}
