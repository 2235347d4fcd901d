use std::collections::BTreeMap;

use thiserror::Error;

use crate::answers::{FieldValue, ValidationResult, ValueStore};
use crate::spec::field::FieldId;
use crate::spec::form::FormSpec;
use crate::submission::{StoredField, StoredRow, Submission, SubmissionKey};
use crate::validate::{FieldState, Validator, compose_form_validators, evaluate_fields};
use crate::visibility::{VisibilityEngine, VisibilityMap};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("form is read-only; enable editing first")]
    ReadOnly,
    #[error("field '{0}' is not part of this form")]
    UnknownField(FieldId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditMode {
    Editable,
    ReadOnly,
}

/// A schema bound to live answers.
///
/// Every write recomputes visibility, per-field state and the form-level
/// result before returning.
#[derive(Debug, Clone)]
pub struct LiveForm {
    form: FormSpec,
    validators: BTreeMap<FieldId, Vec<Validator>>,
    engine: VisibilityEngine,
    values: ValueStore,
    visibility: VisibilityMap,
    states: BTreeMap<FieldId, FieldState>,
    result: ValidationResult,
    mode: EditMode,
    submission_id: Option<String>,
    stored: bool,
}

impl LiveForm {
    /// Blank, editable form.
    pub fn new(form: FormSpec) -> Self {
        let form = form.normalized();
        let validators = compose_form_validators(&form);
        let engine = VisibilityEngine::new(&form);
        let values = ValueStore::blank_for(&form);
        let mut live = Self {
            form,
            validators,
            engine,
            values,
            visibility: VisibilityMap::new(),
            states: BTreeMap::new(),
            result: ValidationResult::default(),
            mode: EditMode::Editable,
            submission_id: None,
            stored: false,
        };
        live.recompute();
        live
    }

    pub fn form(&self) -> &FormSpec {
        &self.form
    }

    pub fn values(&self) -> &ValueStore {
        &self.values
    }

    pub fn value(&self, id: &FieldId) -> Option<&FieldValue> {
        self.values.get(id)
    }

    pub fn set_value(&mut self, id: &FieldId, value: FieldValue) -> Result<(), RuntimeError> {
        self.ensure_editable()?;
        let field = self
            .form
            .field(id)
            .ok_or_else(|| RuntimeError::UnknownField(id.clone()))?;
        let value = value.normalized_for(field);
        self.values.insert(id.clone(), value);
        self.recompute();
        Ok(())
    }

    /// Checks or unchecks one option of a multi-valued field.
    pub fn toggle_option(
        &mut self,
        id: &FieldId,
        option: &str,
        checked: bool,
    ) -> Result<(), RuntimeError> {
        self.ensure_editable()?;
        let field = self
            .form
            .field(id)
            .ok_or_else(|| RuntimeError::UnknownField(id.clone()))?;

        let current = self
            .values
            .get(id)
            .cloned()
            .unwrap_or_else(|| field.blank_value());
        let updated = if field.expects_multiple() {
            let mut items = match current.normalized_for(field) {
                FieldValue::Multi(items) => items,
                FieldValue::Scalar(_) => Vec::new(),
            };
            let position = items.iter().position(|item| item == option);
            match (checked, position) {
                (true, None) => items.push(option.to_string()),
                (false, Some(idx)) => {
                    items.remove(idx);
                }
                _ => {}
            }
            FieldValue::Multi(items)
        } else if checked {
            FieldValue::scalar(option)
        } else if current.as_scalar() == Some(option) {
            FieldValue::scalar("")
        } else {
            current
        };

        self.values.insert(id.clone(), updated);
        self.recompute();
        Ok(())
    }

    /// Loads several answers with a single recompute, ignoring the edit mode.
    pub(crate) fn load_values<I>(&mut self, values: I)
    where
        I: IntoIterator<Item = (FieldId, FieldValue)>,
    {
        for (id, value) in values {
            if let Some(field) = self.form.field(&id) {
                let value = value.normalized_for(field);
                self.values.insert(id, value);
            }
        }
        self.recompute();
    }

    pub fn disable(&mut self) {
        self.mode = EditMode::ReadOnly;
    }

    pub fn enable_editing(&mut self) {
        self.mode = EditMode::Editable;
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    pub fn is_read_only(&self) -> bool {
        self.mode == EditMode::ReadOnly
    }

    /// Identity of the stored submission this form was loaded from or saved as.
    pub fn submission_id(&self) -> Option<&str> {
        self.submission_id.as_deref()
    }

    /// Whether a submission already exists for this form's key, with or without an id.
    pub fn is_stored(&self) -> bool {
        self.stored
    }

    pub(crate) fn mark_stored(&mut self, id: Option<String>) {
        self.submission_id = id;
        self.stored = true;
    }

    pub fn validation(&self) -> &ValidationResult {
        &self.result
    }

    pub fn is_valid(&self) -> bool {
        self.result.valid
    }

    pub fn field_state(&self, id: &FieldId) -> Option<&FieldState> {
        self.states.get(id)
    }

    pub fn is_visible(&self, id: &FieldId) -> bool {
        self.visibility.get(id).copied().unwrap_or(true)
    }

    pub fn visibility(&self) -> &VisibilityMap {
        &self.visibility
    }

    /// Snapshot of the schema rows with their current answers.
    pub fn to_submission(&self, key: &SubmissionKey) -> Submission {
        let rows = self
            .form
            .rows
            .iter()
            .map(|row| StoredRow {
                fields: row
                    .fields
                    .iter()
                    .map(|field| StoredField::capture(field, self.values.get(&field.id)))
                    .collect(),
            })
            .collect();
        let mut submission = Submission::new(key, rows);
        submission.id = self.submission_id.clone();
        submission
    }

    fn ensure_editable(&self) -> Result<(), RuntimeError> {
        match self.mode {
            EditMode::Editable => Ok(()),
            EditMode::ReadOnly => Err(RuntimeError::ReadOnly),
        }
    }

    fn recompute(&mut self) {
        self.visibility = self.engine.resolve(&self.values);
        let (states, result) =
            evaluate_fields(&self.form, &self.validators, &self.visibility, &self.values);
        self.states = states;
        self.result = result;
    }
}
