//! Maps a stored submission back onto the live controls of a schema.

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use crate::answers::FieldValue;
use crate::runtime::LiveForm;
use crate::spec::field::{FieldId, InputType};
use crate::submission::{StoredField, Submission};

/// Stored field that matched nothing in the live schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedField {
    pub id: Option<FieldId>,
    pub label: String,
    pub input_type: InputType,
}

impl DroppedField {
    fn from_stored(stored: &StoredField) -> Self {
        Self {
            id: stored.id.clone(),
            label: stored.label.clone(),
            input_type: stored.input_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ReconcileReport {
    /// Live fields matched through their stable id.
    pub by_id: Vec<FieldId>,
    /// Live fields matched through `(inputType, label)`.
    pub by_label: Vec<FieldId>,
    pub dropped: Vec<DroppedField>,
}

impl ReconcileReport {
    pub fn matched(&self) -> usize {
        self.by_id.len() + self.by_label.len()
    }
}

/// Loads `submission` into `live` and leaves the form read-only.
pub fn reconcile(live: &mut LiveForm, submission: &Submission) -> ReconcileReport {
    let stored: Vec<&StoredField> = submission.fields().collect();
    let mut assigned: Vec<Option<FieldId>> = vec![None; stored.len()];
    let mut claimed: HashSet<FieldId> = HashSet::new();
    let mut report = ReconcileReport::default();

    for (idx, field) in stored.iter().enumerate() {
        if let Some(id) = &field.id
            && live.form().field(id).is_some()
            && claimed.insert(id.clone())
        {
            assigned[idx] = Some(id.clone());
            report.by_id.push(id.clone());
        }
    }

    for (idx, field) in stored.iter().enumerate() {
        if assigned[idx].is_some() {
            continue;
        }
        let fallback = live
            .form()
            .fields()
            .find(|live_field| {
                live_field.input_type == field.input_type
                    && live_field.label == field.label
                    && !claimed.contains(&live_field.id)
            })
            .map(|live_field| live_field.id.clone());
        match fallback {
            Some(id) => {
                claimed.insert(id.clone());
                report.by_label.push(id.clone());
                assigned[idx] = Some(id);
            }
            None => {
                debug!(
                    label = field.label.as_str(),
                    input_type = %field.input_type,
                    "stored answer matches no live field; dropped"
                );
                report.dropped.push(DroppedField::from_stored(field));
            }
        }
    }

    let values = stored
        .iter()
        .zip(assigned)
        .filter_map(|(field, id)| {
            let id = id?;
            let value = field
                .value
                .clone()
                .unwrap_or_else(|| FieldValue::scalar(""));
            Some((id, value))
        })
        .collect::<Vec<_>>();
    live.load_values(values);
    live.mark_stored(submission.id.clone());
    live.disable();

    report
}
