//! Opening a form for a subject/occasion and submitting it back.

use thiserror::Error;
use tracing::{debug, info};

use crate::answers::ValidationResult;
use crate::reconcile::{ReconcileReport, reconcile};
use crate::runtime::LiveForm;
use crate::store::{FormStore, StoreError};
use crate::submission::SubmissionKey;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("form is read-only; enable editing before submitting")]
    ReadOnly,
    #[error(
        "form is not valid: {} error(s), {} missing required field(s), {} unknown field(s)",
        .0.errors.len(),
        .0.missing_required.len(),
        .0.unknown_fields.len()
    )]
    Invalid(ValidationResult),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Created(String),
    Updated(String),
}

impl SubmitOutcome {
    pub fn submission_id(&self) -> &str {
        match self {
            SubmitOutcome::Created(id) | SubmitOutcome::Updated(id) => id,
        }
    }
}

/// A live form plus the reconciliation report when a prior submission existed.
#[derive(Debug, Clone)]
pub struct OpenedForm {
    pub live: LiveForm,
    pub report: Option<ReconcileReport>,
}

/// Loads the schema for `key` and reconciles any stored submission into it.
pub fn open_form<S>(store: &S, key: &SubmissionKey) -> Result<OpenedForm, SessionError>
where
    S: FormStore + ?Sized,
{
    let form = store.fetch_form_schema(&key.form_id)?;
    let mut live = LiveForm::new(form);
    let report = match store.fetch_submission(key)? {
        Some(submission) => {
            let report = reconcile(&mut live, &submission);
            debug!(
                %key,
                matched = report.matched(),
                dropped = report.dropped.len(),
                "reconciled stored submission"
            );
            Some(report)
        }
        None => None,
    };
    Ok(OpenedForm { live, report })
}

/// Saves the live answers; the first submit creates, later ones update.
pub fn submit<S>(
    store: &mut S,
    live: &mut LiveForm,
    key: &SubmissionKey,
) -> Result<SubmitOutcome, SessionError>
where
    S: FormStore + ?Sized,
{
    if live.is_read_only() {
        return Err(SessionError::ReadOnly);
    }
    if !live.is_valid() {
        return Err(SessionError::Invalid(live.validation().clone()));
    }

    let submission = live.to_submission(key);
    let outcome = if live.is_stored() {
        let id = store.update_answers(submission)?;
        info!(%key, submission = id.as_str(), "updated submission");
        SubmitOutcome::Updated(id)
    } else {
        let id = store.submit_answers(submission)?;
        info!(%key, submission = id.as_str(), "created submission");
        SubmitOutcome::Created(id)
    };

    live.mark_stored(Some(outcome.submission_id().to_string()));
    live.disable();
    Ok(outcome)
}
