use std::collections::BTreeMap;

use thiserror::Error;
use uuid::Uuid;

use crate::spec::form::FormSpec;
use crate::submission::{Submission, SubmissionKey};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("form '{0}' not found")]
    FormNotFound(String),
    #[error("no submission stored for {0}")]
    SubmissionNotFound(SubmissionKey),
    #[error("a submission already exists for {0}")]
    AlreadySubmitted(SubmissionKey),
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persistence boundary for schemas and submissions, keyed by opaque ids.
pub trait FormStore {
    fn fetch_form_schema(&self, form_id: &str) -> Result<FormSpec, StoreError>;

    fn persist_schema(&mut self, form_id: &str, form: &FormSpec) -> Result<(), StoreError>;

    fn delete_schema(&mut self, form_id: &str) -> Result<(), StoreError>;

    fn fetch_submission(&self, key: &SubmissionKey) -> Result<Option<Submission>, StoreError>;

    /// Stores a first submission for its key and returns the assigned id.
    fn submit_answers(&mut self, submission: Submission) -> Result<String, StoreError>;

    /// Replaces the submission stored under the same key and returns its id,
    /// assigning one when neither document carries it.
    fn update_answers(&mut self, submission: Submission) -> Result<String, StoreError>;

    fn list_submissions(&self, form_id: &str) -> Result<Vec<Submission>, StoreError>;
}

/// Allocates a store id unless the submission already carries one.
pub fn assign_submission_id(submission: &mut Submission) -> String {
    submission
        .id
        .get_or_insert_with(|| Uuid::new_v4().to_string())
        .clone()
}

/// In-process store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    forms: BTreeMap<String, FormSpec>,
    submissions: BTreeMap<SubmissionKey, Submission>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_form(mut self, form_id: impl Into<String>, form: FormSpec) -> Self {
        self.forms.insert(form_id.into(), form);
        self
    }

    /// Seeds a stored document as-is, id or not.
    pub fn with_submission(mut self, submission: Submission) -> Self {
        self.submissions.insert(submission.key(), submission);
        self
    }
}

impl FormStore for MemoryStore {
    fn fetch_form_schema(&self, form_id: &str) -> Result<FormSpec, StoreError> {
        self.forms
            .get(form_id)
            .cloned()
            .ok_or_else(|| StoreError::FormNotFound(form_id.to_string()))
    }

    fn persist_schema(&mut self, form_id: &str, form: &FormSpec) -> Result<(), StoreError> {
        self.forms.insert(form_id.to_string(), form.clone());
        Ok(())
    }

    fn delete_schema(&mut self, form_id: &str) -> Result<(), StoreError> {
        self.forms
            .remove(form_id)
            .map(|_| ())
            .ok_or_else(|| StoreError::FormNotFound(form_id.to_string()))
    }

    fn fetch_submission(&self, key: &SubmissionKey) -> Result<Option<Submission>, StoreError> {
        Ok(self.submissions.get(key).cloned())
    }

    fn submit_answers(&mut self, mut submission: Submission) -> Result<String, StoreError> {
        let key = submission.key();
        if self.submissions.contains_key(&key) {
            return Err(StoreError::AlreadySubmitted(key));
        }
        let id = assign_submission_id(&mut submission);
        self.submissions.insert(key, submission);
        Ok(id)
    }

    fn update_answers(&mut self, mut submission: Submission) -> Result<String, StoreError> {
        let key = submission.key();
        let Some(existing) = self.submissions.get(&key) else {
            return Err(StoreError::SubmissionNotFound(key));
        };
        if submission.id.is_none() {
            submission.id = existing.id.clone();
        }
        let id = assign_submission_id(&mut submission);
        self.submissions.insert(key, submission);
        Ok(id)
    }

    fn list_submissions(&self, form_id: &str) -> Result<Vec<Submission>, StoreError> {
        Ok(self
            .submissions
            .values()
            .filter(|submission| submission.form_id == form_id)
            .cloned()
            .collect())
    }
}
