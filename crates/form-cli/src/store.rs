use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use form_spec::store::assign_submission_id;
use form_spec::{FormSpec, FormStore, StoreError, Submission, SubmissionKey};
use serde::Serialize;
use tracing::debug;

/// JSON documents under a data directory:
/// `forms/<form>.form.json` and `submissions/<form>/<subject>/<occasion>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn form_path(&self, form_id: &str) -> Result<PathBuf, StoreError> {
        let segment = checked_segment(form_id)?;
        Ok(self
            .root
            .join("forms")
            .join(format!("{}.form.json", segment)))
    }

    fn submissions_dir(&self, form_id: &str) -> Result<PathBuf, StoreError> {
        Ok(self.root.join("submissions").join(checked_segment(form_id)?))
    }

    fn submission_path(&self, key: &SubmissionKey) -> Result<PathBuf, StoreError> {
        Ok(self
            .submissions_dir(&key.form_id)?
            .join(checked_segment(&key.subject_id)?)
            .join(format!("{}.json", checked_segment(&key.occasion_id)?)))
    }
}

/// Ids become path segments, so anything that could escape the directory is refused.
fn checked_segment(value: &str) -> Result<&str, StoreError> {
    let trimmed = value.trim();
    let unsafe_segment = trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || trimmed.contains(['/', '\\'])
        || trimmed != value;
    if unsafe_segment {
        return Err(StoreError::Io(io::Error::new(
            ErrorKind::InvalidInput,
            format!("'{}' cannot be used as a storage id", value),
        )));
    }
    Ok(value)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    fs::write(path, text)?;
    debug!(path = %path.display(), "wrote document");
    Ok(())
}

fn read_submission(path: &Path) -> Result<Option<Submission>, StoreError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

impl FormStore for FileStore {
    fn fetch_form_schema(&self, form_id: &str) -> Result<FormSpec, StoreError> {
        let path = self.form_path(form_id)?;
        match fs::read_to_string(&path) {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(StoreError::FormNotFound(form_id.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn persist_schema(&mut self, form_id: &str, form: &FormSpec) -> Result<(), StoreError> {
        write_json(&self.form_path(form_id)?, form)
    }

    fn delete_schema(&mut self, form_id: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.form_path(form_id)?) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(StoreError::FormNotFound(form_id.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn fetch_submission(&self, key: &SubmissionKey) -> Result<Option<Submission>, StoreError> {
        read_submission(&self.submission_path(key)?)
    }

    fn submit_answers(&mut self, mut submission: Submission) -> Result<String, StoreError> {
        let key = submission.key();
        let path = self.submission_path(&key)?;
        if path.exists() {
            return Err(StoreError::AlreadySubmitted(key));
        }
        let id = assign_submission_id(&mut submission);
        write_json(&path, &submission)?;
        Ok(id)
    }

    fn update_answers(&mut self, mut submission: Submission) -> Result<String, StoreError> {
        let key = submission.key();
        let path = self.submission_path(&key)?;
        let Some(existing) = read_submission(&path)? else {
            return Err(StoreError::SubmissionNotFound(key));
        };
        if submission.id.is_none() {
            submission.id = existing.id;
        }
        let id = assign_submission_id(&mut submission);
        write_json(&path, &submission)?;
        Ok(id)
    }

    fn list_submissions(&self, form_id: &str) -> Result<Vec<Submission>, StoreError> {
        let dir = self.submissions_dir(form_id)?;
        let subjects = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut paths = Vec::new();
        for subject in subjects {
            let subject = subject?.path();
            if !subject.is_dir() {
                continue;
            }
            for occasion in fs::read_dir(&subject)? {
                let occasion = occasion?.path();
                if occasion.extension().is_some_and(|ext| ext == "json") {
                    paths.push(occasion);
                }
            }
        }
        paths.sort();

        let mut submissions = Vec::with_capacity(paths.len());
        for path in paths {
            if let Some(submission) = read_submission(&path)? {
                submissions.push(submission);
            }
        }
        Ok(submissions)
    }
}
