#![allow(missing_docs)]

pub mod answers;
pub mod expr;
pub mod layout;
pub mod number_format;
pub mod reconcile;
pub mod render;
pub mod runtime;
pub mod session;
pub mod spec;
pub mod store;
pub mod submission;
pub mod validate;
pub mod visibility;

use serde_json::Value;

pub use answers::{
    AnswersError, FieldValue, FieldWarning, ValidationError, ValidationResult, ValueStore,
};
pub use expr::{Expr, ExprError, FieldLookup, Lookup};
pub use layout::{LayoutBuilder, LayoutIssue, RowTarget, assign_date_field_types, check_form};
pub use number_format::NumberFormat;
pub use reconcile::{DroppedField, ReconcileReport, reconcile};
pub use render::{
    RenderField, RenderPayload, RenderProgress, RenderRow, RenderStatus, build_render_payload,
    render_json_ui, render_text,
};
pub use runtime::{EditMode, LiveForm, RuntimeError};
pub use session::{OpenedForm, SessionError, SubmitOutcome, open_form, submit};
pub use spec::{DateFieldType, FieldId, FieldSpec, FormSpec, InputType, RowLayout, RowSpec};
pub use store::{FormStore, MemoryStore, StoreError};
pub use submission::{
    ResponseSummary, StoredField, StoredRow, Submission, SubmissionKey, summarize,
};
pub use validate::{FieldCheck, FieldState, Validator, compose_validators, validate};
pub use visibility::{VisibilityEngine, VisibilityMap, resolve_visibility};

/// JSON Schema of the form document format.
pub fn form_json_schema() -> Value {
    serde_json::to_value(schemars::schema_for!(FormSpec)).unwrap_or(Value::Null)
}

/// JSON Schema of the stored submission format.
pub fn submission_json_schema() -> Value {
    serde_json::to_value(schemars::schema_for!(Submission)).unwrap_or(Value::Null)
}
