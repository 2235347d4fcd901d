use serde_json::{Map, Value, json};

use crate::answers::FieldValue;
use crate::runtime::LiveForm;
use crate::spec::field::{DateFieldType, InputType};
use crate::spec::row::RowLayout;

/// Status labels returned by the renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// Some visible field still blocks submission.
    NeedInput,
    /// The form can be submitted.
    Complete,
}

impl RenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStatus::NeedInput => "need_input",
            RenderStatus::Complete => "complete",
        }
    }
}

/// Progress counters over visible fields.
#[derive(Debug, Clone)]
pub struct RenderProgress {
    pub answered: usize,
    pub total: usize,
}

/// Effective state of a single field for render outputs.
#[derive(Debug, Clone)]
pub struct RenderField {
    pub id: String,
    pub label: String,
    pub kind: InputType,
    pub required: bool,
    pub visible: bool,
    pub multiple: bool,
    pub options: Vec<String>,
    pub date_field_type: Option<DateFieldType>,
    pub current_value: Option<FieldValue>,
    pub errors: Vec<String>,
    pub warning: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RenderRow {
    pub layout: RowLayout,
    pub fields: Vec<RenderField>,
}

/// Collected payload used by both text and JSON renderers.
#[derive(Debug, Clone)]
pub struct RenderPayload {
    pub form_title: String,
    pub submission_id: Option<String>,
    pub status: RenderStatus,
    pub read_only: bool,
    pub progress: RenderProgress,
    pub rows: Vec<RenderRow>,
}

/// Build the renderer payload from a live form.
pub fn build_render_payload(live: &LiveForm) -> RenderPayload {
    let mut answered = 0;
    let mut total = 0;

    let rows = live
        .form()
        .rows
        .iter()
        .map(|row| RenderRow {
            layout: row.layout(),
            fields: row
                .fields
                .iter()
                .map(|field| {
                    let state = live.field_state(&field.id);
                    let visible = state.map(|state| state.visible).unwrap_or(true);
                    let current_value = live.value(&field.id).cloned();
                    if visible {
                        total += 1;
                        if current_value.as_ref().is_some_and(|value| !value.is_empty()) {
                            answered += 1;
                        }
                    }
                    RenderField {
                        id: field.id.to_string(),
                        label: field.label.clone(),
                        kind: field.input_type,
                        required: state.map(|state| state.required).unwrap_or(field.required),
                        visible,
                        multiple: field.expects_multiple(),
                        options: field.options.clone(),
                        date_field_type: field.date_field_type,
                        current_value,
                        errors: state
                            .map(|state| {
                                state
                                    .errors
                                    .iter()
                                    .map(|error| error.message.clone())
                                    .collect()
                            })
                            .unwrap_or_default(),
                        warning: state.and_then(|state| state.warning.clone()),
                    }
                })
                .collect(),
        })
        .collect::<Vec<_>>();

    let status = if live.is_valid() {
        RenderStatus::Complete
    } else {
        RenderStatus::NeedInput
    };

    RenderPayload {
        form_title: live.form().title.clone(),
        submission_id: live.submission_id().map(str::to_string),
        status,
        read_only: live.is_read_only(),
        progress: RenderProgress { answered, total },
        rows,
    }
}

/// Render the payload as a structured JSON-friendly value.
pub fn render_json_ui(payload: &RenderPayload) -> Value {
    let rows = payload
        .rows
        .iter()
        .map(|row| {
            let fields = row
                .fields
                .iter()
                .map(|field| {
                    let mut map = Map::new();
                    map.insert("id".into(), Value::String(field.id.clone()));
                    map.insert("label".into(), Value::String(field.label.clone()));
                    map.insert("type".into(), Value::String(field.kind.as_str().to_string()));
                    map.insert("required".into(), Value::Bool(field.required));
                    map.insert("visible".into(), Value::Bool(field.visible));
                    map.insert("multiple".into(), Value::Bool(field.multiple));
                    if !field.options.is_empty() {
                        map.insert(
                            "options".into(),
                            Value::Array(
                                field
                                    .options
                                    .iter()
                                    .map(|option| Value::String(option.clone()))
                                    .collect(),
                            ),
                        );
                    }
                    if let Some(position) = field.date_field_type {
                        let position = match position {
                            DateFieldType::Start => "start",
                            DateFieldType::End => "end",
                        };
                        map.insert("date_field_type".into(), Value::String(position.into()));
                    }
                    if let Some(value) = &field.current_value {
                        map.insert("current_value".into(), value.to_json());
                    }
                    if !field.errors.is_empty() {
                        map.insert(
                            "errors".into(),
                            Value::Array(
                                field
                                    .errors
                                    .iter()
                                    .map(|error| Value::String(error.clone()))
                                    .collect(),
                            ),
                        );
                    }
                    if let Some(warning) = &field.warning {
                        map.insert("warning".into(), Value::String(warning.clone()));
                    }
                    Value::Object(map)
                })
                .collect::<Vec<_>>();
            json!({
                "layout": row.layout.as_str(),
                "fields": fields,
            })
        })
        .collect::<Vec<_>>();

    json!({
        "form_title": payload.form_title,
        "submission_id": payload.submission_id,
        "status": payload.status.as_str(),
        "read_only": payload.read_only,
        "progress": {
            "answered": payload.progress.answered,
            "total": payload.progress.total,
        },
        "rows": rows,
    })
}

/// Render the payload as human-friendly text.
pub fn render_text(payload: &RenderPayload) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Form: {}", payload.form_title));
    lines.push(format!(
        "Status: {} ({}/{})",
        payload.status.as_str(),
        payload.progress.answered,
        payload.progress.total
    ));
    if let Some(id) = &payload.submission_id {
        lines.push(format!("Submission: {}", id));
    }
    if payload.read_only {
        lines.push("Read-only: enable editing to change answers.".to_string());
    }

    for (idx, row) in payload.rows.iter().enumerate() {
        let visible = row.fields.iter().filter(|field| field.visible).collect::<Vec<_>>();
        if visible.is_empty() {
            continue;
        }
        lines.push(format!("Row {} ({}):", idx + 1, row.layout.as_str()));
        for field in visible {
            let mut entry = format!(" - {} [{}]", display_label(&field.label), field.kind);
            if field.required {
                entry.push_str(" [required]");
            }
            if let Some(value) = field.current_value.as_ref().filter(|value| !value.is_empty()) {
                entry.push_str(&format!(" = {}", value.display()));
            }
            lines.push(entry);
            for error in &field.errors {
                lines.push(format!("   ! {}", error));
            }
            if let Some(warning) = &field.warning {
                lines.push(format!("   ~ {}", warning));
            }
        }
    }

    lines.join("\n")
}

fn display_label(label: &str) -> &str {
    if label.trim().is_empty() {
        "(unlabelled)"
    } else {
        label
    }
}
