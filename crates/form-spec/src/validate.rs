use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use tracing::warn;

use crate::answers::{FieldValue, FieldWarning, ValidationError, ValidationResult, ValueStore};
use crate::number_format::NumberFormat;
use crate::spec::field::{DateFieldType, FieldId, FieldSpec, InputType};
use crate::spec::form::FormSpec;
use crate::spec::row::RowSpec;
use crate::visibility::{VisibilityEngine, VisibilityMap};

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
});

pub const REQUIRED: &str = "required";

/// One rule applied to a field's value.
#[derive(Debug, Clone, PartialEq)]
pub enum Validator {
    Required,
    Email,
    MinLength(usize),
    RequiredTrue,
    NumberFormat { format: NumberFormat, soft: bool },
    DateOrder { position: DateFieldType, sibling: FieldId },
}

/// Ordered validators for `field`, which sits in `row`.
pub fn compose_validators(field: &FieldSpec, row: &RowSpec) -> Vec<Validator> {
    let mut validators = Vec::new();

    if field.required {
        validators.push(Validator::Required);
    }

    match field.input_type {
        InputType::Email => validators.push(Validator::Email),
        InputType::Text if field.required => validators.push(Validator::MinLength(3)),
        InputType::Password if field.required => validators.push(Validator::MinLength(6)),
        InputType::Checkbox if field.required => validators.push(Validator::RequiredTrue),
        _ => {}
    }

    if field.input_type == InputType::Number
        && field.validate_number
        && let Some(spec) = &field.number_validation
    {
        match NumberFormat::parse(spec) {
            Some(format) => validators.push(Validator::NumberFormat {
                format,
                soft: field.soft_validation,
            }),
            None => warn!(field = %field.id, format = spec.as_str(), "ignoring malformed number format"),
        }
    }

    if let Some(position) = field.date_field_type {
        let wanted = match position {
            DateFieldType::Start => DateFieldType::End,
            DateFieldType::End => DateFieldType::Start,
        };
        if let Some(sibling) = row
            .fields
            .iter()
            .find(|other| other.date_field_type == Some(wanted))
        {
            validators.push(Validator::DateOrder {
                position,
                sibling: sibling.id.clone(),
            });
        }
    }

    validators
}

/// Validators of every field in the form, keyed by field id.
pub fn compose_form_validators(form: &FormSpec) -> BTreeMap<FieldId, Vec<Validator>> {
    form.rows
        .iter()
        .flat_map(|row| {
            row.fields
                .iter()
                .map(move |field| (field.id.clone(), compose_validators(field, row)))
        })
        .collect()
}

/// Outcome of running one field's validators.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FieldCheck {
    pub errors: Vec<ValidationError>,
    pub warning: Option<String>,
}

impl FieldCheck {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn is_missing(&self) -> bool {
        self.errors.iter().any(|error| error.code == REQUIRED)
    }
}

/// Runs `validators` in order; a failed presence check ends the chain.
pub fn run_validators<'a, S>(
    field_id: &FieldId,
    validators: &[Validator],
    value: Option<&FieldValue>,
    sibling: S,
) -> FieldCheck
where
    S: Fn(&FieldId) -> Option<&'a FieldValue>,
{
    let mut check = FieldCheck::default();
    let present = value.filter(|value| !value.is_empty());

    for validator in validators {
        match validator {
            Validator::Required => {
                if present.is_none() {
                    check
                        .errors
                        .push(ValidationError::new(field_id, REQUIRED, "This field is required"));
                    return check;
                }
            }
            Validator::Email => {
                if let Some(text) = present.map(FieldValue::display)
                    && !EMAIL.is_match(text.trim())
                {
                    check.errors.push(ValidationError::new(
                        field_id,
                        "email",
                        "Enter a valid email address",
                    ));
                }
            }
            Validator::MinLength(min) => {
                if let Some(text) = present.map(FieldValue::display)
                    && text.chars().count() < *min
                {
                    check.errors.push(ValidationError::new(
                        field_id,
                        "min_length",
                        format!("Enter at least {} characters", min),
                    ));
                }
            }
            Validator::RequiredTrue => {
                let selected = match present {
                    Some(FieldValue::Multi(items)) => !items.is_empty(),
                    Some(FieldValue::Scalar(text)) => text.trim().eq_ignore_ascii_case("true"),
                    None => false,
                };
                if !selected {
                    check.errors.push(ValidationError::new(
                        field_id,
                        "required_true",
                        "Select at least one option",
                    ));
                }
            }
            Validator::NumberFormat { format, soft } => {
                if let Some(text) = present.map(FieldValue::display)
                    && !format.matches(&text)
                {
                    if *soft {
                        check.warning = Some(format.mismatch_message());
                    } else {
                        check.errors.push(ValidationError::new(
                            field_id,
                            "number_format",
                            format.mismatch_message(),
                        ));
                    }
                }
            }
            Validator::DateOrder { position, sibling: sibling_id } => {
                let own = present.and_then(parse_date);
                let other = sibling(sibling_id)
                    .filter(|value| !value.is_empty())
                    .and_then(parse_date);
                if let (Some(own), Some(other)) = (own, other) {
                    match position {
                        DateFieldType::Start if own > other => {
                            check.errors.push(ValidationError::new(
                                field_id,
                                "start_after_end",
                                "Start date cannot be after the end date",
                            ));
                        }
                        DateFieldType::End if own < other => {
                            check.errors.push(ValidationError::new(
                                field_id,
                                "end_before_start",
                                "End date cannot be before the start date",
                            ));
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    check
}

fn parse_date(value: &FieldValue) -> Option<NaiveDate> {
    let text = value.as_scalar()?.trim();
    let date = text.split_once('T').map_or(text, |(date, _)| date);
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// Derived state of one field after a recompute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldState {
    pub visible: bool,
    /// Whether the field's validators are currently enforced.
    pub required: bool,
    pub errors: Vec<ValidationError>,
    pub warning: Option<String>,
}

impl FieldState {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Checks every visible field; hidden fields carry no validators.
pub(crate) fn evaluate_fields(
    form: &FormSpec,
    validators: &BTreeMap<FieldId, Vec<Validator>>,
    visibility: &VisibilityMap,
    values: &ValueStore,
) -> (BTreeMap<FieldId, FieldState>, ValidationResult) {
    let is_visible = |id: &FieldId| visibility.get(id).copied().unwrap_or(true);
    let visible_value = |id: &FieldId| {
        if is_visible(id) {
            values.get(id)
        } else {
            None
        }
    };

    let mut states = BTreeMap::new();
    let mut result = ValidationResult::default();

    for field in form.fields() {
        let visible = is_visible(&field.id);
        let check = if visible {
            let rules = validators.get(&field.id).map(Vec::as_slice).unwrap_or(&[]);
            run_validators(&field.id, rules, values.get(&field.id), visible_value)
        } else {
            FieldCheck::default()
        };

        for error in &check.errors {
            if error.code == REQUIRED {
                result.missing_required.push(field.id.clone());
            } else {
                result.errors.push(error.clone());
            }
        }
        if let Some(message) = &check.warning {
            result.warnings.push(FieldWarning {
                field_id: field.id.clone(),
                message: message.clone(),
            });
        }

        states.insert(
            field.id.clone(),
            FieldState {
                visible,
                required: visible && field.required,
                errors: check.errors,
                warning: check.warning,
            },
        );
    }

    result.unknown_fields = values
        .iter()
        .map(|(id, _)| id)
        .filter(|id| form.field(id).is_none())
        .cloned()
        .collect();
    result.valid = result.errors.is_empty()
        && result.missing_required.is_empty()
        && result.unknown_fields.is_empty();

    (states, result)
}

/// Validates an answer set against a schema; hidden fields are skipped.
pub fn validate(form: &FormSpec, values: &ValueStore) -> ValidationResult {
    let form = form.clone().normalized();
    let visibility = VisibilityEngine::new(&form).resolve(values);
    let validators = compose_form_validators(&form);
    evaluate_fields(&form, &validators, &visibility, values).1
}
