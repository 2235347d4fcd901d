use serde_json::json;

use form_spec::{
    FieldId, FieldValue, FormSpec, InputType, LiveForm, RuntimeError, Submission, reconcile,
    summarize,
};

fn checkbox_form() -> FormSpec {
    serde_json::from_value(json!({
        "title": "Symptoms",
        "rows": [{
            "fields": [
                { "id": "nid", "label": "Symptoms", "inputType": "checkbox", "options": ["a", "b"] },
                { "id": "notes", "label": "Notes", "inputType": "text" }
            ]
        }]
    }))
    .expect("deserialize")
}

fn submission(fields: serde_json::Value) -> Submission {
    serde_json::from_value(json!({
        "id": "sub-1",
        "formId": "f1",
        "patientId": "p1",
        "timepointId": "t1",
        "rows": [{ "fields": fields }]
    }))
    .expect("deserialize submission")
}

#[test]
fn matches_stored_values_by_id() {
    let mut live = LiveForm::new(checkbox_form());
    let stored = submission(json!([
        { "id": "nid", "label": "Renamed", "inputType": "checkbox", "value": ["a"] }
    ]));

    let report = reconcile(&mut live, &stored);
    assert_eq!(report.by_id, vec![FieldId::from("nid")]);
    assert!(report.dropped.is_empty());
    assert_eq!(
        live.value(&FieldId::from("nid")),
        Some(&FieldValue::multi(["a"]))
    );
    assert!(live.is_read_only());
    assert_eq!(live.submission_id(), Some("sub-1"));
}

#[test]
fn falls_back_to_label_and_type() {
    let mut live = LiveForm::new(checkbox_form());
    let stored = submission(json!([
        { "label": "Notes", "inputType": "text", "value": "coughing at night" },
        { "label": "Notes", "inputType": "textarea", "value": "wrong type" }
    ]));

    let report = reconcile(&mut live, &stored);
    assert_eq!(report.by_label, vec![FieldId::from("notes")]);
    assert_eq!(report.dropped.len(), 1);
    assert_eq!(report.dropped[0].input_type, InputType::Textarea);
    assert_eq!(
        live.value(&FieldId::from("notes")),
        Some(&FieldValue::scalar("coughing at night"))
    );
}

#[test]
fn id_matches_are_claimed_before_label_fallback() {
    let form: FormSpec = serde_json::from_value(json!({
        "title": "Twins",
        "rows": [{
            "fields": [
                { "id": "first", "label": "Dose", "inputType": "text" },
                { "id": "second", "label": "Dose", "inputType": "text" }
            ]
        }]
    }))
    .expect("deserialize");
    let mut live = LiveForm::new(form);
    let stored = submission(json!([
        { "label": "Dose", "inputType": "text", "value": "by label" },
        { "id": "first", "label": "Dose", "inputType": "text", "value": "by id" }
    ]));

    let report = reconcile(&mut live, &stored);
    assert_eq!(report.by_id, vec![FieldId::from("first")]);
    assert_eq!(report.by_label, vec![FieldId::from("second")]);
    assert_eq!(
        live.value(&FieldId::from("first")),
        Some(&FieldValue::scalar("by id"))
    );
    assert_eq!(
        live.value(&FieldId::from("second")),
        Some(&FieldValue::scalar("by label"))
    );
}

#[test]
fn stored_shapes_are_normalized_for_the_live_control() {
    let mut live = LiveForm::new(checkbox_form());
    let stored = submission(json!([
        { "id": "nid", "label": "Symptoms", "inputType": "checkbox", "value": "b" },
        { "id": "notes", "label": "Notes", "inputType": "text", "value": ["single"] }
    ]));

    reconcile(&mut live, &stored);
    assert_eq!(
        live.value(&FieldId::from("nid")),
        Some(&FieldValue::multi(["b"]))
    );
    assert_eq!(
        live.value(&FieldId::from("notes")),
        Some(&FieldValue::scalar("single"))
    );
}

#[test]
fn unknown_stored_ids_fall_back_then_drop() {
    let mut live = LiveForm::new(checkbox_form());
    let stored = submission(json!([
        { "id": "old-id", "label": "Notes", "inputType": "text", "value": "kept" },
        { "id": "gone", "label": "Removed question", "inputType": "radio", "value": "x" }
    ]));

    let report = reconcile(&mut live, &stored);
    assert_eq!(report.by_label, vec![FieldId::from("notes")]);
    assert_eq!(report.dropped.len(), 1);
    assert_eq!(report.dropped[0].label, "Removed question");
    assert_eq!(report.matched(), 1);
}

#[test]
fn reconciled_form_is_read_only_until_editing_is_enabled() {
    let mut live = LiveForm::new(checkbox_form());
    reconcile(
        &mut live,
        &submission(json!([{ "id": "notes", "label": "Notes", "inputType": "text", "value": "x" }])),
    );

    let notes = FieldId::from("notes");
    assert_eq!(
        live.set_value(&notes, FieldValue::scalar("y")),
        Err(RuntimeError::ReadOnly)
    );

    live.enable_editing();
    live.set_value(&notes, FieldValue::scalar("y")).expect("editable");
    assert_eq!(live.value(&notes), Some(&FieldValue::scalar("y")));
    assert_eq!(live.submission_id(), Some("sub-1"));
}

#[test]
fn summarize_tabulates_by_label_with_placeholders() {
    let form = checkbox_form();
    let submissions = vec![
        submission(json!([
            { "id": "nid", "label": "Symptoms", "inputType": "checkbox", "value": ["a", "b"] }
        ])),
        submission(json!([
            { "label": "Notes", "inputType": "text", "value": "fine" },
            { "id": "nid", "label": "Symptoms", "inputType": "checkbox", "value": [] }
        ])),
    ];

    let table = summarize(&form, &submissions);
    assert_eq!(table.len(), 2);
    assert_eq!(table[0].answers["Symptoms"], "a, b");
    assert_eq!(table[0].answers["Notes"], "N/A");
    assert_eq!(table[1].answers["Symptoms"], "N/A");
    assert_eq!(table[1].answers["Notes"], "fine");
    assert_eq!(table[0].subject_id, "p1");
}
