use std::collections::HashSet;

use serde_json::json;

use form_spec::{
    DateFieldType, FieldSpec, FormSpec, InputType, LayoutBuilder, LayoutIssue, RowLayout,
    RowSpec, RowTarget, assign_date_field_types, check_form,
};

fn date(validated: bool) -> FieldSpec {
    let mut field = FieldSpec::new(InputType::Date);
    field.date_validation = validated;
    field
}

fn tags(row: &RowSpec) -> Vec<Option<DateFieldType>> {
    row.fields.iter().map(|field| field.date_field_type).collect()
}

#[test]
fn insert_field_targets_new_and_existing_rows() {
    let mut builder = LayoutBuilder::new("Visit");
    let first = builder
        .insert_field(RowTarget::NewRow, InputType::Text)
        .expect("new row");
    let second = builder
        .insert_field(RowTarget::Existing(0), InputType::Number)
        .expect("existing row");

    let form = builder.form();
    assert_eq!(form.rows.len(), 1);
    assert_eq!(form.rows[0].fields[0].id, first);
    assert_eq!(form.rows[0].fields[1].id, second);
    assert_eq!(form.rows[0].fields[1].input_type, InputType::Number);

    assert!(builder
        .insert_field(RowTarget::Existing(5), InputType::Text)
        .is_none());
    assert_eq!(builder.form().field_count(), 2);
}

#[test]
fn add_buttons_insert_default_text_fields() {
    let mut builder = LayoutBuilder::new("Visit");
    builder.add_new_row();
    let id = builder.add_field(0).expect("field added");

    let form = builder.form();
    assert_eq!(form.rows[0].len(), 2);
    assert_eq!(form.field(&id).map(|field| field.input_type), Some(InputType::Text));
    assert!(builder.clone().add_field(3).is_none());
}

#[test]
fn removing_the_last_field_of_a_row_removes_the_row() {
    let mut builder = LayoutBuilder::new("Visit");
    builder.add_new_row();
    let middle = builder.add_new_row();
    let last = builder.add_new_row();
    builder.add_field(2);

    assert!(builder.remove_field(1, 0));
    let form = builder.form();
    assert_eq!(form.rows.len(), 2);
    assert!(form.field(&middle).is_none());
    assert_eq!(form.rows[1].fields[0].id, last);

    assert!(builder.remove_field(1, 0));
    assert_eq!(builder.form().rows.len(), 2);
    assert_eq!(builder.form().rows[1].len(), 1);
}

#[test]
fn out_of_range_indices_are_no_ops() {
    let mut builder = LayoutBuilder::new("Visit");
    builder.add_new_row();
    let before = builder.form().clone();

    assert!(!builder.remove_field(0, 4));
    assert!(!builder.remove_field(3, 0));
    assert!(!builder.remove_row(9));
    assert!(!builder.reorder_within_row(0, 2, 0));
    assert!(!builder.change_field_type(1, 0, InputType::Date));
    assert!(!builder.set_label(0, 1, "Nope"));
    assert!(!builder.set_option(0, 0, 0, "missing"));
    assert!(!builder.remove_option(0, 0, 0));

    assert_eq!(builder.form(), &before);
}

#[test]
fn reorder_moves_within_row_and_clamps_target() {
    let mut builder = LayoutBuilder::new("Visit");
    let a = builder.add_new_row();
    let b = builder.add_field(0).expect("b");
    let c = builder.add_field(0).expect("c");

    assert!(builder.reorder_within_row(0, 0, 10));
    let ids: Vec<_> = builder.form().rows[0]
        .fields
        .iter()
        .map(|field| field.id.clone())
        .collect();
    assert_eq!(ids, vec![b.clone(), c.clone(), a.clone()]);

    assert!(builder.reorder_within_row(0, 2, 1));
    let ids: Vec<_> = builder.form().rows[0]
        .fields
        .iter()
        .map(|field| field.id.clone())
        .collect();
    assert_eq!(ids, vec![b, a, c]);
}

#[test]
fn exactly_two_validated_dates_are_tagged_start_and_end() {
    let mut none = RowSpec::new(vec![date(false), date(false)]);
    assign_date_field_types(&mut none);
    assert_eq!(tags(&none), vec![None, None]);

    let mut one = RowSpec::new(vec![date(true), FieldSpec::new(InputType::Text)]);
    assign_date_field_types(&mut one);
    assert_eq!(tags(&one), vec![None, None]);

    let mut two = RowSpec::new(vec![date(true), FieldSpec::new(InputType::Text), date(true)]);
    assign_date_field_types(&mut two);
    assert_eq!(
        tags(&two),
        vec![Some(DateFieldType::Start), None, Some(DateFieldType::End)]
    );

    let mut three = RowSpec::new(vec![date(true), date(true), date(true)]);
    assign_date_field_types(&mut three);
    assert_eq!(tags(&three), vec![None, None, None]);
}

#[test]
fn date_assignment_is_idempotent() {
    let mut row = RowSpec::new(vec![date(true), date(true)]);
    assign_date_field_types(&mut row);
    let once = row.clone();
    assign_date_field_types(&mut row);
    assert_eq!(row, once);
}

#[test]
fn structural_edits_rerun_date_assignment() {
    let mut builder = LayoutBuilder::new("Visit");
    builder.insert_field(RowTarget::NewRow, InputType::Date);
    builder.insert_field(RowTarget::Existing(0), InputType::Date);
    assert!(builder.set_date_validation(0, 0, true));
    assert_eq!(tags(&builder.form().rows[0]), vec![None, None]);

    assert!(builder.set_date_validation(0, 1, true));
    assert_eq!(
        tags(&builder.form().rows[0]),
        vec![Some(DateFieldType::Start), Some(DateFieldType::End)]
    );

    assert!(builder.reorder_within_row(0, 1, 0));
    assert_eq!(
        tags(&builder.form().rows[0]),
        vec![Some(DateFieldType::Start), Some(DateFieldType::End)]
    );

    builder.insert_field(RowTarget::Existing(0), InputType::Date);
    assert!(builder.set_date_validation(0, 2, true));
    assert_eq!(tags(&builder.form().rows[0]), vec![None, None, None]);

    assert!(builder.change_field_type(0, 2, InputType::Text));
    assert_eq!(
        tags(&builder.form().rows[0]),
        vec![Some(DateFieldType::Start), Some(DateFieldType::End), None]
    );

    assert!(builder.remove_field(0, 0));
    assert_eq!(tags(&builder.form().rows[0]), vec![None, None]);
}

#[test]
fn loading_a_schema_rederives_stale_date_tags() {
    let form: FormSpec = serde_json::from_value(json!({
        "title": "Stale",
        "rows": [{
            "fields": [
                { "label": "Only", "inputType": "date", "dateValidation": true, "dateFieldType": "start" },
                { "label": "Note", "inputType": "text", "dateFieldType": "end" }
            ]
        }]
    }))
    .expect("deserialize");

    let builder = LayoutBuilder::from_form(form);
    assert_eq!(tags(&builder.form().rows[0]), vec![None, None]);
}

#[test]
fn changing_type_resets_choice_options_and_multiple_selection() {
    let mut builder = LayoutBuilder::new("Visit");
    builder.insert_field(RowTarget::NewRow, InputType::Dropdown);
    assert!(builder.add_option(0, 0));
    assert!(builder.set_option(0, 0, 0, "Yes"));
    assert!(builder.set_allow_multiple_selection(0, 0, true));

    assert!(builder.change_field_type(0, 0, InputType::Dropdown));
    let field = &builder.form().rows[0].fields[0];
    assert_eq!(field.options, vec!["Yes".to_string()]);
    assert!(field.allow_multiple_selection);

    assert!(builder.change_field_type(0, 0, InputType::Radio));
    let field = &builder.form().rows[0].fields[0];
    assert!(field.options.is_empty());
    assert!(!field.allow_multiple_selection);

    assert!(!builder.set_allow_multiple_selection(0, 0, true));
    assert!(!builder.form().rows[0].fields[0].allow_multiple_selection);
}

#[test]
fn option_edits_follow_indices() {
    let mut builder = LayoutBuilder::new("Visit");
    builder.insert_field(RowTarget::NewRow, InputType::Checkbox);
    builder.add_option(0, 0);
    builder.add_option(0, 0);
    builder.set_option(0, 0, 0, "cough");
    builder.set_option(0, 0, 1, "fever");

    assert!(builder.remove_option(0, 0, 0));
    assert_eq!(builder.form().rows[0].fields[0].options, vec!["fever".to_string()]);
}

#[test]
fn property_setters_keep_flags_in_step() {
    let mut builder = LayoutBuilder::new("Visit");
    builder.insert_field(RowTarget::NewRow, InputType::Number);
    builder.set_label(0, 0, "Weight");
    builder.set_required(0, 0, true);
    builder.set_number_validation(0, 0, Some("3.2".into()));
    builder.set_soft_validation(0, 0, true);
    builder.set_visibility_condition(0, 0, Some("'Gender' == 'Male'".into()));

    let field = &builder.form().rows[0].fields[0];
    assert_eq!(field.label, "Weight");
    assert!(field.required);
    assert!(field.validate_number);
    assert_eq!(field.number_validation.as_deref(), Some("3.2"));
    assert!(field.soft_validation);
    assert!(field.has_visibility_condition);

    builder.set_number_validation(0, 0, None);
    builder.set_visibility_condition(0, 0, None);
    let field = &builder.form().rows[0].fields[0];
    assert!(!field.validate_number);
    assert!(!field.has_visibility_condition);
    assert!(field.visibility_condition.is_none());
}

#[test]
fn reset_clears_title_and_rows() {
    let mut builder = LayoutBuilder::new("Visit");
    builder.add_new_row();
    builder.set_title("Follow-up");
    assert_eq!(builder.form().title, "Follow-up");

    builder.reset();
    assert_eq!(builder.form(), &FormSpec::default());
}

#[test]
fn row_layout_follows_field_count() {
    let mut builder = LayoutBuilder::new("Visit");
    builder.add_new_row();
    assert_eq!(builder.form().rows[0].layout(), RowLayout::Single);
    builder.add_field(0);
    assert_eq!(builder.form().rows[0].layout(), RowLayout::Pair);
    builder.add_field(0);
    assert_eq!(builder.form().rows[0].layout(), RowLayout::Wide);
}

#[test]
fn fresh_fields_get_distinct_ids_that_survive_serialization() {
    let mut builder = LayoutBuilder::new("Visit");
    for _ in 0..5 {
        builder.add_new_row();
    }
    let ids: HashSet<_> = builder.form().fields().map(|field| field.id.clone()).collect();
    assert_eq!(ids.len(), 5);

    let text = serde_json::to_string(builder.form()).expect("serialize");
    let restored: FormSpec = serde_json::from_str(&text).expect("deserialize");
    assert_eq!(&restored, builder.form());
}

#[test]
fn legacy_field_names_are_accepted() {
    let form: FormSpec = serde_json::from_value(json!({
        "title": "Legacy",
        "additionalFields": [{
            "fields": [{ "label": "Name", "inputType": "text", "isrequired": true }]
        }]
    }))
    .expect("deserialize");

    let field = form.field_by_label("Name").expect("field");
    assert!(field.required);
    assert!(!field.id.as_str().is_empty());
}

#[test]
fn check_form_reports_authoring_problems() {
    let form: FormSpec = serde_json::from_value(json!({
        "title": "Problems",
        "rows": [
            {
                "fields": [
                    { "id": "a", "label": "Colour", "inputType": "radio" },
                    { "id": "a", "label": "Colour", "inputType": "text" }
                ]
            },
            { "fields": [] },
            {
                "fields": [
                    {
                        "id": "weight",
                        "label": "Weight",
                        "inputType": "number",
                        "validateNumber": true,
                        "numberValidation": "three"
                    },
                    {
                        "id": "broken",
                        "label": "Broken",
                        "inputType": "text",
                        "hasVisibilityCondition": true,
                        "visibilityCondition": "'Colour' =="
                    },
                    {
                        "id": "loop",
                        "label": "Loop",
                        "inputType": "text",
                        "hasVisibilityCondition": true,
                        "visibilityCondition": "'Loop' == 'x'"
                    }
                ]
            }
        ]
    }))
    .expect("deserialize");

    let issues = check_form(&form);
    assert!(issues.contains(&LayoutIssue::EmptyRow { row: 1 }));
    assert!(issues.contains(&LayoutIssue::DuplicateId { id: "a".into() }));
    assert!(issues.contains(&LayoutIssue::DuplicateLabel {
        label: "Colour".into()
    }));
    assert!(issues.contains(&LayoutIssue::MissingOptions { id: "a".into() }));
    assert!(issues.contains(&LayoutIssue::InvalidNumberFormat {
        id: "weight".into(),
        format: "three".into()
    }));
    assert!(issues
        .iter()
        .any(|issue| matches!(issue, LayoutIssue::InvalidCondition { id, .. } if id.as_str() == "broken")));
    assert!(issues.contains(&LayoutIssue::CyclicCondition { id: "loop".into() }));
}

#[test]
fn check_form_accepts_the_visit_fixture() {
    let form: FormSpec =
        serde_json::from_str(include_str!("fixtures/visit_form.json")).expect("deserialize");
    assert_eq!(check_form(&form), Vec::new());
}
