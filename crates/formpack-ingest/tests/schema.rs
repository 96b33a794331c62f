//! Loading pack documents into the form model.

use std::fs;

use formpack_ingest::{IngestError, load_fields, load_pack, parse_pack};
use formpack_model::{Field, FieldType, ModelError, VersionSelector};
use serde_json::json;

fn household_document() -> serde_json::Value {
    json!({
        "id_string": "household",
        "title": "Household survey",
        "versions": [
            {
                "version": "v1",
                "content": {
                    "survey": [
                        {"type": "start", "name": "start"},
                        {"type": "text", "name": "village", "label": ["Village", "Village"], "hxl": "#loc +name"},
                        {"type": "begin group", "name": "head", "label": ["Head", "Chef"]},
                        {"type": "integer", "name": "age", "label": ["Age", "Âge"]},
                        {"type": "end group"},
                        {"type": "begin_repeat", "name": "members", "label": ["Members", "Membres"]},
                        {"type": "text", "name": "name"},
                        {"type": "select_multiple meals or_other", "name": "meals"},
                        {"type": "geopoint", "name": "location"},
                        {"type": "end_repeat"},
                        {"type": "note", "name": "thanks", "label": "Thanks"}
                    ],
                    "choices": [
                        {"list_name": "meals", "name": "breakfast", "label": ["Breakfast", "Petit déjeuner"]},
                        {"list_name": "meals", "name": "dinner", "label": ["Dinner", "Dîner"]}
                    ],
                    "translations": [null, "French"]
                }
            },
            {
                "version": "v2",
                "content": {
                    "survey": [
                        {"type": "text", "$autoname": "village"}
                    ]
                }
            }
        ]
    })
}

#[test]
fn pack_document_builds_the_field_tree() {
    let pack = parse_pack(&household_document().to_string()).expect("pack");

    assert_eq!(pack.id_string(), "household");
    assert_eq!(pack.title(), "Household survey");
    assert_eq!(pack.versions().len(), 2);
    assert_eq!(pack.latest().id(), Some("v2"));

    let v1 = pack.get(&VersionSelector::from("v1")).expect("v1");
    assert_eq!(v1.root().name(), "Household survey");
    assert_eq!(
        v1.root().field_names(),
        vec!["start", "village", "age", "thanks"]
    );
    assert_eq!(v1.translation_index("French"), Some(1));

    let members = v1.section("members").expect("members");
    assert_eq!(members.field_names(), vec!["name", "meals", "location"]);

    let meals = members.field("meals").expect("meals");
    assert_eq!(meals.field.field_type(), FieldType::SelectMultiple);
    assert_eq!(meals.field.choice_list(), Some("meals"));
    match meals.field {
        Field::SelectMultiple(select) => assert!(select.or_other),
        other => panic!("unexpected field {other:?}"),
    }

    let age = v1.root().field("age").expect("age");
    assert_eq!(age.relative_path(), "head/age");
    assert_eq!(age.field.labels().get(1), Some("Âge"));

    let village = v1.root().field("village").expect("village");
    assert_eq!(
        village.field.info().tag_values("hxl").collect::<Vec<_>>(),
        vec!["#loc", "+name"]
    );

    let list = v1.choice_list("meals").expect("choice list");
    assert_eq!(list.choices.len(), 2);
    assert_eq!(list.get("dinner").and_then(|c| c.labels.get(1)), Some("Dîner"));
}

#[test]
fn unknown_top_level_keys_are_rejected() {
    let mut document = household_document();
    document["owner"] = json!("someone");
    let err = parse_pack(&document.to_string()).unwrap_err();
    assert!(matches!(err, IngestError::Json { .. }), "{err}");
}

#[test]
fn duplicate_versions_are_rejected() {
    let mut document = household_document();
    document["versions"][1]["version"] = json!("v1");
    let err = parse_pack(&document.to_string()).unwrap_err();
    assert!(matches!(
        err,
        IngestError::Model(ModelError::DuplicateVersion { .. })
    ));
}

#[test]
fn duplicate_field_names_in_one_scope_are_rejected() {
    let document = json!({
        "versions": [{"content": {"survey": [
            {"type": "text", "name": "q"},
            {"type": "begin_group", "name": "g"},
            {"type": "text", "name": "q"},
            {"type": "end_group"}
        ]}}]
    });
    let err = parse_pack(&document.to_string()).unwrap_err();
    assert!(matches!(
        err,
        IngestError::Model(ModelError::DuplicateField { .. })
    ));
}

#[test]
fn pack_without_versions_is_rejected() {
    let err = parse_pack(r#"{"versions": []}"#).unwrap_err();
    assert!(matches!(err, IngestError::Model(ModelError::NoVersions)));
}

#[test]
fn missing_title_falls_back_to_default() {
    let pack = parse_pack(r#"{"versions": [{"content": {"survey": []}}]}"#).expect("pack");
    assert_eq!(pack.title(), "Submissions");
    assert_eq!(pack.latest().id(), None);
}

#[test]
fn packs_and_extra_fields_load_from_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pack_path = dir.path().join("pack.json");
    fs::write(&pack_path, household_document().to_string()).expect("write pack");
    let fields_path = dir.path().join("fields.json");
    fs::write(
        &fields_path,
        json!([{"type": "text", "name": "reviewer_notes"}]).to_string(),
    )
    .expect("write fields");

    let mut pack = load_pack(&pack_path).expect("load pack");
    let fields = load_fields(&fields_path).expect("load fields");
    pack.extend(fields).expect("extend");
    assert_eq!(
        pack.latest().root().field_names(),
        vec!["village", "reviewer_notes"]
    );

    let missing = load_pack(&dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(missing, IngestError::Io { .. }));
}
