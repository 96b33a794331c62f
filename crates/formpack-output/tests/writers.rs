//! Writers over real exports built from pack documents.

use calamine::{Reader, Xlsx, open_workbook};
use formpack_export::{Export, ExportOptions, Lang, TableSet};
use formpack_ingest::parse_pack;
use formpack_model::FormPack;
use formpack_output::{
    GeoJsonOptions, OutputError, geojson, spss_labels, to_csv_string, write_json, write_xlsx,
};
use serde_json::{Value, json};

fn restaurant_profile() -> (FormPack, Vec<Value>) {
    let document = json!({
        "id_string": "restaurant_profile",
        "title": "Restaurant profile",
        "versions": [{
            "version": "rpV3",
            "content": {
                "survey": [
                    {"type": "text", "name": "name", "label": ["restaurant's name", "nom du restaurant"]},
                    {"type": "geopoint", "name": "location", "label": ["location", "lieu"]},
                    {"type": "select_one eatery", "name": "eatery_type", "label": ["type of restaurant", "type de restaurant"]}
                ],
                "choices": [
                    {"list_name": "eatery", "name": "takeaway", "label": ["take-away", "avec vente à emporter"]},
                    {"list_name": "eatery", "name": "sit_down", "label": ["sit down", "traditionnel"]}
                ],
                "translations": ["English", "French"]
            }
        }]
    });
    let pack = parse_pack(&document.to_string()).expect("pack");
    let submissions = vec![
        json!({"name": "Taco Truck", "location": "13.42 -25.43", "eatery_type": "takeaway"}),
        json!({"name": "Harvest", "location": "12.43 -24.53", "eatery_type": "sit_down"}),
        json!({"name": "Nowhere", "eatery_type": "sit_down"}),
    ];
    (pack, submissions)
}

fn household() -> (FormPack, Vec<Value>) {
    let document = json!({
        "title": "Household survey: wave 1",
        "versions": [{"content": {"survey": [
            {"type": "text", "name": "village", "hxl": "#loc +name"},
            {"type": "begin_repeat", "name": "members"},
            {"type": "text", "name": "name", "hxl": "#beneficiary"},
            {"type": "end_repeat"}
        ]}}]
    });
    let pack = parse_pack(&document.to_string()).expect("pack");
    let submissions = vec![json!({
        "village": "Bagamoyo",
        "members": [{"members/name": "Ann"}, {"members/name": "Bo"}]
    })];
    (pack, submissions)
}

fn export(pack: &FormPack, options: ExportOptions, submissions: &[Value]) -> TableSet {
    Export::new(pack, options)
        .and_then(|export| export.to_tables(submissions))
        .expect("export")
}

#[test]
fn csv_quotes_every_field_and_splits_geopoints() {
    let (pack, submissions) = restaurant_profile();
    let options = ExportOptions::new().with_lang(Lang::Translation("French".into()));
    let csv = to_csv_string(&export(&pack, options, &submissions[..2])).expect("csv");

    insta::assert_snapshot!(csv, @r#"
    "nom du restaurant";"lieu";"_lieu_latitude";"_lieu_longitude";"_lieu_altitude";"_lieu_precision";"type de restaurant"
    "Taco Truck";"13.42 -25.43";"13.42";"-25.43";"";"";"avec vente à emporter"
    "Harvest";"12.43 -24.53";"12.43";"-24.53";"";"";"traditionnel"
    "#);
}

#[test]
fn csv_writes_the_tag_row_after_the_header() {
    let (pack, submissions) = household();
    let options = ExportOptions::new()
        .with_fields(["village"])
        .with_tag_cols_for_header(["hxl"]);
    let csv = to_csv_string(&export(&pack, options, &submissions)).expect("csv");

    insta::assert_snapshot!(csv, @r##"
    "village"
    "#loc+name"
    "Bagamoyo"
    "##);
}

#[test]
fn csv_rejects_exports_with_repeat_tables() {
    let (pack, submissions) = household();
    let tables = export(&pack, ExportOptions::new(), &submissions);
    let err = to_csv_string(&tables).unwrap_err();
    assert!(matches!(err, OutputError::MultipleTables { count: 2, .. }));
    assert!(err.to_string().contains("members"));
}

#[test]
fn workbook_has_one_sheet_per_table() {
    let (pack, submissions) = household();
    let tables = export(
        &pack,
        ExportOptions::new().with_tag_cols_for_header(["hxl"]),
        &submissions,
    );
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("export.xlsx");
    write_xlsx(&tables, &path).expect("write workbook");

    let mut workbook: Xlsx<_> = open_workbook(&path).expect("open workbook");
    assert_eq!(
        workbook.sheet_names(),
        vec!["Household survey_ wave 1", "members"]
    );

    let read = |workbook: &mut Xlsx<_>, sheet: &str| -> Vec<Vec<String>> {
        workbook
            .worksheet_range(sheet)
            .expect("sheet")
            .rows()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect()
    };
    assert_eq!(
        read(&mut workbook, "Household survey_ wave 1"),
        vec![
            vec!["village", "_index"],
            vec!["#loc+name", ""],
            vec!["Bagamoyo", "1"],
        ]
    );
    assert_eq!(
        read(&mut workbook, "members"),
        vec![
            vec!["name", "_parent_table_name", "_parent_index"],
            vec!["#beneficiary", "", ""],
            vec!["Ann", "Household survey: wave 1", "1"],
            vec!["Bo", "Household survey: wave 1", "1"],
        ]
    );
}

#[test]
fn geojson_has_a_feature_per_located_row() {
    let (pack, submissions) = restaurant_profile();
    let tables = export(&pack, ExportOptions::new(), &submissions);
    let collection = geojson(&tables, &GeoJsonOptions::default()).expect("geojson");

    assert_eq!(collection["type"], "FeatureCollection");
    assert_eq!(collection["name"], "Restaurant profile");
    assert_eq!(
        collection["features"][0],
        json!({
            "type": "Feature",
            "geometry": {"type": "Point", "coordinates": [-25.43, 13.42]},
            "properties": {"name": "Taco Truck", "eatery_type": "takeaway"}
        })
    );
    // The row without a location has no feature.
    assert_eq!(collection["features"].as_array().map(Vec::len), Some(2));

    let options = GeoJsonOptions {
        field: Some("elsewhere".into()),
        flatten: false,
    };
    assert!(matches!(
        geojson(&tables, &options),
        Err(OutputError::UnknownGeoField { .. })
    ));
}

#[test]
fn geojson_needs_a_geo_field() {
    let (pack, submissions) = household();
    let tables = export(&pack, ExportOptions::new(), &submissions);
    assert!(matches!(
        geojson(&tables, &GeoJsonOptions::default()),
        Err(OutputError::NoGeoField)
    ));
}

#[test]
fn spss_labels_double_quotes() {
    let (pack, _) = restaurant_profile();
    let export = Export::new(
        &pack,
        ExportOptions::new().with_lang(Lang::Translation("English".into())),
    )
    .expect("export");

    insta::assert_snapshot!(spss_labels(export.plan()), @r"
    VARIABLE LABELS
     name 'restaurant''s name'
     /location 'location'
     /eatery_type 'type of restaurant'.
    VALUE LABELS
     eatery_type
     'takeaway' 'take-away'
     'sit_down' 'sit down'.
    ");
}

#[test]
fn json_output_matches_the_table_shape() {
    let (pack, submissions) = household();
    let tables = export(&pack, ExportOptions::new(), &submissions);
    let mut buffer = Vec::new();
    write_json(&tables, &mut buffer).expect("json");

    let written: Value = serde_json::from_slice(&buffer).expect("parse");
    assert_eq!(
        written,
        json!({
            "Household survey: wave 1": {
                "fields": ["village", "_index"],
                "data": [["Bagamoyo", 1]]
            },
            "members": {
                "fields": ["name", "_parent_table_name", "_parent_index"],
                "data": [
                    ["Ann", "Household survey: wave 1", 1],
                    ["Bo", "Household survey: wave 1", 1]
                ]
            }
        })
    );
}
