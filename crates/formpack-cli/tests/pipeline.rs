//! Integration tests for the export pipeline.

use std::fs;
use std::path::{Path, PathBuf};

use formpack_cli::pipeline::{
    ExportRequest, OutputFormat, SettingsOverrides, TableSummary, load_settings, run_export,
};
use formpack_export::{ExportSettings, HierarchyInLabels, MultipleSelect};
use serde_json::json;
use tempfile::TempDir;

fn pack_document() -> serde_json::Value {
    json!({
        "id_string": "dietary_needs",
        "title": "Dietary needs",
        "versions": [{
            "version": "dietv1",
            "content": {
                "survey": [
                    {"type": "text", "name": "location_name", "label": "Location"},
                    {"type": "begin_group", "name": "meal", "label": "Meal"},
                    {"type": "select_multiple diets", "name": "diet", "label": "Diet"},
                    {"type": "end_group"}
                ],
                "choices": [
                    {"list_name": "diets", "name": "vegan", "label": "Vegan"},
                    {"list_name": "diets", "name": "halal", "label": "Halal"}
                ]
            }
        }]
    })
}

struct Fixture {
    dir: TempDir,
    pack: PathBuf,
    submissions: PathBuf,
}

impl Fixture {
    fn new(submissions: &str) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let pack = dir.path().join("pack.json");
        fs::write(&pack, pack_document().to_string()).expect("write pack");
        let path = dir.path().join("submissions.jsonl");
        fs::write(&path, submissions).expect("write submissions");
        Self {
            dir,
            pack,
            submissions: path,
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn request(&self, output: &Path) -> ExportRequest {
        ExportRequest {
            pack: self.pack.clone(),
            submissions: self.submissions.clone(),
            output: output.to_path_buf(),
            format: None,
            settings: None,
            overrides: SettingsOverrides::default(),
            extend: None,
            skip_invalid: false,
            geo_field: None,
        }
    }
}

const SUBMISSIONS: &str = "{\"location_name\": \"Dakar\", \"meal/diet\": \"halal vegan\"}\n\
                           {\"location_name\": \"Lyon\", \"meal/diet\": \"\"}\n";

#[test]
fn settings_document_and_flags_combine() {
    let fixture = Fixture::new(SUBMISSIONS);
    let settings = fixture.path("settings.json");
    fs::write(
        &settings,
        json!({"lang": "_default", "multiple_select": "both", "type": "csv"}).to_string(),
    )
    .expect("write settings");
    let output = fixture.path("out/export.csv");

    let mut request = fixture.request(&output);
    request.settings = Some(settings);
    request.overrides.hierarchy_in_labels = true;
    request.overrides.multiple_select = Some(MultipleSelect::Summary);
    let result = run_export(&request).expect("export");

    assert_eq!(result.format, OutputFormat::Csv);
    assert_eq!(result.versions, vec!["dietv1"]);
    assert_eq!(
        result.tables,
        vec![TableSummary {
            name: "Dietary needs".into(),
            columns: 2,
            rows: 2,
        }]
    );
    let csv = fs::read_to_string(&output).expect("read output");
    insta::assert_snapshot!(csv, @r#"
    "Location";"Meal/Diet"
    "Dakar";"Vegan Halal"
    "Lyon";""
    "#);
}

#[test]
fn invalid_submissions_abort_unless_skipped() {
    let fixture = Fixture::new(&format!("{SUBMISSIONS}not json\n[1, 2]\n"));
    let output = fixture.path("export.json");
    let mut request = fixture.request(&output);
    request.format = Some(OutputFormat::Json);

    let err = run_export(&request).unwrap_err();
    assert!(format!("{err:#}").contains("line 3"), "{err:#}");

    request.skip_invalid = true;
    let result = run_export(&request).expect("export");
    assert_eq!(result.tables[0].rows, 2);
    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output).expect("read")).expect("json");
    assert_eq!(written["Dietary needs"]["data"].as_array().map(Vec::len), Some(2));
}

#[test]
fn extension_fields_become_columns() {
    let fixture = Fixture::new(
        "{\"location_name\": \"Dakar\", \"reviewed\": \"yes\"}\n",
    );
    let fields = fixture.path("fields.json");
    fs::write(&fields, json!([{"type": "text", "name": "reviewed"}]).to_string())
        .expect("write fields");
    let output = fixture.path("export.csv");
    let mut request = fixture.request(&output);
    request.extend = Some(fields);
    request.overrides.multiple_select = Some(MultipleSelect::Summary);

    run_export(&request).expect("export");
    let csv = fs::read_to_string(&output).expect("read output");
    insta::assert_snapshot!(csv, @r#"
    "location_name";"diet";"reviewed"
    "Dakar";"";"yes"
    "#);
}

#[test]
fn settings_type_picks_the_format() {
    let fixture = Fixture::new(SUBMISSIONS);
    let settings = fixture.path("settings.json");
    fs::write(&settings, json!({"type": "xls"}).to_string()).expect("write settings");
    let output = fixture.path("export.xlsx");
    let mut request = fixture.request(&output);
    request.settings = Some(settings);

    let result = run_export(&request).expect("export");
    assert_eq!(result.format, OutputFormat::Xlsx);
    assert!(output.is_file());
}

#[test]
fn unknown_settings_keys_are_rejected() {
    let fixture = Fixture::new(SUBMISSIONS);
    let settings = fixture.path("settings.json");
    fs::write(&settings, json!({"colour": "red"}).to_string()).expect("write settings");
    assert!(load_settings(Some(&settings)).is_err());
    assert_eq!(load_settings(None).expect("defaults"), ExportSettings::default());
}

#[test]
fn flags_keep_a_document_separator() {
    let mut settings = ExportSettings {
        hierarchy_in_labels: Some(HierarchyInLabels::Separator(" > ".into())),
        ..ExportSettings::default()
    };
    let overrides = SettingsOverrides {
        hierarchy_in_labels: true,
        versions: vec!["v2".into()],
        latest_fields_only: true,
        ..SettingsOverrides::default()
    };
    overrides.apply(&mut settings);

    assert_eq!(
        settings.hierarchy_in_labels,
        Some(HierarchyInLabels::Separator(" > ".into()))
    );
    assert_eq!(settings.versions, Some(vec!["v2".into()]));
    assert_eq!(settings.fields_from_all_versions, Some(false));
}
