//! Locking profile matrices from workbooks and CSV files.

use std::fs;
use std::path::Path;

use formpack_ingest::{
    IngestError, KOBO_LOCK_SHEET, KOBO_LOCKING_RESTRICTIONS, LockingProfile, profiles_from_rows,
    profiles_to_rows, read_locking_profiles, revert_profiles,
};
use rust_xlsxwriter::Workbook;

fn matrix() -> Vec<Vec<String>> {
    [
        ["restriction", "core", "flex", "delete"],
        ["choice_add", "locked", "locked", ""],
        ["choice_delete", "", "", "locked"],
        ["choice_edit", "locked", "", ""],
        ["choice_order_edit", "locked", "", ""],
        ["question_delete", "locked", "locked", "locked"],
        ["group_delete", "locked", "", "locked"],
    ]
    .iter()
    .map(|row| row.iter().map(|cell| cell.to_string()).collect())
    .collect()
}

fn expected() -> Vec<LockingProfile> {
    let profile = |name: &str, restrictions: &[&str]| LockingProfile {
        name: name.to_string(),
        restrictions: restrictions.iter().map(|r| r.to_string()).collect(),
    };
    vec![
        profile(
            "core",
            &[
                "choice_add",
                "choice_edit",
                "choice_order_edit",
                "question_delete",
                "group_delete",
            ],
        ),
        profile("flex", &["choice_add", "question_delete"]),
        profile("delete", &["choice_delete", "question_delete", "group_delete"]),
    ]
}

fn write_workbook(path: &Path, sheet_name: &str, rows: &[Vec<String>]) {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(sheet_name).expect("sheet name");
    for (r, row) in rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            if !cell.is_empty() {
                sheet
                    .write_string(r as u32, c as u16, cell)
                    .expect("write cell");
            }
        }
    }
    workbook.save(path).expect("save workbook");
}

#[test]
fn matrix_rows_become_profiles() {
    assert_eq!(profiles_from_rows(&matrix()).expect("profiles"), expected());
}

#[test]
fn unknown_restrictions_are_rejected() {
    let mut rows = matrix();
    rows.push(vec!["paint_it_red".into(), "locked".into()]);
    let err = profiles_from_rows(&rows).unwrap_err();
    assert!(matches!(err, IngestError::Locking { .. }));
    assert!(err.to_string().contains("paint_it_red"));
}

#[test]
fn first_column_must_be_restriction() {
    let mut rows = matrix();
    rows[0][0] = "name".into();
    assert!(matches!(
        profiles_from_rows(&rows),
        Err(IngestError::Locking { .. })
    ));
}

#[test]
fn reverted_rows_cover_every_restriction() {
    let rows = revert_profiles(&expected());
    assert_eq!(rows.len(), KOBO_LOCKING_RESTRICTIONS.len());
    assert_eq!(rows[0].restriction, "choice_add");
    assert_eq!(
        rows[0].profiles.keys().collect::<Vec<_>>(),
        vec!["core", "flex"]
    );
    let form_replace = rows
        .iter()
        .find(|row| row.restriction == "form_replace")
        .expect("form_replace");
    assert!(form_replace.profiles.is_empty());

    // The written matrix reads back to the same profiles.
    let written = profiles_to_rows(&expected());
    assert_eq!(profiles_from_rows(&written).expect("profiles"), expected());
}

#[test]
fn workbook_sheet_is_read() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("locking.xlsx");
    write_workbook(&path, KOBO_LOCK_SHEET, &matrix());

    assert_eq!(read_locking_profiles(&path).expect("profiles"), expected());
}

#[test]
fn workbook_without_the_sheet_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("survey.xlsx");
    write_workbook(&path, "survey", &matrix());

    let err = read_locking_profiles(&path).unwrap_err();
    assert!(matches!(err, IngestError::MissingSheet { .. }));
}

#[test]
fn csv_matrix_is_read() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("locking.csv");
    let text: String = matrix()
        .iter()
        .map(|row| row.join(",") + "\n")
        .collect();
    fs::write(&path, text).expect("write");

    assert_eq!(read_locking_profiles(&path).expect("profiles"), expected());
}

#[test]
fn other_extensions_are_unsupported() {
    let err = read_locking_profiles(Path::new("profiles.ods")).unwrap_err();
    assert!(matches!(err, IngestError::UnsupportedFile { .. }));
}
