//! Locking profiles: which form-editing restrictions each profile locks.
//!
//! The source is a matrix sheet with restriction names down the first
//! column, one column per profile, and `locked` in the cells that apply:
//!
//! | restriction | core   | flex   |
//! |-------------|--------|--------|
//! | choice_add  | locked | locked |
//! | choice_edit |        |        |

use std::collections::BTreeMap;
use std::path::Path;

use calamine::{Reader, Xlsx, open_workbook};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{IngestError, Result};

/// Worksheet holding the profile matrix.
pub const KOBO_LOCK_SHEET: &str = "kobo--locking-profiles";
/// Header of the restriction name column.
pub const KOBO_LOCK_COLUMN: &str = "restriction";
/// Cell value marking a restriction as locked for a profile.
pub const KOBO_LOCKED: &str = "locked";

/// Every restriction a profile may lock, in sheet order.
pub const KOBO_LOCKING_RESTRICTIONS: &[&str] = &[
    "choice_add",
    "choice_delete",
    "choice_edit",
    "choice_order_edit",
    "question_delete",
    "question_label_edit",
    "question_settings_edit",
    "question_skip_logic_edit",
    "question_validation_edit",
    "group_delete",
    "group_label_edit",
    "group_question_add",
    "group_question_delete",
    "group_question_order_edit",
    "group_settings_edit",
    "group_skip_logic_edit",
    "form_replace",
    "group_add",
    "question_add",
    "question_order_edit",
    "translations_manage",
    "form_appearance",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockingProfile {
    pub name: String,
    pub restrictions: Vec<String>,
}

/// One restriction with the profiles locking it, keyed by profile name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestrictionRow {
    pub restriction: String,
    #[serde(flatten)]
    pub profiles: BTreeMap<String, String>,
}

/// Build profiles from matrix rows, header row first.
pub fn profiles_from_rows(rows: &[Vec<String>]) -> Result<Vec<LockingProfile>> {
    let Some((header, body)) = rows.split_first() else {
        return Err(locking_error("the sheet is empty"));
    };
    if header.first().map(|cell| cell.trim()) != Some(KOBO_LOCK_COLUMN) {
        return Err(locking_error(format!(
            "the first column must be '{KOBO_LOCK_COLUMN}'"
        )));
    }

    // Profile columns keep their sheet position; blank headers are skipped.
    let mut columns: Vec<(usize, LockingProfile)> = header
        .iter()
        .enumerate()
        .skip(1)
        .map(|(column, name)| (column, name.trim()))
        .filter(|(_, name)| !name.is_empty())
        .map(|(column, name)| {
            let profile = LockingProfile {
                name: name.to_string(),
                restrictions: Vec::new(),
            };
            (column, profile)
        })
        .collect();

    for row in body {
        let Some(restriction) = row.first().map(|cell| cell.trim()).filter(|r| !r.is_empty())
        else {
            continue;
        };
        if !KOBO_LOCKING_RESTRICTIONS.contains(&restriction) {
            return Err(locking_error(format!("unknown restriction '{restriction}'")));
        }
        for (column, profile) in &mut columns {
            if row.get(*column).is_some_and(|cell| cell.trim() == KOBO_LOCKED) {
                profile.restrictions.push(restriction.to_string());
            }
        }
    }
    let profiles = columns.into_iter().map(|(_, profile)| profile).collect();
    Ok(profiles)
}

/// Restriction-keyed rows for every known restriction, including ones no
/// profile locks.
pub fn revert_profiles(profiles: &[LockingProfile]) -> Vec<RestrictionRow> {
    KOBO_LOCKING_RESTRICTIONS
        .iter()
        .map(|restriction| RestrictionRow {
            restriction: restriction.to_string(),
            profiles: profiles
                .iter()
                .filter(|profile| profile.restrictions.iter().any(|r| r == restriction))
                .map(|profile| (profile.name.clone(), KOBO_LOCKED.to_string()))
                .collect(),
        })
        .collect()
}

/// The profile matrix as rows, header first.
pub fn profiles_to_rows(profiles: &[LockingProfile]) -> Vec<Vec<String>> {
    let mut header = vec![KOBO_LOCK_COLUMN.to_string()];
    header.extend(profiles.iter().map(|profile| profile.name.clone()));
    let mut rows = vec![header];
    for row in revert_profiles(profiles) {
        let mut cells = vec![row.restriction];
        cells.extend(profiles.iter().map(|profile| {
            row.profiles
                .get(&profile.name)
                .cloned()
                .unwrap_or_default()
        }));
        rows.push(cells);
    }
    rows
}

/// Read profiles from an `.xlsx` workbook sheet or a `.csv` file.
pub fn read_locking_profiles(path: &Path) -> Result<Vec<LockingProfile>> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    let rows = match extension.as_deref() {
        Some("xlsx" | "xlsm") => read_workbook_rows(path)?,
        Some("csv") => read_csv_rows(path)?,
        _ => {
            return Err(IngestError::UnsupportedFile {
                path: path.to_path_buf(),
            });
        }
    };
    let profiles = profiles_from_rows(&rows)?;
    info!(path = %path.display(), profiles = profiles.len(), "loaded locking profiles");
    Ok(profiles)
}

fn read_workbook_rows(path: &Path) -> Result<Vec<Vec<String>>> {
    let workbook_error = |source| IngestError::Workbook {
        path: path.to_path_buf(),
        source,
    };
    let mut workbook: Xlsx<_> = open_workbook(path).map_err(workbook_error)?;
    if !workbook
        .sheet_names()
        .iter()
        .any(|name| name == KOBO_LOCK_SHEET)
    {
        return Err(IngestError::MissingSheet {
            path: path.to_path_buf(),
            sheet: KOBO_LOCK_SHEET.to_string(),
        });
    }
    let range = workbook
        .worksheet_range(KOBO_LOCK_SHEET)
        .map_err(workbook_error)?;
    Ok(range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect())
}

fn read_csv_rows(path: &Path) -> Result<Vec<Vec<String>>> {
    let csv_error = |source| IngestError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(csv_error)?;
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

fn locking_error(message: impl Into<String>) -> IngestError {
    IngestError::Locking {
        message: message.into(),
    }
}
