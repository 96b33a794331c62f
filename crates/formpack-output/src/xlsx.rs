//! Spreadsheet workbooks, one worksheet per table.

use std::collections::BTreeSet;
use std::path::Path;

use formpack_export::constants::{
    EXCEL_COLUMN_LIMIT, EXCEL_FORBIDDEN_WORKSHEET_NAME_CHARACTERS, EXCEL_SHEET_NAME_SIZE_LIMIT,
    TRUNCATION_MARKER,
};
use formpack_export::{CellValue, Table, TableSet};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use tracing::{debug, info};

use crate::error::{OutputError, Result};

/// Worksheet name for a table name: forbidden characters become `_`, and
/// long names are cut with a trailing marker.
pub fn sheet_name(name: &str) -> String {
    truncate(&sanitize(name), EXCEL_SHEET_NAME_SIZE_LIMIT)
}

/// Unique worksheet names, in table order.
///
/// Names compare case-insensitively, as spreadsheet applications do. A
/// collision gets a ` (n)` suffix, shortening the name to make room.
pub fn sheet_names<'a, I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut used = BTreeSet::new();
    let mut out = Vec::new();
    for name in names {
        let clean = sanitize(name);
        let mut candidate = truncate(&clean, EXCEL_SHEET_NAME_SIZE_LIMIT);
        let mut n = 1;
        while used.contains(&candidate.to_lowercase()) {
            let suffix = format!(" ({n})");
            let room = EXCEL_SHEET_NAME_SIZE_LIMIT.saturating_sub(suffix.chars().count());
            candidate = format!("{}{suffix}", truncate(&clean, room));
            n += 1;
        }
        used.insert(candidate.to_lowercase());
        out.push(candidate);
    }
    out
}

fn sanitize(name: &str) -> String {
    let last = name.chars().count().saturating_sub(1);
    // Names may not start or end with an apostrophe either.
    let clean: String = name
        .chars()
        .enumerate()
        .map(|(position, c)| {
            let edge_quote = c == '\'' && (position == 0 || position == last);
            if edge_quote || EXCEL_FORBIDDEN_WORKSHEET_NAME_CHARACTERS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect();
    if clean.trim().is_empty() {
        "Sheet".to_string()
    } else {
        clean
    }
}

fn truncate(name: &str, limit: usize) -> String {
    if name.chars().count() <= limit {
        return name.to_string();
    }
    let keep = limit.saturating_sub(TRUNCATION_MARKER.len());
    let mut short: String = name.chars().take(keep).collect();
    short.push_str(TRUNCATION_MARKER);
    short
}

/// Write every table of the export to a workbook at `path`.
pub fn write_xlsx(tables: &TableSet, path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let names = sheet_names(tables.iter().map(|table| table.name.as_str()));

    for (table, name) in tables.iter().zip(&names) {
        let sheet = workbook.add_worksheet();
        sheet.set_name(name)?;
        write_table(sheet, table, &header)?;
        debug!(table = %table.name, sheet = %name, rows = table.rows.len(), "wrote worksheet");
    }

    workbook.save(path)?;
    info!(path = %path.display(), sheets = names.len(), "wrote workbook");
    Ok(())
}

fn write_table(sheet: &mut Worksheet, table: &Table, header: &Format) -> Result<()> {
    let too_many = || OutputError::TooManyColumns {
        table: table.name.clone(),
        columns: table.width(),
        limit: EXCEL_COLUMN_LIMIT,
    };
    if table.width() > EXCEL_COLUMN_LIMIT {
        return Err(too_many());
    }
    let cols = (0..table.width())
        .map(u16::try_from)
        .collect::<std::result::Result<Vec<u16>, _>>()
        .map_err(|_| too_many())?;

    for (&col, label) in cols.iter().zip(table.labels()) {
        sheet.write_string_with_format(0, col, label, header)?;
    }
    let mut row: u32 = 1;
    if let Some(tags) = &table.tag_row {
        for (&col, tag) in cols.iter().zip(tags) {
            sheet.write_string(row, col, tag)?;
        }
        row += 1;
    }
    for cells in &table.rows {
        for (&col, cell) in cols.iter().zip(cells) {
            match cell {
                CellValue::Text(text) => {
                    sheet.write_string(row, col, text)?;
                }
                CellValue::Integer(value) => {
                    sheet.write_number(row, col, *value as f64)?;
                }
                CellValue::Empty => {}
            }
        }
        row += 1;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use formpack_export::{ColumnSource, ColumnSpec};
    use proptest::prelude::*;

    #[test]
    fn tables_wider_than_a_worksheet_are_rejected() {
        let columns = (0..=EXCEL_COLUMN_LIMIT)
            .map(|index| ColumnSpec {
                label: format!("q{index}"),
                source: ColumnSource::Copy {
                    name: format!("q{index}"),
                },
                tag: String::new(),
            })
            .collect();
        let table = Table {
            name: "wide".into(),
            parent: None,
            columns,
            tag_row: None,
            rows: Vec::new(),
        };
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        let error = write_table(sheet, &table, &Format::new()).expect_err("too wide");
        assert!(matches!(
            error,
            OutputError::TooManyColumns { columns: 16_385, limit: 16_384, .. }
        ));
    }

    #[test]
    fn long_names_are_truncated_and_disambiguated() {
        let names = sheet_names([
            "long survey name: the quick, brown fox jumps over the lazy dog",
            "long_group_name__Victor_jagt_zwölf_Boxkämpfer_quer_über_den_großen_Sylter_Deich",
            "long_group_name__Victor_jagt_zwölf_Boxkämpfer_quer_über_den_Sylter_Deich",
        ]);
        assert_eq!(
            names,
            vec![
                "long survey name_ the quick,...",
                "long_group_name__Victor_jagt...",
                "long_group_name__Victor_... (1)",
            ]
        );
    }

    #[test]
    fn collisions_ignore_case() {
        assert_eq!(
            sheet_names(["Members", "members", "MEMBERS"]),
            vec!["Members", "members (1)", "MEMBERS (2)"]
        );
    }

    #[test]
    fn forbidden_characters_are_replaced() {
        assert_eq!(sheet_name("a/b\\c[d]*?:"), "a_b_c_d____");
        assert_eq!(sheet_name(""), "Sheet");
    }

    proptest! {
        #[test]
        fn sheet_names_are_valid_and_unique(names in prop::collection::vec(".{0,60}", 1..8)) {
            let sheets = sheet_names(names.iter().map(String::as_str));
            prop_assert_eq!(sheets.len(), names.len());
            let mut seen = BTreeSet::new();
            for sheet in &sheets {
                prop_assert!(sheet.chars().count() <= EXCEL_SHEET_NAME_SIZE_LIMIT);
                prop_assert!(!sheet.contains(EXCEL_FORBIDDEN_WORKSHEET_NAME_CHARACTERS));
                prop_assert!(seen.insert(sheet.to_lowercase()));
            }
        }
    }
}
