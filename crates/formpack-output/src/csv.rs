//! Delimited text: `;`-separated, every field quoted.

use std::io::Write;

use csv::{QuoteStyle, Terminator, WriterBuilder};
use formpack_export::{Table, TableSet};
use tracing::debug;

use crate::error::{OutputError, Result};

/// Field delimiter of CSV exports.
pub const CSV_DELIMITER: u8 = b';';

/// Write the single table of `tables` as CSV: header, optional tag row,
/// then one line per row.
///
/// Exports with repeat tables cannot be represented in one file and are
/// rejected.
pub fn write_csv<W: Write>(tables: &TableSet, writer: W) -> Result<()> {
    let table = single_table(tables)?;
    let mut csv = WriterBuilder::new()
        .delimiter(CSV_DELIMITER)
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(writer);

    csv.write_record(table.labels())?;
    if let Some(tags) = &table.tag_row {
        csv.write_record(tags)?;
    }
    for row in table.text_rows() {
        csv.write_record(&row)?;
    }
    csv.flush()?;
    debug!(table = %table.name, rows = table.rows.len(), "wrote CSV");
    Ok(())
}

/// CSV export as a string.
pub fn to_csv_string(tables: &TableSet) -> Result<String> {
    let mut buffer = Vec::new();
    write_csv(tables, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

fn single_table(tables: &TableSet) -> Result<&Table> {
    match tables.tables() {
        [table] => Ok(table),
        all => Err(OutputError::MultipleTables {
            count: all.len(),
            tables: all
                .iter()
                .map(|table| table.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }),
    }
}
