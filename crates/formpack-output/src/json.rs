//! The in-memory table shape, `{table: {fields, data}}`, as JSON.

use std::io::Write;

use formpack_export::TableSet;

use crate::error::Result;

pub fn write_json<W: Write>(tables: &TableSet, writer: W) -> Result<()> {
    serde_json::to_writer_pretty(writer, tables)?;
    Ok(())
}
