//! Flattened export output.

use std::borrow::Cow;
use std::fmt;

use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};

use crate::header::{ColumnSpec, TablePlan};

/// One output cell.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CellValue {
    Text(String),
    /// Synthetic `_index` / `_parent_index` values.
    Integer(u64),
    #[default]
    Empty,
}

impl CellValue {
    /// Text cell; the empty string becomes [`CellValue::Empty`].
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value)
        }
    }

    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            CellValue::Text(value) => Cow::Borrowed(value),
            CellValue::Integer(value) => Cow::Owned(value.to_string()),
            CellValue::Empty => Cow::Borrowed(""),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

impl From<Option<String>> for CellValue {
    fn from(value: Option<String>) -> Self {
        value.map(CellValue::text).unwrap_or_default()
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

/// Empty cells serialize as `""`, integers as numbers.
impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Text(value) => serializer.serialize_str(value),
            CellValue::Integer(value) => serializer.serialize_u64(*value),
            CellValue::Empty => serializer.serialize_str(""),
        }
    }
}

/// One output table: the root section or one repeat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    pub parent: Option<String>,
    pub columns: Vec<ColumnSpec>,
    pub tag_row: Option<Vec<String>>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn from_plan(plan: &TablePlan) -> Self {
        Self {
            name: plan.name.clone(),
            parent: plan.parent.clone(),
            columns: plan.columns.clone(),
            tag_row: plan.tag_row.clone(),
            rows: Vec::new(),
        }
    }

    /// Header labels, in column order.
    pub fn labels(&self) -> Vec<&str> {
        self.columns.iter().map(|column| column.label.as_str()).collect()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.label == label)
    }

    /// Cells of the column labelled `label`, top to bottom.
    pub fn column(&self, label: &str) -> Option<Vec<&CellValue>> {
        let index = self.column_index(label)?;
        Some(self.rows.iter().map(|row| &row[index]).collect())
    }

    /// Rows rendered as text.
    pub fn text_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(|cell| cell.as_text().into_owned()).collect())
            .collect()
    }
}

/// `{"fields": [...], "data": [[...], ...]}`
impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Table", 2)?;
        state.serialize_field("fields", &self.labels())?;
        state.serialize_field("data", &self.rows)?;
        state.end()
    }
}

/// Ordered tables of one export: root first, repeats in schema order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableSet {
    tables: Vec<Table>,
}

impl TableSet {
    pub fn new(tables: Vec<Table>) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn into_tables(self) -> Vec<Table> {
        self.tables
    }

    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|table| table.name == name)
    }

    pub fn root(&self) -> Option<&Table> {
        self.tables.first()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Table> {
        self.tables.iter()
    }

    pub fn row_count(&self) -> usize {
        self.tables.iter().map(|table| table.rows.len()).sum()
    }
}

impl<'a> IntoIterator for &'a TableSet {
    type Item = &'a Table;
    type IntoIter = std::slice::Iter<'a, Table>;

    fn into_iter(self) -> Self::IntoIter {
        self.tables.iter()
    }
}

/// `{table name: table}` in table order.
impl Serialize for TableSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.tables.len()))?;
        for table in &self.tables {
            map.serialize_entry(&table.name, table)?;
        }
        map.end()
    }
}
