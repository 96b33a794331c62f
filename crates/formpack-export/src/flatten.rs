//! Row flattening: one submission becomes rows of every planned table.
//!
//! The section tree is walked with an explicit stack of frames pairing a
//! section with the submission object holding its values. `_index` counters
//! belong to the [`Flattener`] and keep counting across submissions.

use std::collections::BTreeMap;

use formpack_model::{Field, FieldType, GeoKind, ScopeEntry, Section, Version};
use serde_json::{Map, Value};
use tracing::debug;

use crate::constants::GEOPOINT_PARTS;
use crate::header::{ColumnSource, FieldKind, HeaderPlan, PlannedField, repeat_key};
use crate::multiselect::Expansion;
use crate::table::CellValue;

/// A row destined for the table at `table` in the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFragment {
    pub table: usize,
    pub cells: Vec<CellValue>,
}

struct Frame<'a> {
    section: &'a Section,
    values: &'a Map<String, Value>,
    /// Key prefix of this section's values, `""` at the root.
    prefix: String,
    /// Repeat path of the section, `""` at the root.
    key: String,
    table: usize,
    parent_index: Option<u64>,
}

/// Flattens submissions against one header plan.
#[derive(Debug)]
pub struct Flattener<'p> {
    plan: &'p HeaderPlan,
    counters: Vec<u64>,
}

impl<'p> Flattener<'p> {
    pub fn new(plan: &'p HeaderPlan) -> Self {
        Self {
            plan,
            counters: vec![0; plan.tables().len()],
        }
    }

    /// Rows produced by one submission, parents before their children.
    pub fn flatten(&mut self, version: &Version, submission: &Map<String, Value>) -> Vec<RowFragment> {
        let plan = self.plan;
        let mut fragments = Vec::new();
        let mut stack = vec![Frame {
            section: version.root(),
            values: submission,
            prefix: String::new(),
            key: String::new(),
            table: 0,
            parent_index: None,
        }];

        while let Some(frame) = stack.pop() {
            self.counters[frame.table] += 1;
            let index = self.counters[frame.table];
            let table = &plan.tables()[frame.table];
            let scope: BTreeMap<&str, ScopeEntry<'_>> = frame
                .section
                .scope()
                .into_iter()
                .map(|entry| (entry.field.name(), entry))
                .collect();

            let mut field_cells = Vec::new();
            for planned in &table.fields {
                let entry = scope.get(planned.name.as_str()).filter(|e| e.field.is_leaf());
                let raw = entry.and_then(|entry| lookup(frame.values, &frame.prefix, entry));
                field_cells.extend(self.render(planned, entry.map(|e| e.field), raw));
            }
            let mut field_cells = field_cells.into_iter();
            let cells: Vec<CellValue> = table
                .columns
                .iter()
                .map(|column| match &column.source {
                    ColumnSource::Field { .. } => field_cells.next().unwrap_or_default(),
                    // Copied from the submission root on every row it yields.
                    ColumnSource::Copy { name } => {
                        CellValue::from(submission.get(name).and_then(value_text))
                    }
                    ColumnSource::Index => CellValue::Integer(index),
                    ColumnSource::ParentTable => {
                        CellValue::text(table.parent.clone().unwrap_or_default())
                    }
                    ColumnSource::ParentIndex => {
                        frame.parent_index.map(CellValue::Integer).unwrap_or_default()
                    }
                })
                .collect();
            debug_assert!(field_cells.next().is_none());

            fragments.push(RowFragment {
                table: frame.table,
                cells,
            });

            let mut children = Vec::new();
            for entry in frame.section.scope() {
                let Field::Repeat(section) = entry.field else {
                    continue;
                };
                let key = repeat_key(&frame.key, section.name());
                let Some(child_table) = plan.repeat_table(&key) else {
                    continue;
                };
                let path = format!("{}{}", frame.prefix, entry.relative_path());
                let instances = match lookup(frame.values, &frame.prefix, &entry) {
                    None | Some(Value::Null) => continue,
                    Some(Value::Array(items)) => items.iter().collect::<Vec<_>>(),
                    Some(single @ Value::Object(_)) => vec![single],
                    Some(other) => {
                        debug!(repeat = %path, value = %other, "skipping malformed repeat");
                        continue;
                    }
                };
                for (position, instance) in instances.into_iter().enumerate() {
                    let Value::Object(values) = instance else {
                        debug!(repeat = %path, position, "skipping malformed repeat instance");
                        continue;
                    };
                    children.push(Frame {
                        section,
                        values,
                        prefix: format!("{path}/"),
                        key: key.clone(),
                        table: child_table,
                        parent_index: Some(index),
                    });
                }
            }
            stack.extend(children.into_iter().rev());
        }
        fragments
    }

    /// Cells of one planned field, as many as its planned headers.
    fn render(&self, planned: &PlannedField, field: Option<&Field>, raw: Option<&Value>) -> Vec<CellValue> {
        let expander = self.plan.expander();
        let text = raw.and_then(value_text);
        let is_select = field.is_some_and(|field| {
            matches!(
                field.field_type(),
                FieldType::SelectOne | FieldType::SelectMultiple
            )
        });

        match planned.kind {
            FieldKind::SelectMultiple => {
                let expansion = match (field.map(Field::field_type), text) {
                    (_, None) => expander.empty(&planned.choices),
                    (Some(FieldType::SelectMultiple), Some(text)) => {
                        expander.expand(&planned.choices, &text)
                    }
                    (_, Some(text)) => {
                        // Single answer from a version where the field was
                        // not multiple: summary only.
                        let summary = if is_select {
                            planned.choice_label(&text).map(str::to_string).unwrap_or(text)
                        } else {
                            text
                        };
                        let mode = expander.mode();
                        Expansion {
                            summary: mode.has_summary().then_some(summary),
                            details: mode
                                .has_details()
                                .then(|| vec![String::new(); planned.choices.len()]),
                        }
                    }
                };
                expansion.into_cells().into_iter().map(CellValue::text).collect()
            }
            FieldKind::SelectOne => {
                let value = text.map(|text| {
                    if is_select {
                        planned.choice_label(&text).map(str::to_string).unwrap_or(text)
                    } else {
                        text
                    }
                });
                vec![CellValue::from(value)]
            }
            FieldKind::Geo(GeoKind::Point) => {
                let parts: Vec<CellValue> = {
                    let tokens: Vec<&str> = text.as_deref().unwrap_or("").split_whitespace().collect();
                    (0..GEOPOINT_PARTS.len())
                        .map(|index| CellValue::text(tokens.get(index).copied().unwrap_or("")))
                        .collect()
                };
                let mut cells = vec![CellValue::from(text)];
                cells.extend(parts);
                cells
            }
            FieldKind::Plain | FieldKind::Geo(_) => vec![CellValue::from(text)],
        }
    }
}

/// Value of a scope entry: full path first, then the section-relative path,
/// then the bare name.
fn lookup<'v>(values: &'v Map<String, Value>, prefix: &str, entry: &ScopeEntry<'_>) -> Option<&'v Value> {
    let relative = entry.relative_path();
    values
        .get(&format!("{prefix}{relative}"))
        .or_else(|| values.get(&relative))
        .or_else(|| values.get(entry.field.name()))
}

/// Text of a scalar submission value; `null` is missing.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        other => Some(other.to_string()),
    }
}
