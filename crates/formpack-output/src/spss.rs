//! SPSS label syntax for a planned export.
//!
//! Variables are named after the fields' XML names, so the script applies
//! to data exported with `lang = _xml`. Labels come from the plan, i.e. in
//! the language the plan was built for.

use std::collections::BTreeSet;
use std::io::Write;

use formpack_export::{FieldKind, HeaderPlan, PlannedField};

use crate::error::Result;

/// Quote a string literal, doubling embedded quotes.
fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// SPSS variable name: letters, digits, `_` and `.` only, starting with a
/// letter.
pub fn spss_name(name: &str) -> String {
    let mut clean: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if !clean.chars().next().is_some_and(char::is_alphabetic) {
        clean.insert(0, 'v');
    }
    clean
}

struct Variable {
    name: String,
    label: String,
    values: Vec<(String, String)>,
}

fn variables(field: &PlannedField, details: bool) -> Vec<Variable> {
    let name = spss_name(&field.name);
    let mut out = vec![Variable {
        name: name.clone(),
        label: field.label.clone(),
        values: if field.kind == FieldKind::SelectOne {
            field
                .choices
                .iter()
                .map(|choice| (choice.value.clone(), choice.label.clone()))
                .collect()
        } else {
            Vec::new()
        },
    }];
    if field.kind == FieldKind::SelectMultiple && details {
        out.extend(field.choices.iter().map(|choice| Variable {
            name: spss_name(&format!("{}_{}", field.name, choice.value)),
            label: format!("{} :: {}", field.label, choice.label),
            values: Vec::new(),
        }));
    }
    out
}

/// `VARIABLE LABELS` for every planned field and `VALUE LABELS` for
/// select-one fields, across all tables of the plan.
pub fn spss_labels(plan: &HeaderPlan) -> String {
    let details = plan.expander().mode().has_details();
    let mut seen = BTreeSet::new();
    let vars: Vec<Variable> = plan
        .tables()
        .iter()
        .flat_map(|table| table.fields.iter())
        .flat_map(|field| variables(field, details))
        .filter(|var| seen.insert(var.name.clone()))
        .collect();

    let mut out = String::new();
    if !vars.is_empty() {
        out.push_str("VARIABLE LABELS\n");
        let lines: Vec<String> = vars
            .iter()
            .map(|var| format!("{} {}", var.name, quote(&var.label)))
            .collect();
        out.push_str(&format!(" {}.\n", lines.join("\n /")));
    }

    let labelled: Vec<&Variable> = vars.iter().filter(|var| !var.values.is_empty()).collect();
    if !labelled.is_empty() {
        out.push_str("VALUE LABELS\n");
        let blocks: Vec<String> = labelled
            .iter()
            .map(|var| {
                let mut lines = vec![var.name.clone()];
                lines.extend(
                    var.values
                        .iter()
                        .map(|(value, label)| format!(" {} {}", quote(value), quote(label))),
                );
                lines.join("\n")
            })
            .collect();
        out.push_str(&format!(" {}.\n", blocks.join("\n /")));
    }
    out
}

pub fn write_spss<W: Write>(plan: &HeaderPlan, mut writer: W) -> Result<()> {
    writer.write_all(spss_labels(plan).as_bytes())?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_are_doubled() {
        assert_eq!(quote("it's"), "'it''s'");
    }

    #[test]
    fn names_are_valid_variables() {
        assert_eq!(spss_name("group/q1"), "group_q1");
        assert_eq!(spss_name("_index"), "v_index");
        assert_eq!(spss_name("1st"), "v1st");
    }
}
