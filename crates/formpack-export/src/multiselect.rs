//! Multiple-select expansion shared by header planning and row flattening.
//!
//! Both sides go through [`MultiSelectExpander`] with the same choice slice,
//! so column names and cell values line up by construction.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::options::MultipleSelect;

/// A choice as planned for one export: value and resolved label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedChoice {
    pub value: String,
    pub label: String,
}

/// Which output a multiple-select column carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectPart {
    Summary,
    /// Per-choice `1`/`0` column, by choice value.
    Detail(String),
}

/// Cells produced for one multiple-select value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Expansion {
    pub summary: Option<String>,
    pub details: Option<Vec<String>>,
}

impl Expansion {
    /// Flatten into cells in column order: summary first, then details.
    pub fn into_cells(self) -> Vec<String> {
        let mut cells: Vec<String> = self.summary.into_iter().collect();
        cells.extend(self.details.unwrap_or_default());
        cells
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultiSelectExpander {
    mode: MultipleSelect,
}

impl MultiSelectExpander {
    pub fn new(mode: MultipleSelect) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> MultipleSelect {
        self.mode
    }

    /// Number of columns a field with `choices` expands into.
    pub fn width(&self, choices: &[PlannedChoice]) -> usize {
        usize::from(self.mode.has_summary())
            + if self.mode.has_details() {
                choices.len()
            } else {
                0
            }
    }

    /// Column labels for a field labelled `label`.
    pub fn headers(
        &self,
        label: &str,
        choices: &[PlannedChoice],
        sep: &str,
    ) -> Vec<(String, SelectPart)> {
        let mut headers = Vec::with_capacity(self.width(choices));
        if self.mode.has_summary() {
            headers.push((label.to_string(), SelectPart::Summary));
        }
        if self.mode.has_details() {
            headers.extend(choices.iter().map(|choice| {
                (
                    format!("{label}{sep}{}", choice.label),
                    SelectPart::Detail(choice.value.clone()),
                )
            }));
        }
        headers
    }

    /// Expand a raw submission value (space-separated choice values).
    ///
    /// Summary labels follow choice-list order; tokens that are not known
    /// choices (free-text "other" answers) are appended raw.
    pub fn expand(&self, choices: &[PlannedChoice], raw: &str) -> Expansion {
        let selected: BTreeSet<&str> = raw.split_whitespace().collect();
        let summary = self.mode.has_summary().then(|| {
            let mut parts: Vec<&str> = choices
                .iter()
                .filter(|choice| selected.contains(choice.value.as_str()))
                .map(|choice| choice.label.as_str())
                .collect();
            let mut seen = BTreeSet::new();
            parts.extend(raw.split_whitespace().filter(|token| {
                !choices.iter().any(|choice| choice.value == *token) && seen.insert(*token)
            }));
            parts.join(" ")
        });
        let details = self.mode.has_details().then(|| {
            choices
                .iter()
                .map(|choice| {
                    if selected.contains(choice.value.as_str()) {
                        "1".to_string()
                    } else {
                        "0".to_string()
                    }
                })
                .collect()
        });
        Expansion { summary, details }
    }

    /// Cells for a field absent from the submission.
    pub fn empty(&self, choices: &[PlannedChoice]) -> Expansion {
        Expansion {
            summary: self.mode.has_summary().then(String::new),
            details: self
                .mode
                .has_details()
                .then(|| vec![String::new(); choices.len()]),
        }
    }
}
