//! Schema snapshots and their choice lists.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::field::{Labels, Section};

/// One option of a choice list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    /// Value stored in submissions.
    pub name: String,
    #[serde(default)]
    pub labels: Labels,
}

impl Choice {
    pub fn new(name: impl Into<String>, labels: Labels) -> Self {
        Self {
            name: name.into(),
            labels,
        }
    }
}

/// Ordered options shared by select questions referencing `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceList {
    pub name: String,
    pub choices: Vec<Choice>,
}

impl ChoiceList {
    pub fn new(name: impl Into<String>, choices: Vec<Choice>) -> Self {
        Self {
            name: name.into(),
            choices,
        }
    }

    pub fn get(&self, value: &str) -> Option<&Choice> {
        self.choices.iter().find(|choice| choice.name == value)
    }
}

/// One schema snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    id: Option<String>,
    root: Section,
    /// Translation names; `None` is the unnamed (untranslated) column.
    translations: Vec<Option<String>>,
    choices: BTreeMap<String, ChoiceList>,
}

impl Version {
    /// A version with no translations gets a single unnamed one.
    pub fn new(
        id: Option<String>,
        root: Section,
        translations: Vec<Option<String>>,
        choice_lists: Vec<ChoiceList>,
    ) -> Self {
        let translations = if translations.is_empty() {
            vec![None]
        } else {
            translations
        };
        let choices = choice_lists
            .into_iter()
            .map(|list| (list.name.clone(), list))
            .collect();
        Self {
            id,
            root,
            translations,
            choices,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Identifier used in messages; unnamed versions read as `<unnamed>`.
    pub fn display_id(&self) -> &str {
        self.id.as_deref().unwrap_or("<unnamed>")
    }

    pub fn root(&self) -> &Section {
        &self.root
    }

    pub(crate) fn root_mut(&mut self) -> &mut Section {
        &mut self.root
    }

    pub fn translations(&self) -> &[Option<String>] {
        &self.translations
    }

    /// Position of a named translation.
    pub fn translation_index(&self, name: &str) -> Option<usize> {
        self.translations
            .iter()
            .position(|translation| translation.as_deref() == Some(name))
    }

    /// Position of the unnamed translation, else the default (first) one.
    pub fn untranslated_index(&self) -> usize {
        self.translations
            .iter()
            .position(Option::is_none)
            .unwrap_or(0)
    }

    pub fn choice_list(&self, name: &str) -> Option<&ChoiceList> {
        self.choices.get(name)
    }

    pub fn choice_lists(&self) -> impl Iterator<Item = &ChoiceList> {
        self.choices.values()
    }

    /// Root and every nested repeat section, depth first.
    pub fn sections(&self) -> Vec<&Section> {
        self.root.sections()
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections()
            .into_iter()
            .find(|section| section.name() == name)
    }
}
