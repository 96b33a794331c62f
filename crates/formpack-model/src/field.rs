//! Field tree types.
//!
//! A [`Section`] is a table-producing scope: the form root or a repeat.
//! [`Group`]s are transparent containers inside a section. Leaves are the
//! remaining [`Field`] variants.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Labels aligned with a version's translation list.
///
/// Entry `i` is the label for translation `i`; `None` or an empty string
/// means the entity is untranslated for that language.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Labels(Vec<Option<String>>);

impl Labels {
    pub fn new(entries: Vec<Option<String>>) -> Self {
        Self(entries)
    }

    /// Labels for a form with a single translation.
    pub fn single(label: impl Into<String>) -> Self {
        Self(vec![Some(label.into())])
    }

    /// Label for the translation at `index`, if present and non-empty.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.0
            .get(index)
            .and_then(|entry| entry.as_deref())
            .filter(|label| !label.is_empty())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|entry| entry.as_deref().is_none_or(str::is_empty))
    }

    pub fn entries(&self) -> &[Option<String>] {
        &self.0
    }
}

impl From<Vec<Option<String>>> for Labels {
    fn from(entries: Vec<Option<String>>) -> Self {
        Self(entries)
    }
}

/// Attributes shared by every field variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    /// Schema identifier, unique within the owning section.
    pub name: String,
    /// Schema type as written in the form definition (`text`, `start`, ...).
    pub type_name: String,
    #[serde(default)]
    pub labels: Labels,
    /// Tags; namespaced tags are stored as `namespace:value`.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl FieldInfo {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            labels: Labels::default(),
            tags: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_labels(mut self, labels: Labels) -> Self {
        self.labels = labels;
        self
    }

    #[must_use]
    pub fn with_label(self, label: impl Into<String>) -> Self {
        self.with_labels(Labels::single(label))
    }

    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Values of the tags stored under `namespace`, in declaration order.
    pub fn tag_values<'a>(&'a self, namespace: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.tags.iter().filter_map(move |tag| {
            tag.split_once(':')
                .filter(|(ns, _)| *ns == namespace)
                .map(|(_, value)| value)
        })
    }
}

/// Geographic field shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeoKind {
    Point,
    Trace,
    Shape,
}

impl GeoKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeoKind::Point => "geopoint",
            GeoKind::Trace => "geotrace",
            GeoKind::Shape => "geoshape",
        }
    }

    pub fn from_type_name(type_name: &str) -> Option<Self> {
        match type_name {
            "geopoint" => Some(GeoKind::Point),
            "geotrace" => Some(GeoKind::Trace),
            "geoshape" => Some(GeoKind::Shape),
            _ => None,
        }
    }
}

/// Closed set of type tags, one per [`Field`] variant (geo split by shape).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Question,
    Group,
    Repeat,
    SelectOne,
    SelectMultiple,
    Geo(GeoKind),
    Meta,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Question => f.write_str("question"),
            FieldType::Group => f.write_str("group"),
            FieldType::Repeat => f.write_str("repeat"),
            FieldType::SelectOne => f.write_str("select_one"),
            FieldType::SelectMultiple => f.write_str("select_multiple"),
            FieldType::Geo(kind) => f.write_str(kind.as_str()),
            FieldType::Meta => f.write_str("meta"),
        }
    }
}

/// A select question bound to a choice list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Select {
    pub info: FieldInfo,
    /// `None` for externally supplied choices, which export as plain text.
    pub list_name: Option<String>,
    /// Whether the question accepts a free-text "other" answer.
    #[serde(default)]
    pub or_other: bool,
}

impl Select {
    pub fn new(info: FieldInfo, list_name: impl Into<String>) -> Self {
        Self {
            info,
            list_name: Some(list_name.into()),
            or_other: false,
        }
    }

    #[must_use]
    pub fn with_or_other(mut self, or_other: bool) -> Self {
        self.or_other = or_other;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoField {
    pub info: FieldInfo,
    pub kind: GeoKind,
}

/// A non-repeating group. Transparent for table purposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub info: FieldInfo,
    children: Vec<Field>,
}

impl Group {
    pub fn new(info: FieldInfo, children: Vec<Field>) -> Self {
        Self { info, children }
    }

    pub fn children(&self) -> &[Field] {
        &self.children
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Field {
    Question(FieldInfo),
    Group(Group),
    Repeat(Section),
    SelectOne(Select),
    SelectMultiple(Select),
    Geo(GeoField),
    /// Calculated and metadata fields (`start`, `end`, `calculate`, ...).
    Meta(FieldInfo),
}

impl Field {
    pub fn info(&self) -> &FieldInfo {
        match self {
            Field::Question(info) | Field::Meta(info) => info,
            Field::Group(group) => &group.info,
            Field::Repeat(section) => &section.info,
            Field::SelectOne(select) | Field::SelectMultiple(select) => &select.info,
            Field::Geo(geo) => &geo.info,
        }
    }

    pub fn name(&self) -> &str {
        &self.info().name
    }

    pub fn labels(&self) -> &Labels {
        &self.info().labels
    }

    pub fn field_type(&self) -> FieldType {
        match self {
            Field::Question(_) => FieldType::Question,
            Field::Group(_) => FieldType::Group,
            Field::Repeat(_) => FieldType::Repeat,
            Field::SelectOne(_) => FieldType::SelectOne,
            Field::SelectMultiple(_) => FieldType::SelectMultiple,
            Field::Geo(geo) => FieldType::Geo(geo.kind),
            Field::Meta(_) => FieldType::Meta,
        }
    }

    /// Choice list referenced by a select field.
    pub fn choice_list(&self) -> Option<&str> {
        match self {
            Field::SelectOne(select) | Field::SelectMultiple(select) => select.list_name.as_deref(),
            _ => None,
        }
    }

    /// Whether a select accepts an "other" answer besides its list.
    pub fn or_other(&self) -> bool {
        match self {
            Field::SelectOne(select) | Field::SelectMultiple(select) => select.or_other,
            _ => false,
        }
    }

    /// True for fields that hold a value in a submission.
    pub fn is_leaf(&self) -> bool {
        !matches!(self, Field::Group(_) | Field::Repeat(_))
    }

    /// Notes carry no data and never produce columns.
    pub fn is_note(&self) -> bool {
        self.info().type_name == "note"
    }
}

/// A leaf or repeat reached from a section, with the groups crossed on the
/// way, outermost first.
#[derive(Debug, Clone)]
pub struct ScopeEntry<'a> {
    pub field: &'a Field,
    pub groups: Vec<&'a Group>,
}

impl ScopeEntry<'_> {
    /// Slash-joined path of group names and the field name, relative to the
    /// owning section.
    pub fn relative_path(&self) -> String {
        let mut parts: Vec<&str> = self.groups.iter().map(|g| g.info.name.as_str()).collect();
        parts.push(self.field.name());
        parts.join("/")
    }
}

/// Table-producing scope: the form root or a repeat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub info: FieldInfo,
    children: Vec<Field>,
}

impl Section {
    /// Build a section, rejecting duplicate names within its scope.
    ///
    /// Groups are transparent for the uniqueness rule; nested repeats own
    /// their own scope but their name belongs to this one.
    pub fn new(info: FieldInfo, children: Vec<Field>) -> Result<Self> {
        let section = Self { info, children };
        let mut seen = BTreeSet::new();
        for name in section.scope_names() {
            if !seen.insert(name) {
                return Err(ModelError::DuplicateField {
                    section: section.info.name.clone(),
                    name: name.to_string(),
                });
            }
        }
        Ok(section)
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn children(&self) -> &[Field] {
        &self.children
    }

    /// Append a field at the end of the section.
    pub fn push(&mut self, field: Field) -> Result<()> {
        let mut names = vec![field.name()];
        if let Field::Group(group) = &field {
            names.extend(collect_names(group.children()));
        }
        let existing: BTreeSet<&str> = self.scope_names().into_iter().collect();
        if let Some(name) = names.into_iter().find(|name| existing.contains(name)) {
            return Err(ModelError::DuplicateField {
                section: self.info.name.clone(),
                name: name.to_string(),
            });
        }
        self.children.push(field);
        Ok(())
    }

    /// Leaves and repeats in schema order, descending through groups.
    pub fn scope(&self) -> Vec<ScopeEntry<'_>> {
        let mut entries = Vec::new();
        // (remaining children, groups crossed so far)
        let mut stack: Vec<(std::slice::Iter<'_, Field>, Vec<&Group>)> =
            vec![(self.children.iter(), Vec::new())];
        while let Some((iter, groups)) = stack.last_mut() {
            let Some(field) = iter.next() else {
                stack.pop();
                continue;
            };
            match field {
                Field::Group(group) => {
                    let mut nested = groups.clone();
                    nested.push(group);
                    stack.push((group.children().iter(), nested));
                }
                _ => entries.push(ScopeEntry {
                    field,
                    groups: groups.clone(),
                }),
            }
        }
        entries
    }

    /// Names of the data-bearing leaves of this section, in schema order.
    pub fn field_names(&self) -> Vec<&str> {
        self.scope()
            .into_iter()
            .filter(|entry| entry.field.is_leaf())
            .map(|entry| entry.field.name())
            .collect()
    }

    /// Find a leaf or repeat of this scope by name.
    pub fn field(&self, name: &str) -> Option<ScopeEntry<'_>> {
        self.scope()
            .into_iter()
            .find(|entry| entry.field.name() == name)
    }

    /// Repeats directly owned by this scope.
    pub fn repeats(&self) -> Vec<&Section> {
        self.scope()
            .into_iter()
            .filter_map(|entry| match entry.field {
                Field::Repeat(section) => Some(section),
                _ => None,
            })
            .collect()
    }

    /// This section and every nested repeat, depth first.
    pub fn sections(&self) -> Vec<&Section> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(section) = stack.pop() {
            out.push(section);
            let mut nested = section.repeats();
            nested.reverse();
            stack.extend(nested);
        }
        out
    }

    fn scope_names(&self) -> Vec<&str> {
        collect_names(&self.children)
    }
}

/// Names in a scope: every field and group, not descending into repeats.
fn collect_names(children: &[Field]) -> Vec<&str> {
    let mut names = Vec::new();
    let mut stack: Vec<&Field> = children.iter().rev().collect();
    while let Some(field) = stack.pop() {
        names.push(field.name());
        if let Field::Group(group) = field {
            stack.extend(group.children().iter().rev());
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(name: &str) -> Field {
        Field::Question(FieldInfo::new(name, "text"))
    }

    #[test]
    fn scope_descends_through_groups_in_order() {
        let inner = Group::new(FieldInfo::new("sg1", "begin_group"), vec![question("g1sg1q1")]);
        let group = Group::new(
            FieldInfo::new("g1", "begin_group"),
            vec![question("g1q1"), Field::Group(inner), question("g1q2")],
        );
        let section = Section::new(
            FieldInfo::new("Grouped questions", "survey"),
            vec![question("q1"), Field::Group(group), question("qz")],
        )
        .unwrap();

        assert_eq!(
            section.field_names(),
            vec!["q1", "g1q1", "g1sg1q1", "g1q2", "qz"]
        );
        let entry = section.field("g1sg1q1").unwrap();
        assert_eq!(entry.relative_path(), "g1/sg1/g1sg1q1");
    }

    #[test]
    fn duplicate_names_across_groups_are_rejected() {
        let group = Group::new(FieldInfo::new("g1", "begin_group"), vec![question("q1")]);
        let err = Section::new(
            FieldInfo::new("root", "survey"),
            vec![question("q1"), Field::Group(group)],
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::DuplicateField { name, .. } if name == "q1"));
    }

    #[test]
    fn repeats_own_their_scope() {
        let repeat = Section::new(FieldInfo::new("members", "begin_repeat"), vec![question("name")])
            .unwrap();
        let section = Section::new(
            FieldInfo::new("root", "survey"),
            vec![question("name"), Field::Repeat(repeat)],
        )
        .unwrap();
        assert_eq!(section.repeats().len(), 1);
        assert_eq!(section.field_names(), vec!["name"]);
    }

    #[test]
    fn tag_values_filter_by_namespace() {
        let info = FieldInfo::new("q", "text").with_tags(["hxl:#indicator", "hxl:+diet", "urban"]);
        let values: Vec<&str> = info.tag_values("hxl").collect();
        assert_eq!(values, vec!["#indicator", "+diet"]);
    }

    #[test]
    fn empty_labels_count_as_missing() {
        let labels = Labels::new(vec![Some("English".into()), Some(String::new()), None]);
        assert_eq!(labels.get(0), Some("English"));
        assert_eq!(labels.get(1), None);
        assert_eq!(labels.get(2), None);
        assert_eq!(labels.get(7), None);
    }
}
