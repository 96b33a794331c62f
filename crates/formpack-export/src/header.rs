//! Header planning: the ordered column plan for one export request.
//!
//! Versions are walked in selection order. A field keeps the position it
//! was first planned at; fields introduced by later versions are appended
//! to their table. Field identity is `(table, field name)`, so a renamed
//! field is planned as a new column.
//!
//! A repeat table is identified by its repeat path, the names of the repeats
//! enclosing it and its own, ignoring groups. Table names are unique within a
//! plan: a repeat whose name is taken is named after its parent table too.

use std::collections::BTreeSet;

use formpack_model::{Field, FieldType, FormPack, GeoKind, Section, Version, VersionSelector};
use serde::Serialize;
use tracing::debug;

use crate::constants::{
    GEOPOINT_PARTS, INDEX_COLUMN, OR_OTHER_VALUE, PARENT_INDEX_COLUMN, PARENT_TABLE_COLUMN,
    tag_separator,
};
use crate::error::Result;
use crate::labels::LabelResolver;
use crate::multiselect::{MultiSelectExpander, PlannedChoice, SelectPart};
use crate::options::ExportOptions;

/// Rendering shape of a planned field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Plain,
    SelectOne,
    SelectMultiple,
    Geo(GeoKind),
}

impl FieldKind {
    fn of(field: &Field) -> Self {
        match field.field_type() {
            FieldType::SelectOne => FieldKind::SelectOne,
            FieldType::SelectMultiple => FieldKind::SelectMultiple,
            FieldType::Geo(kind) => FieldKind::Geo(kind),
            _ => FieldKind::Plain,
        }
    }

    /// Select-one may widen to select-multiple across versions, and a plain
    /// question to either select kind.
    fn rank(self) -> Option<u8> {
        match self {
            FieldKind::Plain => Some(0),
            FieldKind::SelectOne => Some(1),
            FieldKind::SelectMultiple => Some(2),
            FieldKind::Geo(_) => None,
        }
    }
}

/// Which part of a field's value a column carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldPart {
    Value,
    Select(SelectPart),
    /// Index into [`GEOPOINT_PARTS`].
    Geo(usize),
}

/// Where the cells of a column come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ColumnSource {
    Field {
        name: String,
        kind: FieldKind,
        part: FieldPart,
    },
    Copy {
        name: String,
    },
    Index,
    ParentTable,
    ParentIndex,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSpec {
    pub label: String,
    pub source: ColumnSource,
    /// Tag header cell; empty when the column has no tag in the requested
    /// namespaces.
    pub tag: String,
}

impl ColumnSpec {
    /// Name of the source field, for field columns.
    pub fn field_name(&self) -> Option<&str> {
        match &self.source {
            ColumnSource::Field { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// One field of a table plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedField {
    pub name: String,
    pub label: String,
    pub type_name: String,
    pub kind: FieldKind,
    /// Choices of select fields, deduplicated by value in first-seen order.
    pub choices: Vec<PlannedChoice>,
    pub tags: Vec<String>,
}

impl PlannedField {
    /// Label of a choice value, if known.
    pub fn choice_label(&self, value: &str) -> Option<&str> {
        self.choices
            .iter()
            .find(|choice| choice.value == value)
            .map(|choice| choice.label.as_str())
    }

    /// Column labels and parts, in cell order.
    pub fn headers(&self, expander: &MultiSelectExpander, sep: &str) -> Vec<(String, FieldPart)> {
        match self.kind {
            FieldKind::SelectMultiple => expander
                .headers(&self.label, &self.choices, sep)
                .into_iter()
                .map(|(label, part)| (label, FieldPart::Select(part)))
                .collect(),
            FieldKind::Geo(GeoKind::Point) => {
                let mut headers = vec![(self.label.clone(), FieldPart::Value)];
                headers.extend(GEOPOINT_PARTS.iter().enumerate().map(|(index, part)| {
                    (format!("_{}_{part}", self.label), FieldPart::Geo(index))
                }));
                headers
            }
            _ => vec![(self.label.clone(), FieldPart::Value)],
        }
    }

    fn merge(&mut self, other: PlannedField) {
        self.label = other.label;
        if let (Some(current), Some(next)) = (self.kind.rank(), other.kind.rank())
            && next > current
        {
            self.kind = other.kind;
        }
        for choice in other.choices {
            if !self.choices.iter().any(|known| known.value == choice.value) {
                self.choices.push(choice);
            }
        }
        for tag in other.tags {
            if !self.tags.contains(&tag) {
                self.tags.push(tag);
            }
        }
    }
}

/// Planned output table: the root section or one repeat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TablePlan {
    pub name: String,
    /// Repeat path, empty for the root table.
    pub key: String,
    pub parent: Option<String>,
    pub fields: Vec<PlannedField>,
    pub columns: Vec<ColumnSpec>,
    pub has_index: bool,
    /// Second header row, when tag namespaces were requested.
    pub tag_row: Option<Vec<String>>,
}

impl TablePlan {
    pub fn labels(&self) -> Vec<&str> {
        self.columns.iter().map(|column| column.label.as_str()).collect()
    }

    pub fn field(&self, name: &str) -> Option<&PlannedField> {
        self.fields.iter().find(|field| field.name == name)
    }
}

/// Column plan for one export request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderPlan {
    tables: Vec<TablePlan>,
    /// Selected version positions, in selection order.
    versions: Vec<usize>,
    copy_fields: Vec<String>,
    #[serde(skip)]
    expander: MultiSelectExpander,
}

impl HeaderPlan {
    pub fn tables(&self) -> &[TablePlan] {
        &self.tables
    }

    /// The root table; always planned.
    pub fn root(&self) -> &TablePlan {
        &self.tables[0]
    }

    pub fn table(&self, name: &str) -> Option<&TablePlan> {
        self.tables.iter().find(|table| table.name == name)
    }

    /// Position of the table planned for the repeat at `key`.
    pub fn repeat_table(&self, key: &str) -> Option<usize> {
        self.tables
            .iter()
            .skip(1)
            .position(|table| table.key == key)
            .map(|index| index + 1)
    }

    pub fn versions(&self) -> &[usize] {
        &self.versions
    }

    pub fn copy_fields(&self) -> &[String] {
        &self.copy_fields
    }

    pub fn expander(&self) -> &MultiSelectExpander {
        &self.expander
    }
}

/// Build the column plan for `options` over `pack`.
pub fn plan(pack: &FormPack, options: &ExportOptions) -> Result<HeaderPlan> {
    let selected = select_versions(pack, &options.versions)?;
    let planned = if options.fields_from_all_versions {
        &selected[..]
    } else {
        &selected[selected.len() - 1..]
    };

    let mut planner = Planner::new(pack.title(), options);
    for &index in planned {
        planner.add_version(&pack.versions()[index]);
    }
    Ok(planner.finish(selected))
}

/// Resolve selectors to version positions, dropping repeats. No selector
/// means the latest version.
fn select_versions(pack: &FormPack, selectors: &[VersionSelector]) -> Result<Vec<usize>> {
    if selectors.is_empty() {
        return Ok(vec![pack.versions().len() - 1]);
    }
    let mut selected = Vec::with_capacity(selectors.len());
    for selector in selectors {
        let index = pack.index_of(selector)?;
        if !selected.contains(&index) {
            selected.push(index);
        }
    }
    Ok(selected)
}

struct TableBuilder {
    name: String,
    key: String,
    parent: Option<usize>,
    fields: Vec<PlannedField>,
}

struct PlanFrame<'v> {
    section: &'v Section,
    key: String,
    parent: Option<usize>,
    /// Resolved labels of enclosing groups and repeats.
    prefix: Vec<String>,
}

struct Planner<'o> {
    options: &'o ExportOptions,
    root_name: String,
    tables: Vec<TableBuilder>,
}

impl<'o> Planner<'o> {
    fn new(root_name: &str, options: &'o ExportOptions) -> Self {
        Self {
            options,
            root_name: root_name.to_string(),
            tables: vec![TableBuilder {
                name: root_name.to_string(),
                key: String::new(),
                parent: None,
                fields: Vec::new(),
            }],
        }
    }

    fn add_version(&mut self, version: &Version) {
        let resolver = LabelResolver::new(version, &self.options.lang);
        let mut stack = vec![PlanFrame {
            section: version.root(),
            key: String::new(),
            parent: None,
            prefix: Vec::new(),
        }];

        while let Some(frame) = stack.pop() {
            let table = self.table_for(&frame);
            let mut nested = Vec::new();
            for entry in frame.section.scope() {
                let mut prefix = frame.prefix.clone();
                prefix.extend(entry.groups.iter().map(|group| resolver.field_label(&group.info)));
                match entry.field {
                    Field::Repeat(section) => {
                        prefix.push(resolver.field_label(&section.info));
                        nested.push(PlanFrame {
                            section,
                            key: repeat_key(&frame.key, section.name()),
                            parent: Some(table),
                            prefix,
                        });
                    }
                    field => self.add_leaf(table, field, &prefix, version, &resolver),
                }
            }
            stack.extend(nested.into_iter().rev());
        }
    }

    fn table_for(&mut self, frame: &PlanFrame<'_>) -> usize {
        let Some(parent) = frame.parent else {
            return 0;
        };
        if let Some(index) = self
            .tables
            .iter()
            .skip(1)
            .position(|table| table.key == frame.key)
        {
            return index + 1;
        }
        let name = self.unique_name(frame.section.name(), parent);
        if name != frame.section.name() {
            debug!(repeat = %frame.key, table = %name, "renamed repeat table");
        }
        self.tables.push(TableBuilder {
            name,
            key: frame.key.clone(),
            parent: Some(parent),
            fields: Vec::new(),
        });
        self.tables.len() - 1
    }

    /// `name`, else `{parent}/{name}`, else that with a ` (n)` suffix.
    fn unique_name(&self, name: &str, parent: usize) -> String {
        let taken = |candidate: &str| self.tables.iter().any(|table| table.name == candidate);
        if !taken(name) {
            return name.to_string();
        }
        let qualified = format!("{}/{name}", self.tables[parent].name);
        let mut candidate = qualified.clone();
        let mut suffix = 1;
        while taken(&candidate) {
            suffix += 1;
            candidate = format!("{qualified} ({suffix})");
        }
        candidate
    }

    fn add_leaf(
        &mut self,
        table: usize,
        field: &Field,
        prefix: &[String],
        version: &Version,
        resolver: &LabelResolver,
    ) {
        if field.is_note() {
            return;
        }
        if let Some(allowed) = &self.options.fields
            && !allowed.iter().any(|name| name == field.name())
        {
            return;
        }

        let own = resolver.field_label(field.info());
        let label = if self.options.hierarchy_in_labels && !prefix.is_empty() {
            let sep = &self.options.group_sep;
            format!("{}{sep}{own}", prefix.join(sep))
        } else {
            own
        };
        let planned = PlannedField {
            name: field.name().to_string(),
            label,
            type_name: field.info().type_name.clone(),
            kind: FieldKind::of(field),
            choices: planned_choices(field, version, resolver),
            tags: field.info().tags.clone(),
        };

        let fields = &mut self.tables[table].fields;
        match fields.iter_mut().find(|known| known.name == planned.name) {
            Some(known) => known.merge(planned),
            None => fields.push(planned),
        }
    }

    fn finish(self, versions: Vec<usize>) -> HeaderPlan {
        let options = self.options;
        let kept = kept_tables(&self.tables, options.fields.is_some());
        let expander = MultiSelectExpander::new(options.multiple_select);

        let mut tables = Vec::new();
        for (index, table) in self.tables.iter().enumerate() {
            if !kept[index] {
                continue;
            }
            let has_children = self
                .tables
                .iter()
                .enumerate()
                .any(|(child, t)| kept[child] && t.parent == Some(index));
            let parent = table.parent.map(|p| self.tables[p].name.clone());
            tables.push(table_plan(table, parent, has_children, options, &expander));
        }
        debug!(
            root = %self.root_name,
            tables = tables.len(),
            columns = tables.iter().map(|t| t.columns.len()).sum::<usize>(),
            "planned export header"
        );

        HeaderPlan {
            tables,
            versions,
            copy_fields: options.copy_fields.clone(),
            expander,
        }
    }
}

/// With an allow-list, repeat tables without any selected field in their
/// subtree are dropped. The root table is always kept.
fn kept_tables(tables: &[TableBuilder], filtered: bool) -> Vec<bool> {
    if !filtered {
        return vec![true; tables.len()];
    }
    let mut kept: Vec<bool> = tables.iter().map(|t| !t.fields.is_empty()).collect();
    kept[0] = true;
    // Children are always created after their parent.
    for index in (1..tables.len()).rev() {
        if kept[index]
            && let Some(parent) = tables[index].parent
        {
            kept[parent] = true;
        }
    }
    kept
}

fn table_plan(
    table: &TableBuilder,
    parent: Option<String>,
    has_children: bool,
    options: &ExportOptions,
    expander: &MultiSelectExpander,
) -> TablePlan {
    let mut columns = Vec::new();
    for field in &table.fields {
        let tag = tag_cell(&field.tags, &options.tag_cols_for_header);
        columns.extend(
            field
                .headers(expander, &options.group_sep)
                .into_iter()
                .map(|(label, part)| ColumnSpec {
                    label,
                    source: ColumnSource::Field {
                        name: field.name.clone(),
                        kind: field.kind,
                        part,
                    },
                    tag: tag.clone(),
                }),
        );
    }
    columns.extend(options.copy_fields.iter().map(|name| ColumnSpec {
        label: name.clone(),
        source: ColumnSource::Copy { name: name.clone() },
        tag: String::new(),
    }));

    let has_index = has_children || options.force_index;
    if has_index {
        columns.push(synthetic(INDEX_COLUMN, ColumnSource::Index));
    }
    if parent.is_some() {
        columns.push(synthetic(PARENT_TABLE_COLUMN, ColumnSource::ParentTable));
        columns.push(synthetic(PARENT_INDEX_COLUMN, ColumnSource::ParentIndex));
    }

    let tag_row = (!options.tag_cols_for_header.is_empty())
        .then(|| columns.iter().map(|column| column.tag.clone()).collect());

    TablePlan {
        name: table.name.clone(),
        key: table.key.clone(),
        parent,
        fields: table.fields.clone(),
        columns,
        has_index,
        tag_row,
    }
}

/// Repeat path of `name` nested under the repeat at `parent`.
pub fn repeat_key(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

fn synthetic(label: &str, source: ColumnSource) -> ColumnSpec {
    ColumnSpec {
        label: label.to_string(),
        source,
        tag: String::new(),
    }
}

fn planned_choices(field: &Field, version: &Version, resolver: &LabelResolver) -> Vec<PlannedChoice> {
    let Some(list_name) = field.choice_list() else {
        return Vec::new();
    };
    let Some(list) = version.choice_list(list_name) else {
        debug!(
            field = field.name(),
            list = list_name,
            version = version.display_id(),
            "choice list not found"
        );
        return Vec::new();
    };
    let mut seen = BTreeSet::new();
    let mut choices: Vec<PlannedChoice> = list
        .choices
        .iter()
        .filter(|choice| seen.insert(choice.name.as_str()))
        .map(|choice| PlannedChoice {
            value: choice.name.clone(),
            label: resolver.choice_label(choice),
        })
        .collect();
    if field.or_other() && !seen.contains(OR_OTHER_VALUE) {
        choices.push(PlannedChoice {
            value: OR_OTHER_VALUE.to_string(),
            label: resolver.or_other_label(),
        });
    }
    choices
}

/// Tag values per requested namespace, joined by the namespace separator;
/// namespaces are joined by a space.
fn tag_cell(tags: &[String], namespaces: &[String]) -> String {
    namespaces
        .iter()
        .filter_map(|namespace| {
            let values: Vec<&str> = tags
                .iter()
                .filter_map(|tag| {
                    tag.split_once(':')
                        .filter(|(ns, _)| *ns == namespace.as_str())
                        .map(|(_, value)| value)
                })
                .collect();
            (!values.is_empty()).then(|| values.join(tag_separator(namespace)))
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_cells_join_per_namespace() {
        let tags = vec![
            "hxl:#indicator".to_string(),
            "hxl:+diet".to_string(),
            "urban".to_string(),
            "dept:food".to_string(),
        ];
        assert_eq!(tag_cell(&tags, &["hxl".into()]), "#indicator+diet");
        assert_eq!(tag_cell(&tags, &["hxl".into(), "dept".into()]), "#indicator+diet food");
        assert_eq!(tag_cell(&tags, &["other".into()]), "");
    }

    #[test]
    fn kind_only_widens_among_selects() {
        assert!(FieldKind::SelectMultiple.rank() > FieldKind::SelectOne.rank());
        assert_eq!(FieldKind::Geo(GeoKind::Point).rank(), None);
    }
}
