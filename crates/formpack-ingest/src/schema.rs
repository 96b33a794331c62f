//! Form pack documents.
//!
//! A pack document is JSON:
//!
//! ```json
//! {"id_string": "...", "title": "...",
//!  "versions": [{"version": "v1",
//!                "content": {"survey": [...], "choices": [...],
//!                            "translations": [null, "French"]}}]}
//! ```
//!
//! Survey rows are flat XLSForm-style rows; groups and repeats are opened
//! and closed by `begin_*`/`end_*` rows.

use std::fs;
use std::path::Path;

use formpack_model::{
    Choice, ChoiceList, Field, FieldInfo, FormPack, GeoField, GeoKind, Group, Labels, Section,
    Select, Version,
};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{IngestError, Result};

/// Title used when a pack document has none.
pub const DEFAULT_TITLE: &str = "Submissions";

/// Types that hold metadata or computed values rather than answers.
pub const META_TYPES: &[&str] = &[
    "start",
    "end",
    "today",
    "deviceid",
    "subscriberid",
    "simserial",
    "phonenumber",
    "username",
    "audit",
    "calculate",
    "hidden",
];

const TAG_NAMESPACE_HXL: &str = "hxl";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackDocument {
    #[serde(default)]
    pub id_string: String,
    #[serde(default)]
    pub title: Option<String>,
    pub versions: Vec<VersionDocument>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionDocument {
    #[serde(default)]
    pub version: Option<String>,
    pub content: ContentDocument,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentDocument {
    #[serde(default)]
    pub survey: Vec<SurveyRow>,
    #[serde(default)]
    pub choices: Vec<ChoiceRow>,
    #[serde(default)]
    pub translations: Vec<Option<String>>,
}

/// A label cell: one string, or one entry per translation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum LabelValue {
    One(String),
    Many(Vec<Option<String>>),
}

impl From<&LabelValue> for Labels {
    fn from(value: &LabelValue) -> Self {
        match value {
            LabelValue::One(label) => Labels::single(label.clone()),
            LabelValue::Many(labels) => Labels::new(labels.clone()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SurveyRow {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "$autoname")]
    pub autoname: Option<String>,
    #[serde(default)]
    pub label: Option<LabelValue>,
    #[serde(default)]
    pub select_from_list_name: Option<String>,
    #[serde(default)]
    pub hxl: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl SurveyRow {
    fn name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .or(self.autoname.as_deref())
            .filter(|name| !name.is_empty())
    }

    fn info(&self, type_name: &str, position: usize) -> Result<FieldInfo> {
        let name = self.name().ok_or_else(|| IngestError::Schema {
            message: format!("survey row {position} ({}) has no name", self.type_name),
        })?;
        let mut tags = self.tags.clone();
        if let Some(hxl) = &self.hxl {
            tags.extend(
                split_hxl(hxl)
                    .into_iter()
                    .map(|token| format!("{TAG_NAMESPACE_HXL}:{token}")),
            );
        }
        let labels = self.label.as_ref().map(Labels::from).unwrap_or_default();
        Ok(FieldInfo::new(name, type_name)
            .with_labels(labels)
            .with_tags(tags))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceRow {
    pub list_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "$autoname")]
    pub autoname: Option<String>,
    #[serde(default)]
    pub label: Option<LabelValue>,
}

/// Parsed `type` column.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RowKind {
    BeginGroup,
    EndGroup,
    BeginRepeat,
    EndRepeat,
    SelectOne {
        list: Option<String>,
        or_other: bool,
    },
    SelectMultiple {
        list: Option<String>,
        or_other: bool,
    },
    Geo(GeoKind),
    Meta(String),
    Question(String),
}

impl RowKind {
    fn parse(row: &SurveyRow) -> Self {
        let mut words = row.type_name.split_whitespace();
        let head = words.next().unwrap_or_default();
        let rest: Vec<&str> = words.collect();
        match (head, rest.as_slice()) {
            ("begin_group", _) | ("begin", ["group", ..]) => RowKind::BeginGroup,
            ("end_group", _) | ("end", ["group", ..]) => RowKind::EndGroup,
            ("begin_repeat", _) | ("begin", ["repeat", ..]) => RowKind::BeginRepeat,
            ("end_repeat", _) | ("end", ["repeat", ..]) => RowKind::EndRepeat,
            ("select_one" | "select_multiple", _) => {
                let list = rest
                    .first()
                    .map(|list| list.to_string())
                    .or_else(|| row.select_from_list_name.clone());
                let or_other = rest.get(1) == Some(&"or_other");
                if head == "select_one" {
                    RowKind::SelectOne { list, or_other }
                } else {
                    RowKind::SelectMultiple { list, or_other }
                }
            }
            // Choices from external files are exported as plain text.
            ("select_one_from_file" | "select_one_external", _) => RowKind::SelectOne {
                list: None,
                or_other: false,
            },
            ("select_multiple_from_file", _) => RowKind::SelectMultiple {
                list: None,
                or_other: false,
            },
            (head, _) => {
                if let Some(kind) = GeoKind::from_type_name(head) {
                    RowKind::Geo(kind)
                } else if META_TYPES.contains(&head) {
                    RowKind::Meta(head.to_string())
                } else {
                    RowKind::Question(head.to_string())
                }
            }
        }
    }
}

enum Container {
    Group(FieldInfo),
    Repeat(FieldInfo),
}

/// Build a version's root section from survey rows.
pub fn build_root(title: &str, rows: &[SurveyRow]) -> Result<Section> {
    let fields = build_fields(rows)?;
    Ok(Section::new(FieldInfo::new(title, "survey"), fields)?)
}

/// Build a field tree from survey rows; groups and repeats must balance.
pub fn build_fields(rows: &[SurveyRow]) -> Result<Vec<Field>> {
    let mut stack: Vec<(Option<Container>, Vec<Field>)> = vec![(None, Vec::new())];

    for (position, row) in rows.iter().enumerate() {
        let kind = RowKind::parse(row);
        match kind {
            RowKind::BeginGroup => {
                let info = row.info("begin_group", position)?;
                stack.push((Some(Container::Group(info)), Vec::new()));
            }
            RowKind::BeginRepeat => {
                let info = row.info("begin_repeat", position)?;
                stack.push((Some(Container::Repeat(info)), Vec::new()));
            }
            RowKind::EndGroup => close(&mut stack, false, position, &row.type_name)?,
            RowKind::EndRepeat => close(&mut stack, true, position, &row.type_name)?,
            RowKind::SelectOne { list, or_other } => {
                let info = row.info("select_one", position)?;
                let select = Select {
                    info,
                    list_name: list,
                    or_other,
                };
                push_field(&mut stack, Field::SelectOne(select));
            }
            RowKind::SelectMultiple { list, or_other } => {
                let info = row.info("select_multiple", position)?;
                let select = Select {
                    info,
                    list_name: list,
                    or_other,
                };
                push_field(&mut stack, Field::SelectMultiple(select));
            }
            RowKind::Geo(geo) => {
                let info = row.info(geo.as_str(), position)?;
                push_field(&mut stack, Field::Geo(GeoField { info, kind: geo }));
            }
            RowKind::Meta(type_name) => {
                let info = row.info(&type_name, position)?;
                push_field(&mut stack, Field::Meta(info));
            }
            RowKind::Question(type_name) => {
                let info = row.info(&type_name, position)?;
                push_field(&mut stack, Field::Question(info));
            }
        }
    }

    match stack.pop() {
        Some((None, fields)) if stack.is_empty() => Ok(fields),
        Some((Some(Container::Group(info) | Container::Repeat(info)), _)) => {
            Err(IngestError::Schema {
                message: format!("'{}' is never closed", info.name),
            })
        }
        _ => Err(IngestError::Schema {
            message: "unbalanced survey structure".to_string(),
        }),
    }
}

/// Close the innermost container, which must match the closing row.
fn close(
    stack: &mut Vec<(Option<Container>, Vec<Field>)>,
    repeat: bool,
    position: usize,
    type_name: &str,
) -> Result<()> {
    let field = match stack.pop() {
        Some((Some(Container::Group(info)), children)) if !repeat => {
            Field::Group(Group::new(info, children))
        }
        Some((Some(Container::Repeat(info)), children)) if repeat => {
            Field::Repeat(Section::new(info, children)?)
        }
        _ => return Err(unbalanced(position, type_name)),
    };
    push_field(stack, field);
    Ok(())
}

fn push_field(stack: &mut [(Option<Container>, Vec<Field>)], field: Field) {
    if let Some((_, children)) = stack.last_mut() {
        children.push(field);
    }
}

fn unbalanced(position: usize, type_name: &str) -> IngestError {
    IngestError::Schema {
        message: format!("survey row {position} ({type_name}) closes nothing that is open"),
    }
}

/// Split an HXL hashtag string into its hashtag and attributes.
fn split_hxl(value: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for c in value.chars().filter(|c| !c.is_whitespace()) {
        match (c, tokens.last_mut()) {
            ('#' | '+', _) | (_, None) => tokens.push(c.to_string()),
            (_, Some(token)) => token.push(c),
        }
    }
    tokens
}

fn choice_lists(rows: &[ChoiceRow]) -> Vec<ChoiceList> {
    let mut lists: Vec<ChoiceList> = Vec::new();
    for row in rows {
        let Some(name) = row
            .name
            .as_deref()
            .or(row.autoname.as_deref())
            .filter(|name| !name.is_empty())
        else {
            debug!(list = %row.list_name, "skipping choice without a name");
            continue;
        };
        let choice = Choice::new(name, row.label.as_ref().map(Labels::from).unwrap_or_default());
        match lists.iter_mut().find(|list| list.name == row.list_name) {
            Some(list) => list.choices.push(choice),
            None => lists.push(ChoiceList::new(row.list_name.clone(), vec![choice])),
        }
    }
    lists
}

pub fn version_from_document(title: &str, document: &VersionDocument) -> Result<Version> {
    let content = &document.content;
    let root = build_root(title, &content.survey)?;
    Ok(Version::new(
        document.version.clone(),
        root,
        content.translations.clone(),
        choice_lists(&content.choices),
    ))
}

pub fn pack_from_document(document: &PackDocument) -> Result<FormPack> {
    let title = document.title.as_deref().unwrap_or(DEFAULT_TITLE);
    let versions = document
        .versions
        .iter()
        .map(|version| version_from_document(title, version))
        .collect::<Result<Vec<_>>>()?;
    Ok(FormPack::new(document.id_string.clone(), title, versions)?)
}

/// Parse a pack document. Unknown top-level keys are rejected.
pub fn parse_pack(text: &str) -> Result<FormPack> {
    let document: PackDocument = serde_json::from_str(text).map_err(|source| IngestError::Json {
        context: "form pack document".to_string(),
        source,
    })?;
    pack_from_document(&document)
}

pub fn load_pack(path: &Path) -> Result<FormPack> {
    let text = fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let pack = parse_pack(&text)?;
    info!(
        path = %path.display(),
        pack = pack.id_string(),
        versions = pack.versions().len(),
        "loaded form pack"
    );
    Ok(pack)
}

/// Load analysis-only fields: a JSON array of survey rows.
pub fn load_fields(path: &Path) -> Result<Vec<Field>> {
    let text = fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let rows: Vec<SurveyRow> = serde_json::from_str(&text).map_err(|source| IngestError::Json {
        context: path.display().to_string(),
        source,
    })?;
    build_fields(&rows)
}
