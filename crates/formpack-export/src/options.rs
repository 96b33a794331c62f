//! Export request options.
//!
//! [`ExportOptions`] is the typed form used by the engine. [`ExportSettings`]
//! is the JSON settings document accepted from callers; it rejects unknown
//! keys and converts into options with [`TryFrom`].

use std::fmt;
use std::str::FromStr;

use formpack_model::VersionSelector;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_GROUP_SEP, EXPORT_TYPE_CSV, EXPORT_TYPE_GEOJSON, EXPORT_TYPE_SPSS, EXPORT_TYPE_XLS,
    LANG_DEFAULT, LANG_XML, MULTIPLE_SELECT_BOTH, MULTIPLE_SELECT_DETAILS,
    MULTIPLE_SELECT_SUMMARY,
};
use crate::error::{ExportError, Result};

/// Language used for header labels and choice labels.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Lang {
    /// A named translation of the form.
    Translation(String),
    /// The unnamed translation, else the default one.
    Untranslated,
    /// Raw schema names.
    #[default]
    Xml,
}

impl Lang {
    /// Parse a language selector as written in settings documents.
    pub fn parse(value: &str) -> Self {
        match value {
            LANG_DEFAULT => Lang::Untranslated,
            LANG_XML => Lang::Xml,
            name => Lang::Translation(name.to_string()),
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lang::Translation(name) => f.write_str(name),
            Lang::Untranslated => f.write_str(LANG_DEFAULT),
            Lang::Xml => f.write_str(LANG_XML),
        }
    }
}

/// How multiple-select fields become columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MultipleSelect {
    /// One column with the selected labels joined by spaces.
    Summary,
    /// One `1`/`0` column per choice.
    Details,
    /// Summary column followed by the detail columns.
    #[default]
    Both,
}

impl MultipleSelect {
    pub fn has_summary(self) -> bool {
        matches!(self, MultipleSelect::Summary | MultipleSelect::Both)
    }

    pub fn has_details(self) -> bool {
        matches!(self, MultipleSelect::Details | MultipleSelect::Both)
    }
}

impl FromStr for MultipleSelect {
    type Err = ExportError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            MULTIPLE_SELECT_SUMMARY => Ok(MultipleSelect::Summary),
            MULTIPLE_SELECT_DETAILS => Ok(MultipleSelect::Details),
            MULTIPLE_SELECT_BOTH => Ok(MultipleSelect::Both),
            other => Err(ExportError::InvalidSettings {
                message: format!("unknown multiple_select mode: {other}"),
            }),
        }
    }
}

/// Serialization target requested by a settings document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportType {
    #[serde(rename = "csv")]
    Csv,
    #[serde(rename = "xls")]
    Xls,
    #[serde(rename = "geojson")]
    Geojson,
    #[serde(rename = "spss_labels")]
    SpssLabels,
}

impl ExportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportType::Csv => EXPORT_TYPE_CSV,
            ExportType::Xls => EXPORT_TYPE_XLS,
            ExportType::Geojson => EXPORT_TYPE_GEOJSON,
            ExportType::SpssLabels => EXPORT_TYPE_SPSS,
        }
    }
}

/// Options controlling one export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// Versions to export, in order. Empty selects the latest version.
    pub versions: Vec<VersionSelector>,
    pub lang: Lang,
    /// Prefix labels with their group and repeat labels.
    pub hierarchy_in_labels: bool,
    /// Separator for hierarchy prefixes and multi-select detail labels.
    pub group_sep: String,
    pub multiple_select: MultipleSelect,
    /// Plan columns from every selected version, not only the last one.
    pub fields_from_all_versions: bool,
    /// Field allow-list; `None` exports every field.
    pub fields: Option<Vec<String>>,
    /// Add `_index` to tables without child tables too.
    pub force_index: bool,
    /// Submission keys copied verbatim onto every row of every table.
    pub copy_fields: Vec<String>,
    /// Tag namespaces surfaced as a second header row.
    pub tag_cols_for_header: Vec<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            versions: Vec::new(),
            lang: Lang::default(),
            hierarchy_in_labels: false,
            group_sep: DEFAULT_GROUP_SEP.to_string(),
            multiple_select: MultipleSelect::default(),
            fields_from_all_versions: true,
            fields: None,
            force_index: false,
            copy_fields: Vec::new(),
            tag_cols_for_header: Vec::new(),
        }
    }
}

impl ExportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_versions<I, V>(mut self, versions: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<VersionSelector>,
    {
        self.versions = versions.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_lang(mut self, lang: Lang) -> Self {
        self.lang = lang;
        self
    }

    #[must_use]
    pub fn with_hierarchy_in_labels(mut self, enabled: bool) -> Self {
        self.hierarchy_in_labels = enabled;
        self
    }

    #[must_use]
    pub fn with_group_sep(mut self, sep: impl Into<String>) -> Self {
        self.group_sep = sep.into();
        self
    }

    #[must_use]
    pub fn with_multiple_select(mut self, mode: MultipleSelect) -> Self {
        self.multiple_select = mode;
        self
    }

    #[must_use]
    pub fn with_fields_from_all_versions(mut self, enabled: bool) -> Self {
        self.fields_from_all_versions = enabled;
        self
    }

    #[must_use]
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_force_index(mut self, enabled: bool) -> Self {
        self.force_index = enabled;
        self
    }

    #[must_use]
    pub fn with_copy_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.copy_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_tag_cols_for_header<I, S>(mut self, namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tag_cols_for_header = namespaces.into_iter().map(Into::into).collect();
        self
    }
}

/// `hierarchy_in_labels` accepts a flag or a separator string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HierarchyInLabels {
    Flag(bool),
    Separator(String),
}

/// Export settings document as supplied by callers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExportSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub versions: Option<Vec<VersionSelector>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hierarchy_in_labels: Option<HierarchyInLabels>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_sep: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple_select: Option<MultipleSelect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields_from_all_versions: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_index: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy_fields: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_cols_for_header: Option<Vec<String>>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub export_type: Option<ExportType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flatten: Option<bool>,
}

impl ExportSettings {
    /// Parse a settings document; unknown keys and bad values are rejected.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|error| ExportError::InvalidSettings {
            message: error.to_string(),
        })
    }
}

impl TryFrom<ExportSettings> for ExportOptions {
    type Error = ExportError;

    fn try_from(settings: ExportSettings) -> Result<Self> {
        let defaults = ExportOptions::default();
        let mut group_sep = settings.group_sep.unwrap_or(defaults.group_sep);
        if group_sep.is_empty() {
            return Err(ExportError::InvalidSettings {
                message: "group_sep must not be empty".to_string(),
            });
        }
        let hierarchy_in_labels = match settings.hierarchy_in_labels {
            None => defaults.hierarchy_in_labels,
            Some(HierarchyInLabels::Flag(enabled)) => enabled,
            Some(HierarchyInLabels::Separator(sep)) if sep.is_empty() => false,
            Some(HierarchyInLabels::Separator(sep)) => {
                group_sep = sep;
                true
            }
        };
        Ok(ExportOptions {
            versions: settings.versions.unwrap_or(defaults.versions),
            lang: settings
                .lang
                .as_deref()
                .map(Lang::parse)
                .unwrap_or(defaults.lang),
            hierarchy_in_labels,
            group_sep,
            multiple_select: settings
                .multiple_select
                .unwrap_or(defaults.multiple_select),
            fields_from_all_versions: settings
                .fields_from_all_versions
                .unwrap_or(defaults.fields_from_all_versions),
            fields: settings.fields.or(defaults.fields),
            force_index: settings.force_index.unwrap_or(defaults.force_index),
            copy_fields: settings.copy_fields.unwrap_or(defaults.copy_fields),
            tag_cols_for_header: settings
                .tag_cols_for_header
                .unwrap_or(defaults.tag_cols_for_header),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lang_selectors_parse() {
        assert_eq!(Lang::parse("_default"), Lang::Untranslated);
        assert_eq!(Lang::parse("_xml"), Lang::Xml);
        assert_eq!(Lang::parse("french"), Lang::Translation("french".into()));
    }

    #[test]
    fn unknown_settings_are_rejected() {
        let err = ExportSettings::from_json(r#"{"lang": "french", "colour": "red"}"#).unwrap_err();
        assert!(matches!(err, ExportError::InvalidSettings { .. }));
        assert!(err.to_string().contains("colour"));
    }

    #[test]
    fn bad_multiple_select_is_rejected() {
        assert!(ExportSettings::from_json(r#"{"multiple_select": "all"}"#).is_err());
        assert!("all".parse::<MultipleSelect>().is_err());
        assert_eq!("details".parse::<MultipleSelect>().unwrap(), MultipleSelect::Details);
    }

    #[test]
    fn hierarchy_separator_sets_group_sep() {
        let settings = ExportSettings::from_json(
            r#"{"hierarchy_in_labels": " > ", "versions": ["v1", 0], "type": "xls"}"#,
        )
        .unwrap();
        assert_eq!(settings.export_type, Some(ExportType::Xls));
        let options = ExportOptions::try_from(settings).unwrap();
        assert!(options.hierarchy_in_labels);
        assert_eq!(options.group_sep, " > ");
        assert_eq!(
            options.versions,
            vec![VersionSelector::Id("v1".into()), VersionSelector::Index(0)]
        );
    }

    #[test]
    fn defaults_apply_to_missing_settings() {
        let options = ExportOptions::try_from(ExportSettings::default()).unwrap();
        assert_eq!(options, ExportOptions::default());
        assert_eq!(options.lang, Lang::Xml);
        assert_eq!(options.multiple_select, MultipleSelect::Both);
    }
}
