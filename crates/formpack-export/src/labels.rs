//! Label resolution with deterministic fallback to sanitized names.

use formpack_model::{Choice, FieldInfo, Labels, Version};
use tracing::debug;

use crate::constants::{
    NAME_HEAD_LEN, NAME_LENGTH_LIMIT, NAME_TAIL_LEN, OR_OTHER_LABEL, OR_OTHER_VALUE,
};
use crate::options::Lang;

/// Resolves field and choice labels of one version in one language.
#[derive(Debug, Clone, Copy)]
pub struct LabelResolver {
    /// Translation column to read; `None` means raw names.
    index: Option<usize>,
    xml: bool,
}

impl LabelResolver {
    pub fn new(version: &Version, lang: &Lang) -> Self {
        match lang {
            Lang::Xml => Self {
                index: None,
                xml: true,
            },
            Lang::Untranslated => Self {
                index: Some(version.untranslated_index()),
                xml: false,
            },
            Lang::Translation(name) => {
                let index = version.translation_index(name);
                if index.is_none() {
                    debug!(
                        version = version.display_id(),
                        translation = %name,
                        "translation not found, falling back to names"
                    );
                }
                Self { index, xml: false }
            }
        }
    }

    pub fn field_label(&self, info: &FieldInfo) -> String {
        self.resolve(&info.name, &info.labels)
    }

    pub fn choice_label(&self, choice: &Choice) -> String {
        self.resolve(&choice.name, &choice.labels)
    }

    /// Label of the choice added to `or_other` selects. It has no
    /// translations, so every language but XML names gets the same text.
    pub fn or_other_label(&self) -> String {
        if self.xml {
            OR_OTHER_VALUE.to_string()
        } else {
            OR_OTHER_LABEL.to_string()
        }
    }

    /// Label for the active translation, else the sanitized name.
    pub fn resolve(&self, name: &str, labels: &Labels) -> String {
        if self.xml {
            return name.to_string();
        }
        self.index
            .and_then(|index| labels.get(index))
            .map(str::to_string)
            .unwrap_or_else(|| sanitize_name(name))
    }
}

/// Replace characters outside `[alnum _ - .]` with `_` and abbreviate long
/// names to a leading and trailing fragment.
pub fn sanitize_name(name: &str) -> String {
    let cleaned: Vec<char> = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.len() <= NAME_LENGTH_LIMIT {
        return cleaned.into_iter().collect();
    }
    let head = cleaned[..NAME_HEAD_LEN].iter();
    let tail = cleaned[cleaned.len() - NAME_TAIL_LEN..].iter();
    head.chain(std::iter::once(&'_')).chain(tail).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use formpack_model::Section;

    fn version() -> Version {
        let root = Section::new(FieldInfo::new("root", "survey"), vec![]).unwrap();
        Version::new(
            Some("v1".into()),
            root,
            vec![Some("English".into()), Some("French".into())],
            vec![],
        )
    }

    #[test]
    fn sanitize_keeps_safe_names() {
        assert_eq!(
            sanitize_name("How_many_segments_does_your_body_have"),
            "How_many_segments_does_your_body_have"
        );
        assert_eq!(sanitize_name("what is: this?"), "what_is__this_");
    }

    #[test]
    fn sanitize_abbreviates_long_names() {
        let name = "a".repeat(30) + &"b".repeat(30);
        let short = sanitize_name(&name);
        assert_eq!(short.chars().count(), NAME_LENGTH_LIMIT);
        assert_eq!(short, format!("{}_{}", "a".repeat(20), "b".repeat(19)));
    }

    #[test]
    fn missing_translation_falls_back_to_name() {
        let version = version();
        let info = FieldInfo::new("segments", "integer")
            .with_labels(Labels::new(vec![Some("Segments".into()), None]));

        let english = LabelResolver::new(&version, &Lang::Translation("English".into()));
        assert_eq!(english.field_label(&info), "Segments");
        let french = LabelResolver::new(&version, &Lang::Translation("French".into()));
        assert_eq!(french.field_label(&info), "segments");
        let spanish = LabelResolver::new(&version, &Lang::Translation("Spanish".into()));
        assert_eq!(spanish.field_label(&info), "segments");
        let xml = LabelResolver::new(&version, &Lang::Xml);
        assert_eq!(xml.field_label(&info), "segments");
    }

    #[test]
    fn untranslated_uses_default_translation_without_unnamed_one() {
        let version = version();
        let info = FieldInfo::new("q1", "text").with_label("Question one");
        let resolver = LabelResolver::new(&version, &Lang::Untranslated);
        assert_eq!(resolver.field_label(&info), "Question one");
    }
}
