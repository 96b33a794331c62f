use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::field::Field;
use crate::version::Version;

/// Reference to one version of a pack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VersionSelector {
    Index(usize),
    Id(String),
}

impl fmt::Display for VersionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSelector::Index(index) => write!(f, "#{index}"),
            VersionSelector::Id(id) => f.write_str(id),
        }
    }
}

impl From<&str> for VersionSelector {
    fn from(id: &str) -> Self {
        VersionSelector::Id(id.to_string())
    }
}

impl From<usize> for VersionSelector {
    fn from(index: usize) -> Self {
        VersionSelector::Index(index)
    }
}

/// Top-level container: ordered, uniquely identified versions of one form.
#[derive(Debug, Clone, Serialize)]
pub struct FormPack {
    id_string: String,
    title: String,
    versions: Vec<Version>,
}

impl FormPack {
    pub fn new(
        id_string: impl Into<String>,
        title: impl Into<String>,
        versions: Vec<Version>,
    ) -> Result<Self> {
        if versions.is_empty() {
            return Err(ModelError::NoVersions);
        }
        let mut seen = BTreeSet::new();
        for version in &versions {
            if !seen.insert(version.id()) {
                return Err(ModelError::DuplicateVersion {
                    id: version.display_id().to_string(),
                });
            }
        }
        Ok(Self {
            id_string: id_string.into(),
            title: title.into(),
            versions,
        })
    }

    pub fn id_string(&self) -> &str {
        &self.id_string
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    /// Most recently declared version.
    pub fn latest(&self) -> &Version {
        // Construction guarantees at least one version.
        &self.versions[self.versions.len() - 1]
    }

    pub fn index_of(&self, selector: &VersionSelector) -> Result<usize> {
        match selector {
            VersionSelector::Index(index) => {
                if *index < self.versions.len() {
                    Ok(*index)
                } else {
                    Err(ModelError::VersionIndexOutOfRange {
                        index: *index,
                        len: self.versions.len(),
                    })
                }
            }
            VersionSelector::Id(id) => self
                .versions
                .iter()
                .position(|version| version.id() == Some(id.as_str()))
                .ok_or_else(|| ModelError::UnknownVersion {
                    selector: id.clone(),
                }),
        }
    }

    pub fn get(&self, selector: &VersionSelector) -> Result<&Version> {
        self.index_of(selector).map(|index| &self.versions[index])
    }

    pub fn by_id(&self, id: &str) -> Option<&Version> {
        self.versions
            .iter()
            .find(|version| version.id() == Some(id))
    }

    /// Merge analysis-only fields into the latest version's root section.
    pub fn extend<I>(&mut self, fields: I) -> Result<()>
    where
        I: IntoIterator<Item = Field>,
    {
        let last = self.versions.len() - 1;
        let root = self.versions[last].root_mut();
        for field in fields {
            root.push(field)?;
        }
        Ok(())
    }
}
