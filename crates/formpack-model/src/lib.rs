//! Form pack data model.
//!
//! - **field**: the closed set of field variants and the section tree
//! - **version**: schema snapshots with translations and choice lists
//! - **pack**: the version registry

pub mod error;
pub mod field;
pub mod pack;
pub mod version;

pub use error::{ModelError, Result};
pub use field::{
    Field, FieldInfo, FieldType, GeoField, GeoKind, Group, Labels, ScopeEntry, Section, Select,
};
pub use pack::{FormPack, VersionSelector};
pub use version::{Choice, ChoiceList, Version};
