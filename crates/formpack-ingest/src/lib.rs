//! Loading form packs, submissions and locking profiles.

pub mod error;
pub mod locking;
pub mod schema;
pub mod submissions;

pub use error::{IngestError, Result};
pub use locking::{
    KOBO_LOCK_SHEET, KOBO_LOCKING_RESTRICTIONS, LockingProfile, RestrictionRow,
    profiles_from_rows, profiles_to_rows, read_locking_profiles, revert_profiles,
};
pub use schema::{
    PackDocument, VersionDocument, build_fields, load_fields, load_pack, pack_from_document,
    parse_pack,
};
pub use submissions::{
    JsonLines, open_submissions, parse_submission_array, read_submissions,
};
