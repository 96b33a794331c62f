//! Export engine for form packs.
//!
//! - **header**: plans the ordered columns of every output table
//! - **flatten**: turns submissions into rows of those tables
//! - **labels**: resolves labels in the requested language
//! - **multiselect**: expands multiple-select answers into columns
//! - **export**: ties a plan to per-run counters and output buffers

pub mod constants;
pub mod error;
pub mod export;
pub mod flatten;
pub mod header;
pub mod labels;
pub mod multiselect;
pub mod options;
pub mod table;

pub use error::{ExportError, Result};
pub use export::{ErrorPolicy, Export, ExportRun, skip_errors};
pub use flatten::{Flattener, RowFragment};
pub use header::{
    ColumnSource, ColumnSpec, FieldKind, FieldPart, HeaderPlan, PlannedField, TablePlan, plan,
};
pub use labels::{LabelResolver, sanitize_name};
pub use multiselect::{Expansion, MultiSelectExpander, PlannedChoice, SelectPart};
pub use options::{ExportOptions, ExportSettings, ExportType, HierarchyInLabels, Lang, MultipleSelect};
pub use table::{CellValue, Table, TableSet};
