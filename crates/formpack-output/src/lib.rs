//! Writers for exported tables.
//!
//! - **csv**: single-table delimited text
//! - **xlsx**: one worksheet per table
//! - **geojson**: feature collections from a geo field
//! - **spss**: label syntax from a header plan
//! - **json**: the `{table: {fields, data}}` shape

pub mod csv;
pub mod error;
pub mod geojson;
pub mod json;
pub mod spss;
pub mod xlsx;

pub use crate::csv::{CSV_DELIMITER, to_csv_string, write_csv};
pub use error::{OutputError, Result};
pub use geojson::{GeoJsonOptions, geojson, geometry, write_geojson};
pub use json::write_json;
pub use spss::{spss_labels, spss_name, write_spss};
pub use xlsx::{sheet_name, sheet_names, write_xlsx};
