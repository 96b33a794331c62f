//! Immutable constant tables shared by the export engine and its writers.

/// Synthetic row index column.
pub const INDEX_COLUMN: &str = "_index";

/// Name of the parent table, on every non-root table.
pub const PARENT_TABLE_COLUMN: &str = "_parent_table_name";

/// `_index` of the parent row, on every non-root table.
pub const PARENT_INDEX_COLUMN: &str = "_parent_index";

/// Submission key holding the version id the submission was collected with.
pub const VERSION_KEY: &str = "__version__";

/// Separator between group labels and between a multi-select label and its
/// options.
pub const DEFAULT_GROUP_SEP: &str = "/";

/// Fallback names longer than this are abbreviated.
pub const NAME_LENGTH_LIMIT: usize = 40;
/// Leading characters kept when abbreviating a name.
pub const NAME_HEAD_LEN: usize = 20;
/// Trailing characters kept when abbreviating a name.
pub const NAME_TAIL_LEN: usize = 19;

/// Choice value added to `or_other` selects.
pub const OR_OTHER_VALUE: &str = "other";
/// Label of the added choice. Not translated.
pub const OR_OTHER_LABEL: &str = "Other";

/// Suffixes of the columns a geopoint expands into, in value order.
pub const GEOPOINT_PARTS: [&str; 4] = ["latitude", "longitude", "altitude", "precision"];

/// Tag namespaces with dedicated columns, and the separator used to join
/// several tags of one namespace into a single header cell.
pub const TAG_COLUMNS_AND_SEPARATORS: &[(&str, &str)] = &[("hxl", "")];

/// Separator for namespaces absent from [`TAG_COLUMNS_AND_SEPARATORS`].
pub const DEFAULT_TAG_SEPARATOR: &str = " ";

/// Language selector for the unnamed translation (or the default one).
pub const LANG_DEFAULT: &str = "_default";
/// Language selector for raw XML names.
pub const LANG_XML: &str = "_xml";

/// Spreadsheet applications cap worksheet names at 31 characters.
pub const EXCEL_SHEET_NAME_SIZE_LIMIT: usize = 31;
/// Columns per worksheet.
pub const EXCEL_COLUMN_LIMIT: usize = 16_384;

/// Characters that may not appear in worksheet names.
pub const EXCEL_FORBIDDEN_WORKSHEET_NAME_CHARACTERS: &[char] = &['[', ']', '*', '?', ':', '\\', '/'];

/// Marker appended to truncated worksheet names.
pub const TRUNCATION_MARKER: &str = "...";

pub const MULTIPLE_SELECT_BOTH: &str = "both";
pub const MULTIPLE_SELECT_DETAILS: &str = "details";
pub const MULTIPLE_SELECT_SUMMARY: &str = "summary";

pub const EXPORT_SETTING_COPY_FIELDS: &str = "copy_fields";
pub const EXPORT_SETTING_FIELDS: &str = "fields";
pub const EXPORT_SETTING_FIELDS_FROM_ALL_VERSIONS: &str = "fields_from_all_versions";
pub const EXPORT_SETTING_FLATTEN: &str = "flatten";
pub const EXPORT_SETTING_FORCE_INDEX: &str = "force_index";
pub const EXPORT_SETTING_GROUP_SEP: &str = "group_sep";
pub const EXPORT_SETTING_HIERARCHY_IN_LABELS: &str = "hierarchy_in_labels";
pub const EXPORT_SETTING_LANG: &str = "lang";
pub const EXPORT_SETTING_MULTIPLE_SELECT: &str = "multiple_select";
pub const EXPORT_SETTING_TAG_COLS_FOR_HEADER: &str = "tag_cols_for_header";
pub const EXPORT_SETTING_TYPE: &str = "type";
pub const EXPORT_SETTING_VERSIONS: &str = "versions";

/// Every key accepted in an export settings document.
pub const VALID_EXPORT_SETTINGS: &[&str] = &[
    EXPORT_SETTING_COPY_FIELDS,
    EXPORT_SETTING_FIELDS,
    EXPORT_SETTING_FIELDS_FROM_ALL_VERSIONS,
    EXPORT_SETTING_FLATTEN,
    EXPORT_SETTING_FORCE_INDEX,
    EXPORT_SETTING_GROUP_SEP,
    EXPORT_SETTING_HIERARCHY_IN_LABELS,
    EXPORT_SETTING_LANG,
    EXPORT_SETTING_MULTIPLE_SELECT,
    EXPORT_SETTING_TAG_COLS_FOR_HEADER,
    EXPORT_SETTING_TYPE,
    EXPORT_SETTING_VERSIONS,
];

pub const EXPORT_TYPE_CSV: &str = "csv";
pub const EXPORT_TYPE_GEOJSON: &str = "geojson";
pub const EXPORT_TYPE_SPSS: &str = "spss_labels";
pub const EXPORT_TYPE_XLS: &str = "xls";

/// Separator for a tag namespace.
pub fn tag_separator(namespace: &str) -> &'static str {
    TAG_COLUMNS_AND_SEPARATORS
        .iter()
        .find(|(ns, _)| *ns == namespace)
        .map(|(_, sep)| *sep)
        .unwrap_or(DEFAULT_TAG_SEPARATOR)
}
