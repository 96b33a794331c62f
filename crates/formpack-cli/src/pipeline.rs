//! Export pipeline: load the pack, resolve settings, flatten submissions and
//! write the requested format.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use formpack_export::{
    ErrorPolicy, Export, ExportOptions, ExportSettings, ExportType, HierarchyInLabels,
    MultipleSelect, TableSet, skip_errors,
};
use formpack_ingest::{load_fields, load_pack, open_submissions};
use formpack_model::{FormPack, VersionSelector};
use formpack_output::{
    GeoJsonOptions, write_csv, write_geojson, write_json, write_spss, write_xlsx,
};
use serde_json::Value;
use tracing::{info, info_span};

/// Output file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Xlsx,
    GeoJson,
    Spss,
    Json,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Xlsx => "xlsx",
            OutputFormat::GeoJson => "geojson",
            OutputFormat::Spss => "spss",
            OutputFormat::Json => "json",
        }
    }
}

impl From<ExportType> for OutputFormat {
    fn from(export_type: ExportType) -> Self {
        match export_type {
            ExportType::Csv => OutputFormat::Csv,
            ExportType::Xls => OutputFormat::Xlsx,
            ExportType::Geojson => OutputFormat::GeoJson,
            ExportType::SpssLabels => OutputFormat::Spss,
        }
    }
}

/// Command-line values layered over a settings document.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub versions: Vec<String>,
    pub lang: Option<String>,
    pub hierarchy_in_labels: bool,
    pub group_sep: Option<String>,
    pub multiple_select: Option<MultipleSelect>,
    pub latest_fields_only: bool,
    pub fields: Vec<String>,
    pub force_index: bool,
    pub copy_fields: Vec<String>,
    pub tag_cols_for_header: Vec<String>,
    pub no_flatten: bool,
}

impl SettingsOverrides {
    /// Apply every value given on the command line; absent flags keep the
    /// document's values.
    pub fn apply(&self, settings: &mut ExportSettings) {
        if !self.versions.is_empty() {
            settings.versions = Some(
                self.versions
                    .iter()
                    .map(|id| VersionSelector::from(id.as_str()))
                    .collect(),
            );
        }
        if let Some(lang) = &self.lang {
            settings.lang = Some(lang.clone());
        }
        // A separator from the document already turns the hierarchy on.
        let has_separator = matches!(
            &settings.hierarchy_in_labels,
            Some(HierarchyInLabels::Separator(sep)) if !sep.is_empty()
        );
        if self.hierarchy_in_labels && !has_separator {
            settings.hierarchy_in_labels = Some(HierarchyInLabels::Flag(true));
        }
        if let Some(sep) = &self.group_sep {
            settings.group_sep = Some(sep.clone());
        }
        if let Some(mode) = self.multiple_select {
            settings.multiple_select = Some(mode);
        }
        if self.latest_fields_only {
            settings.fields_from_all_versions = Some(false);
        }
        if !self.fields.is_empty() {
            settings.fields = Some(self.fields.clone());
        }
        if self.force_index {
            settings.force_index = Some(true);
        }
        if !self.copy_fields.is_empty() {
            settings.copy_fields = Some(self.copy_fields.clone());
        }
        if !self.tag_cols_for_header.is_empty() {
            settings.tag_cols_for_header = Some(self.tag_cols_for_header.clone());
        }
        if self.no_flatten {
            settings.flatten = Some(false);
        }
    }
}

/// Everything one export invocation needs.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub pack: PathBuf,
    pub submissions: PathBuf,
    pub output: PathBuf,
    /// Falls back to the settings document's `type`, then CSV.
    pub format: Option<OutputFormat>,
    pub settings: Option<PathBuf>,
    pub overrides: SettingsOverrides,
    /// Analysis-only fields appended to the latest version.
    pub extend: Option<PathBuf>,
    pub skip_invalid: bool,
    pub geo_field: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSummary {
    pub name: String,
    pub columns: usize,
    pub rows: usize,
}

#[derive(Debug, Clone)]
pub struct ExportResult {
    pub pack_id: String,
    pub title: String,
    pub format: OutputFormat,
    pub output: PathBuf,
    /// Display ids of the exported versions.
    pub versions: Vec<String>,
    pub tables: Vec<TableSummary>,
}

/// Read a settings document; no path means default settings.
pub fn load_settings(path: Option<&Path>) -> Result<ExportSettings> {
    let Some(path) = path else {
        return Ok(ExportSettings::default());
    };
    let text =
        fs::read_to_string(path).with_context(|| format!("read settings {}", path.display()))?;
    ExportSettings::from_json(&text).with_context(|| format!("parse settings {}", path.display()))
}

/// Load a pack and merge any extension fields into it.
pub fn load_extended_pack(pack: &Path, extend: Option<&Path>) -> Result<FormPack> {
    let mut pack = load_pack(pack).with_context(|| format!("load pack {}", pack.display()))?;
    if let Some(path) = extend {
        let fields =
            load_fields(path).with_context(|| format!("load fields {}", path.display()))?;
        pack.extend(fields)
            .with_context(|| format!("extend pack with {}", path.display()))?;
    }
    Ok(pack)
}

pub fn run_export(request: &ExportRequest) -> Result<ExportResult> {
    let pack = load_extended_pack(&request.pack, request.extend.as_deref())?;
    let span = info_span!("pack", id = %pack.id_string());
    let _guard = span.enter();

    let mut settings = load_settings(request.settings.as_deref())?;
    request.overrides.apply(&mut settings);
    let format = request
        .format
        .or(settings.export_type.map(OutputFormat::from))
        .unwrap_or(OutputFormat::Csv);
    let flatten = settings.flatten.unwrap_or(true);
    let options = ExportOptions::try_from(settings).context("invalid export settings")?;

    let export = Export::new(&pack, options).context("plan export")?;
    let tables = flatten_submissions(&export, &request.submissions, request.skip_invalid)?;

    ensure_parent_dir(&request.output)?;
    write_output(&export, &tables, format, flatten, request)?;
    info!(
        output = %request.output.display(),
        format = format.as_str(),
        rows = tables.row_count(),
        "export written"
    );

    let versions = export
        .plan()
        .versions()
        .iter()
        .map(|&index| pack.versions()[index].display_id().to_string())
        .collect();
    Ok(ExportResult {
        pack_id: pack.id_string().to_string(),
        title: pack.title().to_string(),
        format,
        output: request.output.clone(),
        versions,
        tables: tables
            .iter()
            .map(|table| TableSummary {
                name: table.name.clone(),
                columns: table.width(),
                rows: table.rows.len(),
            })
            .collect(),
    })
}

/// Flatten every submission of `path`. With `skip_invalid`, unreadable and
/// malformed submissions are logged and dropped instead of failing.
pub fn flatten_submissions(export: &Export<'_>, path: &Path, skip_invalid: bool) -> Result<TableSet> {
    let source =
        open_submissions(path).with_context(|| format!("open submissions {}", path.display()))?;
    let tables = if skip_invalid {
        export.to_tables_with(skip_errors(source), ErrorPolicy::Skip)
    } else {
        let submissions = source
            .collect::<Result<Vec<Value>, _>>()
            .with_context(|| format!("read submissions {}", path.display()))?;
        export.to_tables_with(&submissions, ErrorPolicy::Abort)
    };
    tables.context("flatten submissions")
}

fn write_output(
    export: &Export<'_>,
    tables: &TableSet,
    format: OutputFormat,
    flatten: bool,
    request: &ExportRequest,
) -> Result<()> {
    let path = &request.output;
    match format {
        OutputFormat::Xlsx => {
            write_xlsx(tables, path).with_context(|| format!("write {}", path.display()))
        }
        OutputFormat::Csv => write_file(path, |writer| write_csv(tables, writer)),
        OutputFormat::Json => write_file(path, |writer| write_json(tables, writer)),
        OutputFormat::Spss => write_file(path, |writer| write_spss(export.plan(), writer)),
        OutputFormat::GeoJson => {
            let options = GeoJsonOptions {
                field: request.geo_field.clone(),
                flatten,
            };
            write_file(path, |writer| write_geojson(tables, &options, writer))
        }
    }
}

fn write_file<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> formpack_output::Result<()>,
{
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write(&mut writer).with_context(|| format!("write {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("flush {}", path.display()))
}

/// Ensure a parent directory exists for a file path.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    Ok(())
}
