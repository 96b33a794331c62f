//! CLI argument definitions for the form pack exporter.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use formpack_export::MultipleSelect;
use formpack_cli::pipeline::OutputFormat;

#[derive(Parser)]
#[command(
    name = "formpack",
    version,
    about = "Export form submissions to flat tables",
    long_about = "Flatten submissions of a versioned form pack into tables.\n\n\
                  Supports CSV, XLSX, GeoJSON, SPSS label syntax and JSON outputs."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (text for humans, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "text",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Export submissions of a form pack.
    Export(ExportArgs),

    /// List the versions of a form pack.
    Versions(VersionsArgs),

    /// Print the locking profiles of a workbook or CSV matrix as JSON.
    Locking(LockingArgs),
}

#[derive(Parser)]
pub struct ExportArgs {
    /// Form pack document (JSON).
    #[arg(value_name = "PACK")]
    pub pack: PathBuf,

    /// Submissions as a JSON array or JSON lines.
    #[arg(long, value_name = "FILE")]
    pub submissions: PathBuf,

    /// Output file.
    #[arg(long, short = 'o', value_name = "PATH")]
    pub output: PathBuf,

    /// Output format (default: the settings document's `type`, else csv).
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,

    /// Export settings document (JSON). Flags below override its values.
    #[arg(long, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Version id to export; repeat for several (default: latest).
    #[arg(long = "form-version", value_name = "ID")]
    pub versions: Vec<String>,

    /// Label language: a translation name, `_default` or `_xml`.
    #[arg(long, value_name = "LANG")]
    pub lang: Option<String>,

    /// Prefix labels with their group labels.
    #[arg(long = "hierarchy-in-labels")]
    pub hierarchy_in_labels: bool,

    /// Separator between group labels.
    #[arg(long = "group-sep", value_name = "SEP")]
    pub group_sep: Option<String>,

    /// How multiple-select questions become columns.
    #[arg(long = "multiple-select", value_enum)]
    pub multiple_select: Option<MultipleSelectArg>,

    /// Plan columns from the last selected version only.
    #[arg(long = "latest-fields-only")]
    pub latest_fields_only: bool,

    /// Only export this field; repeat for several.
    #[arg(long = "field", value_name = "NAME")]
    pub fields: Vec<String>,

    /// Add `_index` to every table.
    #[arg(long = "force-index")]
    pub force_index: bool,

    /// Submission key copied onto every row; repeat for several.
    #[arg(long = "copy-field", value_name = "KEY")]
    pub copy_fields: Vec<String>,

    /// Tag namespace shown as a second header row (e.g. hxl).
    #[arg(long = "tag-cols", value_name = "NAMESPACE")]
    pub tag_cols: Vec<String>,

    /// Analysis-only fields (JSON survey rows) appended to the latest version.
    #[arg(long, value_name = "FILE")]
    pub extend: Option<PathBuf>,

    /// Log and drop unreadable or malformed submissions.
    #[arg(long = "skip-invalid")]
    pub skip_invalid: bool,

    /// Geo field mapped by GeoJSON output (default: the first one).
    #[arg(long = "geo-field", value_name = "NAME")]
    pub geo_field: Option<String>,

    /// Keep traces and shapes whole in GeoJSON output.
    #[arg(long = "no-flatten")]
    pub no_flatten: bool,
}

#[derive(Parser)]
pub struct VersionsArgs {
    /// Form pack document (JSON).
    #[arg(value_name = "PACK")]
    pub pack: PathBuf,
}

#[derive(Parser)]
pub struct LockingArgs {
    /// Workbook (.xlsx) with a `kobo--locking-profiles` sheet, or a CSV matrix.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Print one row per restriction instead of one entry per profile.
    #[arg(long)]
    pub by_restriction: bool,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum FormatArg {
    Csv,
    Xlsx,
    Geojson,
    Spss,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Csv => OutputFormat::Csv,
            FormatArg::Xlsx => OutputFormat::Xlsx,
            FormatArg::Geojson => OutputFormat::GeoJson,
            FormatArg::Spss => OutputFormat::Spss,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum MultipleSelectArg {
    Summary,
    Details,
    Both,
}

impl From<MultipleSelectArg> for MultipleSelect {
    fn from(mode: MultipleSelectArg) -> Self {
        match mode {
            MultipleSelectArg::Summary => MultipleSelect::Summary,
            MultipleSelectArg::Details => MultipleSelect::Details,
            MultipleSelectArg::Both => MultipleSelect::Both,
        }
    }
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Text,
    Json,
}
