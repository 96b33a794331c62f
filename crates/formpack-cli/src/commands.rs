use anyhow::{Context, Result};
use comfy_table::{Cell, CellAlignment, Table};
use formpack_cli::pipeline::{ExportRequest, ExportResult, SettingsOverrides, run_export};
use formpack_ingest::{load_pack, read_locking_profiles, revert_profiles};

use crate::cli::{ExportArgs, LockingArgs, VersionsArgs};
use crate::summary::{align_column, apply_table_style, header_cell};

pub fn run_export_command(args: &ExportArgs) -> Result<ExportResult> {
    let request = ExportRequest {
        pack: args.pack.clone(),
        submissions: args.submissions.clone(),
        output: args.output.clone(),
        format: args.format.map(Into::into),
        settings: args.settings.clone(),
        overrides: SettingsOverrides {
            versions: args.versions.clone(),
            lang: args.lang.clone(),
            hierarchy_in_labels: args.hierarchy_in_labels,
            group_sep: args.group_sep.clone(),
            multiple_select: args.multiple_select.map(Into::into),
            latest_fields_only: args.latest_fields_only,
            fields: args.fields.clone(),
            force_index: args.force_index,
            copy_fields: args.copy_fields.clone(),
            tag_cols_for_header: args.tag_cols.clone(),
            no_flatten: args.no_flatten,
        },
        extend: args.extend.clone(),
        skip_invalid: args.skip_invalid,
        geo_field: args.geo_field.clone(),
    };
    run_export(&request)
}

pub fn run_versions(args: &VersionsArgs) -> Result<()> {
    let pack = load_pack(&args.pack).with_context(|| format!("load pack {}", args.pack.display()))?;
    println!("Pack: {} ({})", pack.title(), pack.id_string());

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("#"),
        header_cell("Version"),
        header_cell("Fields"),
        header_cell("Repeats"),
        header_cell("Translations"),
        header_cell("Choice lists"),
    ]);
    apply_table_style(&mut table);
    for column in [0, 2, 3, 5] {
        align_column(&mut table, column, CellAlignment::Right);
    }
    for (index, version) in pack.versions().iter().enumerate() {
        let sections = version.sections();
        let fields: usize = sections
            .iter()
            .map(|section| section.field_names().len())
            .sum();
        let translations = version
            .translations()
            .iter()
            .map(|name| name.as_deref().unwrap_or("(unnamed)"))
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec![
            Cell::new(index),
            Cell::new(version.display_id()),
            Cell::new(fields),
            Cell::new(sections.len() - 1),
            Cell::new(translations),
            Cell::new(version.choice_lists().count()),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn run_locking(args: &LockingArgs) -> Result<()> {
    let profiles = read_locking_profiles(&args.file)
        .with_context(|| format!("read locking profiles {}", args.file.display()))?;
    let json = if args.by_restriction {
        serde_json::to_string_pretty(&revert_profiles(&profiles))
    } else {
        serde_json::to_string_pretty(&profiles)
    }
    .context("serialize locking profiles")?;
    println!("{json}");
    Ok(())
}
