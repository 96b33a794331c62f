//! Export runs: a header plan plus the per-run index counters and buffers.

use std::borrow::Borrow;
use std::fmt::Display;

use formpack_model::{FormPack, Version};
use serde_json::Value;
use tracing::{debug, info, info_span, warn};

use crate::constants::VERSION_KEY;
use crate::error::{ExportError, Result};
use crate::flatten::Flattener;
use crate::header::{self, HeaderPlan};
use crate::options::ExportOptions;
use crate::table::{Table, TableSet};

/// What to do when one submission cannot be flattened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Fail the whole export.
    #[default]
    Abort,
    /// Log and drop the submission.
    Skip,
}

/// A planned export over one form pack.
///
/// The plan is immutable; every [`ExportRun`] gets its own counters, so
/// several runs over one `Export` (or one pack) share nothing mutable.
#[derive(Debug, Clone)]
pub struct Export<'p> {
    pack: &'p FormPack,
    options: ExportOptions,
    plan: HeaderPlan,
}

impl<'p> Export<'p> {
    pub fn new(pack: &'p FormPack, options: ExportOptions) -> Result<Self> {
        let plan = header::plan(pack, &options)?;
        debug!(
            pack = pack.id_string(),
            versions = plan.versions().len(),
            tables = plan.tables().len(),
            "export planned"
        );
        Ok(Self {
            pack,
            options,
            plan,
        })
    }

    pub fn pack(&self) -> &'p FormPack {
        self.pack
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    pub fn plan(&self) -> &HeaderPlan {
        &self.plan
    }

    /// Start a run with fresh `_index` counters.
    pub fn run(&self) -> ExportRun<'_> {
        ExportRun {
            pack: self.pack,
            plan: &self.plan,
            flattener: Flattener::new(&self.plan),
            tables: self.plan.tables().iter().map(Table::from_plan).collect(),
            submissions: 0,
            skipped: 0,
        }
    }

    /// Flatten every submission, failing on the first malformed one.
    pub fn to_tables<I>(&self, submissions: I) -> Result<TableSet>
    where
        I: IntoIterator,
        I::Item: Borrow<Value>,
    {
        self.to_tables_with(submissions, ErrorPolicy::Abort)
    }

    pub fn to_tables_with<I>(&self, submissions: I, policy: ErrorPolicy) -> Result<TableSet>
    where
        I: IntoIterator,
        I::Item: Borrow<Value>,
    {
        let span = info_span!("export", pack = %self.pack.id_string());
        let _guard = span.enter();

        let mut run = self.run();
        for (position, submission) in submissions.into_iter().enumerate() {
            match run.push(submission.borrow()) {
                Ok(()) => {}
                Err(error) if policy == ErrorPolicy::Skip => {
                    warn!(position, %error, "skipping submission");
                    run.skipped += 1;
                }
                Err(error) => return Err(error),
            }
        }
        Ok(run.finish())
    }
}

/// One pass over a submission sequence.
#[derive(Debug)]
pub struct ExportRun<'e> {
    pack: &'e FormPack,
    plan: &'e HeaderPlan,
    flattener: Flattener<'e>,
    tables: Vec<Table>,
    submissions: usize,
    skipped: usize,
}

impl<'e> ExportRun<'e> {
    /// Flatten one submission into the run's tables.
    ///
    /// Submissions tagged with a known but unselected version are skipped.
    pub fn push(&mut self, submission: &Value) -> Result<()> {
        let Some(object) = submission.as_object() else {
            return Err(ExportError::ShapeMismatch {
                message: format!("expected a JSON object, found {}", json_kind(submission)),
            });
        };
        let Some(version) = self.version_for(object.get(VERSION_KEY)) else {
            self.skipped += 1;
            return Ok(());
        };
        for fragment in self.flattener.flatten(version, object) {
            self.tables[fragment.table].rows.push(fragment.cells);
        }
        self.submissions += 1;
        Ok(())
    }

    /// Submissions flattened so far.
    pub fn submissions(&self) -> usize {
        self.submissions
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn finish(self) -> TableSet {
        let tables = TableSet::new(self.tables);
        info!(
            submissions = self.submissions,
            skipped = self.skipped,
            tables = tables.len(),
            rows = tables.row_count(),
            "export finished"
        );
        tables
    }

    fn version_for(&self, tag: Option<&Value>) -> Option<&'e Version> {
        let pack: &'e FormPack = self.pack;
        let selected = self.plan.versions();
        let versions = pack.versions();
        let fallback = selected.last().map(|&index| &versions[index]);
        let Some(Value::String(id)) = tag else {
            return fallback;
        };
        match versions.iter().position(|version| version.id() == Some(id.as_str())) {
            Some(index) if selected.contains(&index) => Some(&versions[index]),
            Some(_) => {
                debug!(version = %id, "skipping submission of unselected version");
                None
            }
            None => {
                debug!(version = %id, "unknown version tag, using the last selected version");
                fallback
            }
        }
    }
}

/// Drop failing items from a fallible sequence, logging each failure.
///
/// Wraps a submission source so a malformed record does not end the export.
pub fn skip_errors<I, T, E>(items: I) -> impl Iterator<Item = T>
where
    I: IntoIterator<Item = std::result::Result<T, E>>,
    E: Display,
{
    items
        .into_iter()
        .enumerate()
        .filter_map(|(position, item)| match item {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(position, %error, "skipping unreadable submission");
                None
            }
        })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
