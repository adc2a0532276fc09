//! Aggregate outcome of an export run.

use crate::error::ExportError;
use crate::types::NodeKind;
use chrono::{DateTime, Utc};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde::Serialize;
use std::path::PathBuf;

/// Why a node was not (fully) exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    Lookup,
    Cycle,
    Io,
    ContentFetch,
}

impl FailureCategory {
    /// Content failures degrade to a descriptor-only export and keep the run successful.
    pub fn fails_run(self) -> bool {
        match self {
            FailureCategory::Lookup | FailureCategory::Cycle | FailureCategory::Io => true,
            FailureCategory::ContentFetch => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FailureCategory::Lookup => "lookup",
            FailureCategory::Cycle => "cycle",
            FailureCategory::Io => "io",
            FailureCategory::ContentFetch => "content",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeFailure {
    pub id: String,
    pub kind: Option<NodeKind>,
    pub category: FailureCategory,
    pub message: String,
}

impl NodeFailure {
    pub fn from_error(id: &str, kind: Option<NodeKind>, err: &ExportError) -> Self {
        let category = match err {
            ExportError::Io { .. } | ExportError::Serialization(_) => FailureCategory::Io,
            ExportError::ContentFetch { .. } => FailureCategory::ContentFetch,
            _ => FailureCategory::Lookup,
        };
        Self {
            id: id.to_string(),
            kind,
            category,
            message: err.to_string(),
        }
    }

    pub fn cycle(id: &str) -> Self {
        Self {
            id: id.to_string(),
            kind: Some(NodeKind::Folder),
            category: FailureCategory::Cycle,
            message: format!("Folder {} is its own ancestor; not descending", id),
        }
    }
}

/// Counts, failures, and written files of one run.
#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    pub export_root: PathBuf,
    pub root_path: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub folders: usize,
    pub resources: usize,
    pub content_files: usize,
    pub failures: Vec<NodeFailure>,
    /// Paths relative to `export_root`, in write order. Not rendered.
    #[serde(skip)]
    pub written: Vec<PathBuf>,
}

impl ExportSummary {
    pub fn new(export_root: PathBuf, root_path: &str) -> Self {
        Self {
            export_root,
            root_path: root_path.to_string(),
            started_at: Utc::now(),
            finished_at: None,
            folders: 0,
            resources: 0,
            content_files: 0,
            failures: Vec::new(),
            written: Vec::new(),
        }
    }

    pub(crate) fn record_written(&mut self, path: &std::path::Path) {
        let relative = path
            .strip_prefix(&self.export_root)
            .unwrap_or(path)
            .to_path_buf();
        self.written.push(relative);
    }

    pub(crate) fn record_failure(&mut self, failure: NodeFailure) {
        self.failures.push(failure);
    }

    pub(crate) fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn content_absent(&self) -> usize {
        self.resources.saturating_sub(self.content_files)
    }

    pub fn failure_count(&self) -> usize {
        self.failures
            .iter()
            .filter(|f| f.category.fails_run())
            .count()
    }

    pub fn is_success(&self) -> bool {
        self.failure_count() == 0
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}

/// Human-readable summary with a failure table.
pub fn format_summary_text(summary: &ExportSummary) -> String {
    let mut out = String::new();
    let heading = if summary.is_success() {
        "Export complete"
    } else {
        "Export finished with errors"
    };
    out.push_str(&format!("{}\n\n", heading.bold().underline()));
    out.push_str(&format!("  Export root: {}\n", summary.export_root.display()));
    out.push_str(&format!("  Root path: {}\n", summary.root_path));
    out.push_str(&format!("  Folders: {}\n", summary.folders));
    out.push_str(&format!("  Resources: {}\n", summary.resources));
    out.push_str(&format!("  Content files: {}\n", summary.content_files));
    out.push_str(&format!("  Content absent: {}\n", summary.content_absent()));
    out.push_str(&format!("  Failures: {}\n", summary.failure_count()));
    if let Some(finished) = summary.finished_at {
        let elapsed = finished - summary.started_at;
        out.push_str(&format!(
            "  Duration: {}.{:03}s\n",
            elapsed.num_seconds(),
            elapsed.num_milliseconds().rem_euclid(1000)
        ));
    }

    if !summary.failures.is_empty() {
        let mut table = Table::new();
        table.load_preset(UTF8_BORDERS_ONLY);
        table.set_header(vec!["Category", "Kind", "Id", "Message"]);
        for failure in &summary.failures {
            table.add_row(vec![
                failure.category.as_str().to_string(),
                failure
                    .kind
                    .map(|k| k.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                failure.id.clone(),
                failure.message.clone(),
            ]);
        }
        out.push_str(&format!("\n{}\n", table));
    }
    out
}

pub fn format_summary_json(summary: &ExportSummary) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(summary)?)
}
