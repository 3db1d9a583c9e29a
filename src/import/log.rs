//! Audit log of one import run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ImportKind;

/// Lifecycle of an import run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    Running,
    Completed,
    CompletedWithErrors,
    Failed,
}

impl ImportStatus {
    /// Convert to string representation for storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStatus::Running => "running",
            ImportStatus::Completed => "completed",
            ImportStatus::CompletedWithErrors => "completed_with_errors",
            ImportStatus::Failed => "failed",
        }
    }
}

impl std::str::FromStr for ImportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(ImportStatus::Running),
            "completed" => Ok(ImportStatus::Completed),
            "completed_with_errors" => Ok(ImportStatus::CompletedWithErrors),
            "failed" => Ok(ImportStatus::Failed),
            other => Err(format!("unknown import status '{other}'")),
        }
    }
}

impl std::fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row that could not be persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowError {
    /// 1-based line in the source file
    pub row_index: usize,
    pub message: String,
}

impl RowError {
    pub fn new(row_index: usize, message: impl Into<String>) -> Self {
        Self {
            row_index,
            message: message.into(),
        }
    }
}

/// Counters and errors of one import run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportLog {
    pub batch_id: String,
    pub file_type: ImportKind,
    pub file_name: String,
    pub total_rows: usize,
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
    pub embedded: usize,
    pub fallback: usize,
    pub drumblocks: usize,
    pub needs_review: usize,
    /// Every error, including those not kept in `error_details`
    pub error_count: usize,
    pub error_details: Vec<RowError>,
    pub status: ImportStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ImportLog {
    /// Open a log for a new run with a fresh batch id.
    pub fn start(file_type: ImportKind, file_name: impl Into<String>, total_rows: usize) -> Self {
        Self {
            batch_id: uuid::Uuid::new_v4().to_string(),
            file_type,
            file_name: file_name.into(),
            total_rows,
            inserted: 0,
            updated: 0,
            skipped: 0,
            embedded: 0,
            fallback: 0,
            drumblocks: 0,
            needs_review: 0,
            error_count: 0,
            error_details: Vec::new(),
            status: ImportStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Count an error, keeping at most `cap` details.
    pub fn record_error(&mut self, error: RowError, cap: usize) {
        self.error_count += 1;
        if self.error_details.len() < cap {
            self.error_details.push(error);
        }
    }

    /// Close a run that reached the end of its input.
    pub fn finish(&mut self) {
        self.status = if self.error_count == 0 {
            ImportStatus::Completed
        } else {
            ImportStatus::CompletedWithErrors
        };
        self.completed_at = Some(Utc::now());
    }

    /// Close a run that was aborted.
    pub fn fail(&mut self, error: RowError, cap: usize) {
        self.record_error(error, cap);
        self.status = ImportStatus::Failed;
        self.completed_at = Some(Utc::now());
    }

    /// Rows that reached the store.
    pub fn persisted(&self) -> usize {
        self.inserted + self.updated
    }
}
