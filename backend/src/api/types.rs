//! REST API request and response types.
//!
//! Every stage endpoint answers with a [`StageResponse`] wrapping the stage's
//! own report. Field names are camelCase.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::PathBuf;
use uuid::Uuid;

use crate::planner::PlanOutcome;

/// Pipeline stage names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Split,
    Compress,
    Upload,
}

/// Response sent after a stage ran to completion.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageResponse<R> {
    /// Unique job identifier
    pub job_id: String,

    pub stage: Stage,

    /// Status: "ready" or "warning"
    pub status: String,

    /// Non-fatal problems, in encounter order
    pub warnings: Vec<String>,

    /// Stage-specific report
    pub report: R,
}

impl<R> StageResponse<R> {
    pub fn new(stage: Stage, report: R, warnings: Vec<String>) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            stage,
            status: if warnings.is_empty() { "ready" } else { "warning" }.to_string(),
            warnings,
            report,
        }
    }
}

/// Split report as exposed over HTTP.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitSummary {
    pub small_dirs: Vec<PathBuf>,
    pub manifest_entries: usize,
    /// Row-level failures (malformed rows, missing size tables)
    pub row_errors: usize,
}

impl From<&PlanOutcome> for SplitSummary {
    fn from(outcome: &PlanOutcome) -> Self {
        Self {
            small_dirs: outcome.small_dirs.clone(),
            manifest_entries: outcome.manifest.len(),
            row_errors: outcome.row_errors().count(),
        }
    }
}

/// Optional body of `POST /api/compress`. Missing fields come from config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompressRequest {
    /// Folders to compress; empty means every SMALL folder.
    pub dirs: Vec<PathBuf>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub quality: Option<u8>,
}

/// Optional body of `POST /api/upload`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UploadRequest {
    /// Upload into memory and skip the catalog call.
    pub dry_run: bool,
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
    })
}
