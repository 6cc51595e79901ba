use crate::pipeline::SelectedRenderer;
use chrono::{DateTime, Utc};
use rigsheet_render_core::CancellationToken;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Job status enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Done,
    Error,
    Cancelled,
}

impl JobStatus {
    /// Terminal states never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error | JobStatus::Cancelled)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "queued"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Done => write!(f, "done"),
            JobStatus::Error => write!(f, "error"),
            JobStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(JobStatus::Queued),
            "processing" => Ok(JobStatus::Processing),
            "done" => Ok(JobStatus::Done),
            "error" => Ok(JobStatus::Error),
            "cancelled" => Ok(JobStatus::Cancelled),
            _ => Err(format!("Invalid job status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JobProgress {
    pub step: Option<String>,
    pub current: usize,
    pub total: usize,
    pub percent: f32,
}

impl JobProgress {
    pub fn update(&mut self, step: &str, current: usize, total: usize) {
        self.step = Some(step.to_string());
        self.current = current.min(total);
        self.total = total;
        self.percent = if total == 0 {
            0.0
        } else {
            (self.current as f32 / total as f32 * 1000.0).round() / 10.0
        };
    }
}

/// Where a finished document lives until the job expires.
#[derive(Debug, Clone)]
pub enum JobOutput {
    Memory(Vec<u8>),
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct JobResult {
    pub output: JobOutput,
    pub content_type: String,
    pub filename: String,
    pub renderer: SelectedRenderer,
    pub size_bytes: usize,
}

/// Complete job record kept by the manager.
#[derive(Debug, Clone)]
pub struct PdfExportJob {
    pub id: Uuid,
    pub status: JobStatus,

    // Timestamps
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,

    // Result
    pub result: Option<JobResult>,
    pub error: Option<String>,

    pub progress: JobProgress,
    pub cancel_requested: bool,
    pub(crate) cancel: CancellationToken,
}

impl PdfExportJob {
    pub fn new(id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: JobStatus::Queued,
            created_at: now,
            updated_at: now,
            started_at: None,
            finished_at: None,
            result: None,
            error: None,
            progress: JobProgress::default(),
            cancel_requested: false,
            cancel: CancellationToken::new(),
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Moves to a terminal state. Returns false if the job already was final.
    pub fn finish(&mut self, status: JobStatus) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = status;
        self.finished_at = Some(Utc::now());
        self.touch();
        true
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            job_id: self.id,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
            started_at: self.started_at,
            finished_at: self.finished_at,
            progress: self.progress.clone(),
            cancel_requested: self.cancel_requested,
            error: self.error.clone(),
            result: self.result.as_ref().map(|r| JobResultInfo {
                filename: r.filename.clone(),
                content_type: r.content_type.clone(),
                size_bytes: r.size_bytes,
                renderer: r.renderer,
            }),
        }
    }
}

/// Serializable view of a job for status queries.
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,

    pub progress: JobProgress,
    pub cancel_requested: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResultInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobResultInfo {
    pub filename: String,
    pub content_type: String,
    pub size_bytes: usize,
    pub renderer: SelectedRenderer,
}
