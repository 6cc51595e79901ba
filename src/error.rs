use crate::jobs::JobStatus;
use rigsheet_core::PlanError;
use rigsheet_render_core::RenderError;
use rigsheet_resource::CacheError;
use thiserror::Error;
use uuid::Uuid;

/// A comprehensive error type for a synchronous export.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Planning failed: {0}")]
    Plan(#[from] PlanError),

    #[error("Rendering failed: {0}")]
    Render(#[from] RenderError),

    #[error("Image cache error: {0}")]
    Cache(#[from] CacheError),

    /// The markup renderer was requested explicitly but no browser is usable.
    #[error("Renderer unavailable: {hint}")]
    RendererUnavailable { hint: String },

    #[error("Invalid export request: {0}")]
    Request(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Job error: {0}")]
    Job(#[from] JobError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExportError {
    /// Cancellation ends an export without being a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExportError::Render(e) if e.is_cancelled())
    }
}

#[derive(Error, Debug)]
pub enum JobError {
    #[error("Job {0} not found")]
    NotFound(Uuid),

    #[error("Job {id} has no result (status: {status})")]
    NoResult { id: Uuid, status: JobStatus },

    #[error("Job storage error: {0}")]
    Io(#[from] std::io::Error),
}
