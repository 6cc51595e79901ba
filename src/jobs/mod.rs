//! Asynchronous export jobs.

mod manager;
mod models;

pub use manager::JobManager;
pub use models::{
    JobOutput, JobProgress, JobResult, JobResultInfo, JobSnapshot, JobStatus, PdfExportJob,
};
