use super::models::{JobOutput, JobResult, JobSnapshot, JobStatus, PdfExportJob};
use crate::config::{JobsConfig, ResultStorage};
use crate::error::{ExportError, JobError};
use crate::pipeline::{ExportPipeline, ExportRequest, ExportedDocument};
use chrono::Utc;
use log::{debug, error, info, warn};
use rigsheet_render_core::CancellationToken;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{Semaphore, watch};
use uuid::Uuid;

struct JobEntry {
    job: PdfExportJob,
    status_tx: watch::Sender<JobStatus>,
}

impl JobEntry {
    fn set_status(&mut self, status: JobStatus) {
        self.job.status = status;
        self.job.touch();
        self.status_tx.send_replace(status);
    }

    fn finish(&mut self, status: JobStatus) -> bool {
        let changed = self.job.finish(status);
        if changed {
            self.status_tx.send_replace(status);
        }
        changed
    }
}

struct Inner {
    pipeline: Arc<ExportPipeline>,
    jobs: Mutex<HashMap<Uuid, JobEntry>>,
    semaphore: Arc<Semaphore>,
    ttl: Duration,
    storage: ResultStorage,
    results_dir: PathBuf,
    purge_image_cache: bool,
}

/// In-process registry of asynchronous exports.
///
/// Cloning is cheap; all clones share the same registry. `submit` must be
/// called from within a Tokio runtime.
#[derive(Clone)]
pub struct JobManager {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for JobManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobManager")
            .field("jobs", &self.len())
            .field("ttl", &self.inner.ttl)
            .field("storage", &self.inner.storage)
            .finish()
    }
}

impl JobManager {
    pub fn new(pipeline: Arc<ExportPipeline>, config: &JobsConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                pipeline,
                jobs: Mutex::new(HashMap::new()),
                semaphore: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
                ttl: config.ttl(),
                storage: config.result_storage,
                results_dir: config.results_dir(),
                purge_image_cache: config.purge_image_cache,
            }),
        }
    }

    pub fn pipeline(&self) -> &ExportPipeline {
        &self.inner.pipeline
    }

    fn jobs(&self) -> MutexGuard<'_, HashMap<Uuid, JobEntry>> {
        self.inner.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a new queued job, sweeping expired ones first.
    pub fn create_job(&self) -> Uuid {
        self.sweep_expired();
        let id = Uuid::new_v4();
        let (status_tx, _) = watch::channel(JobStatus::Queued);
        self.jobs().insert(
            id,
            JobEntry {
                job: PdfExportJob::new(id),
                status_tx,
            },
        );
        info!("Job {} queued", id);
        id
    }

    /// Queues an export and returns its job id immediately.
    pub fn submit(&self, request: ExportRequest) -> Uuid {
        let id = self.create_job();
        let manager = self.clone();
        tokio::spawn(async move { manager.run(id, request).await });
        id
    }

    async fn run(self, id: Uuid, request: ExportRequest) {
        let permit = match self.inner.semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                self.fail(id, format!("Job scheduler closed: {}", e));
                return;
            }
        };

        let Some(cancel) = self.begin(id) else {
            return;
        };

        let worker = self.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            let progress = |step: &str, current: usize, total: usize| {
                worker.record_progress(id, step, current, total);
            };
            worker.inner.pipeline.export_with(&request, &cancel, &progress)
        })
        .await;
        drop(permit);

        match outcome {
            Ok(Ok(document)) => self.complete(id, document).await,
            Ok(Err(e)) if e.is_cancelled() => self.mark_cancelled(id),
            Ok(Err(e)) => self.fail_export(id, e),
            Err(e) => self.fail(id, format!("Export task aborted: {}", e)),
        }
    }

    /// Moves a queued job to `processing`. Returns `None` when the job is gone
    /// or was cancelled while waiting for a slot.
    fn begin(&self, id: Uuid) -> Option<CancellationToken> {
        let mut jobs = self.jobs();
        let entry = jobs.get_mut(&id)?;
        if entry.job.status != JobStatus::Queued {
            debug!("Job {} not started (status: {})", id, entry.job.status);
            return None;
        }
        entry.job.started_at = Some(Utc::now());
        entry.set_status(JobStatus::Processing);
        info!("Job {} processing", id);
        Some(entry.job.cancel.clone())
    }

    fn record_progress(&self, id: Uuid, step: &str, current: usize, total: usize) {
        if let Some(entry) = self.jobs().get_mut(&id) {
            entry.job.progress.update(step, current, total);
            entry.job.touch();
        }
    }

    async fn complete(&self, id: Uuid, document: ExportedDocument) {
        let size_bytes = document.bytes.len();
        let output = match self.inner.storage {
            ResultStorage::Memory => JobOutput::Memory(document.bytes),
            ResultStorage::File => match self.store_file(id, &document.bytes).await {
                Ok(path) => JobOutput::File(path),
                Err(e) => {
                    self.fail(id, format!("Failed to store PDF: {}", e));
                    return;
                }
            },
        };

        let mut jobs = self.jobs();
        let Some(entry) = jobs.get_mut(&id) else {
            drop(jobs);
            discard_output(&output);
            return;
        };
        if entry.job.cancel_requested {
            if entry.finish(JobStatus::Cancelled) {
                info!("Job {} cancelled, discarding finished output", id);
            }
            drop(jobs);
            discard_output(&output);
            return;
        }

        entry.job.result = Some(JobResult {
            output,
            content_type: document.content_type,
            filename: document.filename,
            renderer: document.renderer,
            size_bytes,
        });
        let total = entry.job.progress.total;
        entry.job.progress.update("Terminé", total, total);
        if entry.finish(JobStatus::Done) {
            info!(
                "Job {} done ({} bytes, renderer={})",
                id, size_bytes, document.renderer
            );
        }
    }

    async fn store_file(&self, id: Uuid, bytes: &[u8]) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.inner.results_dir).await?;
        let path = self.inner.results_dir.join(format!("{}.pdf", id));
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    fn mark_cancelled(&self, id: Uuid) {
        if let Some(entry) = self.jobs().get_mut(&id)
            && entry.finish(JobStatus::Cancelled)
        {
            info!("Job {} cancelled", id);
        }
    }

    fn fail_export(&self, id: Uuid, e: ExportError) {
        self.fail(id, e.to_string());
    }

    fn fail(&self, id: Uuid, message: String) {
        error!("Job {} failed: {}", id, message);
        if let Some(entry) = self.jobs().get_mut(&id) {
            if entry.job.cancel_requested {
                entry.finish(JobStatus::Cancelled);
                return;
            }
            entry.job.error = Some(message);
            entry.finish(JobStatus::Error);
        }
    }

    /// Requests cancellation. A queued job is cancelled immediately; a running
    /// one stops at its next checkpoint. Terminal jobs are left untouched.
    pub fn request_cancel(&self, id: Uuid) -> Result<JobSnapshot, JobError> {
        self.evict_expired();
        let mut jobs = self.jobs();
        let entry = jobs.get_mut(&id).ok_or(JobError::NotFound(id))?;
        match entry.job.status {
            JobStatus::Queued => {
                entry.job.cancel_requested = true;
                entry.job.cancel.cancel();
                entry.finish(JobStatus::Cancelled);
                info!("Job {} cancelled before start", id);
            }
            JobStatus::Processing => {
                entry.job.cancel_requested = true;
                entry.job.cancel.cancel();
                entry.job.touch();
                info!("Job {} cancellation requested", id);
            }
            status => debug!("Job {} already {}, cancel ignored", id, status),
        }
        Ok(entry.job.snapshot())
    }

    /// Current state of a job. Jobs past their TTL are reported as not found.
    pub fn status(&self, id: Uuid) -> Result<JobSnapshot, JobError> {
        self.evict_expired();
        self.snapshot(id)
    }

    fn snapshot(&self, id: Uuid) -> Result<JobSnapshot, JobError> {
        self.jobs()
            .get(&id)
            .map(|entry| entry.job.snapshot())
            .ok_or(JobError::NotFound(id))
    }

    /// The finished document of a `done` job.
    pub fn result(&self, id: Uuid) -> Result<ExportedDocument, JobError> {
        self.evict_expired();
        let result = {
            let jobs = self.jobs();
            let entry = jobs.get(&id).ok_or(JobError::NotFound(id))?;
            match (&entry.job.result, entry.job.status) {
                (Some(result), JobStatus::Done) => result.clone(),
                (_, status) => return Err(JobError::NoResult { id, status }),
            }
        };

        let bytes = match result.output {
            JobOutput::Memory(bytes) => bytes,
            JobOutput::File(path) => std::fs::read(path)?,
        };
        Ok(ExportedDocument {
            bytes,
            content_type: result.content_type,
            filename: result.filename,
            renderer: result.renderer,
        })
    }

    /// Resolves once the job reaches a terminal state.
    pub async fn wait(&self, id: Uuid) -> Result<JobSnapshot, JobError> {
        self.evict_expired();
        let mut rx = {
            let jobs = self.jobs();
            let entry = jobs.get(&id).ok_or(JobError::NotFound(id))?;
            entry.status_tx.subscribe()
        };
        rx.wait_for(|status| status.is_terminal())
            .await
            .map_err(|_| JobError::NotFound(id))?;
        self.snapshot(id)
    }

    /// Evicts jobs not updated within the TTL and purges stale cached images
    /// when configured to. Returns how many jobs were removed.
    pub fn sweep_expired(&self) -> usize {
        let evicted = self.evict_expired();
        if self.inner.purge_image_cache {
            match self.inner.pipeline.cache().purge_older_than(self.inner.ttl) {
                Ok(0) => {}
                Ok(n) => debug!("Purged {} stale cached images", n),
                Err(e) => warn!("Image cache purge failed: {}", e),
            }
        }
        evicted
    }

    /// Removes expired registry entries and their stored output.
    fn evict_expired(&self) -> usize {
        let ttl = chrono::Duration::from_std(self.inner.ttl).unwrap_or(chrono::Duration::MAX);
        let now = Utc::now();
        let expired: Vec<PdfExportJob> = {
            let mut jobs = self.jobs();
            let ids: Vec<Uuid> = jobs
                .iter()
                .filter(|(_, entry)| now - entry.job.updated_at > ttl)
                .map(|(id, _)| *id)
                .collect();
            ids.iter()
                .filter_map(|id| jobs.remove(id))
                .map(|entry| entry.job)
                .collect()
        };

        for job in &expired {
            if !job.status.is_terminal() {
                job.cancel.cancel();
            }
            if let Some(result) = &job.result {
                discard_output(&result.output);
            }
            debug!("Job {} expired ({})", job.id, job.status);
        }
        if !expired.is_empty() {
            info!("Evicted {} expired jobs", expired.len());
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.jobs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs().is_empty()
    }
}

fn discard_output(output: &JobOutput) {
    if let JobOutput::File(path) = output
        && let Err(e) = std::fs::remove_file(path)
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!("Failed to remove job output {}: {}", path.display(), e);
    }
}
