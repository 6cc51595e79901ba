mod common;

use common::engines::StallingEngine;
use common::fixtures::*;
use common::{GeneratedPdf, TestResult, init_logging};
use rigsheet::{
    ExportConfig, ExportOptions, ExportPipeline, JobError, JobManager, JobStatus,
    RendererCapabilities, ResultStorage, SelectedRenderer,
};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

fn manager(pipeline: ExportPipeline, config: &ExportConfig) -> JobManager {
    JobManager::new(Arc::new(pipeline), &config.jobs)
}

/// A manager whose markup renderer never finishes until cancelled.
fn stalling_manager(ws: &Workspace, max_concurrent: usize) -> JobManager {
    let mut config = ws.config();
    config.jobs.max_concurrent = max_concurrent;
    let pipeline = ExportPipeline::new(
        &config,
        RendererCapabilities::with_browser("/opt/chromium/chrome", None),
    )
    .expect("build pipeline")
    .with_browser_engine(Arc::new(StallingEngine));
    manager(pipeline, &config)
}

async fn wait_for_status(manager: &JobManager, id: Uuid, status: JobStatus) {
    for _ in 0..1000 {
        if matches!(manager.status(id), Ok(snapshot) if snapshot.status == status) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("job {} never reached {}", id, status);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn submitted_job_finishes_with_a_pdf() -> TestResult {
    init_logging();
    let ws = Workspace::new();
    let config = ws.config();
    let manager = manager(ws.vector_pipeline(), &config);

    let id = manager.submit(single_view_request(&ws));
    let snapshot = manager.wait(id).await?;
    assert_eq!(snapshot.status, JobStatus::Done);
    assert_eq!(snapshot.progress.percent, 100.0);
    assert!(snapshot.finished_at.is_some());
    assert!(snapshot.error.is_none());

    let document = manager.result(id)?;
    assert_eq!(document.renderer, SelectedRenderer::Vector);
    assert_eq!(document.filename, "vehicle_inventory_20241102_083000.pdf");
    assert_eq!(GeneratedPdf::from_bytes(document.bytes)?.page_count(), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_job_keeps_a_readable_message() -> TestResult {
    init_logging();
    let ws = Workspace::new();
    let config = ws.config();
    let manager = manager(ws.vector_pipeline(), &config);

    let empty = request(Vec::new(), Vec::new(), ExportOptions::default());
    let id = manager.submit(empty);
    let snapshot = manager.wait(id).await?;
    assert_eq!(snapshot.status, JobStatus::Error);
    assert!(snapshot.error.unwrap_or_default().contains("No content"));
    assert!(matches!(
        manager.result(id),
        Err(JobError::NoResult { status: JobStatus::Error, .. })
    ));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancelling_a_queued_job_is_immediate() -> TestResult {
    init_logging();
    let ws = Workspace::new();
    let manager = stalling_manager(&ws, 1);

    let running = manager.submit(single_view_request(&ws));
    wait_for_status(&manager, running, JobStatus::Processing).await;
    let queued = manager.submit(single_view_request(&ws));
    assert_eq!(manager.status(queued)?.status, JobStatus::Queued);

    let snapshot = manager.request_cancel(queued)?;
    assert_eq!(snapshot.status, JobStatus::Cancelled);

    manager.request_cancel(running)?;
    assert_eq!(manager.wait(running).await?.status, JobStatus::Cancelled);
    // the freed slot must not revive the cancelled job
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(manager.status(queued)?.status, JobStatus::Cancelled);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancelling_a_processing_job_discards_output() -> TestResult {
    init_logging();
    let ws = Workspace::new();
    let manager = stalling_manager(&ws, 2);

    let id = manager.submit(single_view_request(&ws));
    wait_for_status(&manager, id, JobStatus::Processing).await;

    let snapshot = manager.request_cancel(id)?;
    assert!(snapshot.cancel_requested);

    let finished = manager.wait(id).await?;
    assert_eq!(finished.status, JobStatus::Cancelled);
    assert!(finished.result.is_none());
    assert!(finished.error.is_none());
    assert!(matches!(manager.result(id), Err(JobError::NoResult { .. })));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn file_storage_writes_and_sweeps_results() -> TestResult {
    init_logging();
    let ws = Workspace::new();
    let mut config = ws.config();
    config.jobs.result_storage = ResultStorage::File;
    config.jobs.ttl_secs = 1;
    let pipeline = ExportPipeline::new(&config, RendererCapabilities::vector_only())?;
    let manager = manager(pipeline, &config);

    let id = manager.submit(single_view_request(&ws));
    assert_eq!(manager.wait(id).await?.status, JobStatus::Done);

    let stored = config.jobs.results_dir().join(format!("{}.pdf", id));
    assert!(stored.is_file());
    assert!(manager.result(id)?.bytes.starts_with(b"%PDF-"));

    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert_eq!(manager.sweep_expired(), 1);
    assert!(!stored.exists());
    assert!(matches!(manager.status(id), Err(JobError::NotFound(_))));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn lookups_after_the_ttl_evict_the_job_and_its_file() -> TestResult {
    init_logging();
    let ws = Workspace::new();
    let mut config = ws.config();
    config.jobs.result_storage = ResultStorage::File;
    config.jobs.ttl_secs = 1;
    let pipeline = ExportPipeline::new(&config, RendererCapabilities::vector_only())?;
    let manager = manager(pipeline, &config);

    let id = manager.submit(single_view_request(&ws));
    assert_eq!(manager.wait(id).await?.status, JobStatus::Done);
    let stored = config.jobs.results_dir().join(format!("{}.pdf", id));
    assert!(stored.is_file());

    tokio::time::sleep(Duration::from_millis(1100)).await;
    // no new job is created, the lookup alone expires it
    assert!(matches!(manager.status(id), Err(JobError::NotFound(_))));
    assert!(!stored.exists());
    assert!(matches!(manager.result(id), Err(JobError::NotFound(_))));
    assert!(matches!(manager.request_cancel(id), Err(JobError::NotFound(_))));
    assert!(manager.is_empty());
    Ok(())
}

#[tokio::test]
async fn waiting_on_an_unknown_job_fails() {
    let ws = Workspace::new();
    let config = ws.config();
    let manager = manager(ws.vector_pipeline(), &config);
    assert!(matches!(
        manager.wait(Uuid::new_v4()).await,
        Err(JobError::NotFound(_))
    ));
}
