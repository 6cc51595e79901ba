//! Vehicle inventory PDF export.
//!
//! Aggregates categories and items into per-view sheets, lays out item
//! markers over each view's background photo and renders the result to PDF
//! with either a headless browser or the built-in vector renderer.
//!
//! ```no_run
//! use rigsheet::{ExportConfig, ExportPipeline, ExportRequest};
//!
//! let config = ExportConfig::load(None)?;
//! let pipeline = ExportPipeline::from_config(&config)?;
//! let request = ExportRequest::from_json(&std::fs::read_to_string("request.json")?)?;
//! let document = pipeline.export(&request)?;
//! std::fs::write(&document.filename, &document.bytes)?;
//! # Ok::<(), rigsheet::ExportError>(())
//! ```

pub mod config;
pub mod error;
pub mod jobs;
pub mod pipeline;

pub use config::{ExportConfig, ResultStorage};
pub use error::{ExportError, JobError};
pub use jobs::{JobManager, JobSnapshot, JobStatus};
pub use pipeline::{
    ExportPipeline, ExportRequest, ExportedDocument, PDF_CONTENT_TYPE, RendererCapabilities,
    RendererDiagnostics, RendererMode, SelectedRenderer, export_filename, select_renderer,
};

pub use rigsheet_core::{PagePlan, PageKind, PlanError};
pub use rigsheet_render_core::{CancellationToken, ProgressSink, RenderError};
pub use rigsheet_types::{Category, ExportOptions, Item, PointerTarget, PointerTargets, ViewConfig};
