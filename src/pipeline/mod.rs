//! Synchronous export: aggregate, plan, pick a renderer, render.
//!
//! The pipeline owns the long-lived pieces (media resolver, image cache,
//! browser engine) and is shared by the CLI and the job manager.

mod selection;

pub use selection::{
    RendererCapabilities, RendererDiagnostics, RendererMode, SelectedRenderer, select_renderer,
};

use crate::config::ExportConfig;
use crate::error::ExportError;
use chrono::{Local, NaiveDateTime};
use log::{info, warn};
use rigsheet_core::{PagePlan, build_plan, build_vehicle_views};
use rigsheet_render_core::{CancellationToken, NoProgress, PageRenderer, ProgressSink, RenderContext, RenderError};
use rigsheet_render_html::{BrowserEngine, ChromiumEngine, MarkupRenderer};
use rigsheet_render_lopdf::VectorRenderer;
use rigsheet_resource::{ImageCache, MediaResolver};
use rigsheet_types::{Category, ExportOptions, Item, PointerTargets};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Everything one export needs, as handed over by the caller.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExportRequest {
    pub categories: Vec<Category>,
    pub items: Vec<Item>,
    #[serde(default = "now")]
    pub generated_at: NaiveDateTime,
    pub pointer_targets: PointerTargets,
    pub options: ExportOptions,
}

impl ExportRequest {
    pub fn from_json(json: &str) -> Result<Self, ExportError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A finished PDF and how it was produced.
#[derive(Debug, Clone)]
pub struct ExportedDocument {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub filename: String,
    pub renderer: SelectedRenderer,
}

/// `vehicle_inventory_YYYYMMDD_HHMMSS.pdf`
pub fn export_filename(generated_at: &NaiveDateTime) -> String {
    format!("vehicle_inventory_{}.pdf", generated_at.format("%Y%m%d_%H%M%S"))
}

pub struct ExportPipeline {
    mode: RendererMode,
    capabilities: RendererCapabilities,
    engine: Option<Arc<dyn BrowserEngine>>,
    media: MediaResolver,
    cache: ImageCache,
    image_dpi: u32,
    image_quality: u8,
}

impl std::fmt::Debug for ExportPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportPipeline")
            .field("mode", &self.mode)
            .field("capabilities", &self.capabilities)
            .field("engine", &self.engine.as_ref().map(|e| e.name().to_string()))
            .field("media_root", &self.media.root())
            .field("cache_dir", &self.cache.dir())
            .finish()
    }
}

impl ExportPipeline {
    /// Builds a pipeline for already probed capabilities. A ready browser is
    /// driven as a Chromium child process.
    pub fn new(config: &ExportConfig, capabilities: RendererCapabilities) -> Result<Self, ExportError> {
        let cache = match &config.images.cache_dir {
            Some(dir) => ImageCache::new(dir)?,
            None => ImageCache::in_temp_dir()?,
        };
        let engine = capabilities.browser.browser_path.as_ref().map(|path| {
            Arc::new(ChromiumEngine::new(path).with_timeout(config.browser.timeout())) as Arc<dyn BrowserEngine>
        });
        Ok(Self {
            mode: config.renderer.mode,
            capabilities,
            engine,
            media: MediaResolver::new(&config.media_root),
            cache,
            image_dpi: config.images.dpi,
            image_quality: config.images.quality,
        })
    }

    /// Probes the host and builds the pipeline.
    pub fn from_config(config: &ExportConfig) -> Result<Self, ExportError> {
        let capabilities = RendererCapabilities::probe(&config.browser);
        Self::new(config, capabilities)
    }

    /// Replaces the browser engine used by the markup renderer.
    pub fn with_browser_engine(mut self, engine: Arc<dyn BrowserEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn with_mode(mut self, mode: RendererMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> RendererMode {
        self.mode
    }

    pub fn capabilities(&self) -> &RendererCapabilities {
        &self.capabilities
    }

    pub fn cache(&self) -> &ImageCache {
        &self.cache
    }

    pub fn diagnostics(&self) -> RendererDiagnostics {
        RendererDiagnostics::new(self.mode, &self.capabilities)
    }

    /// Aggregates the request and plans its pages without rendering.
    pub fn plan(&self, request: &ExportRequest) -> Result<PagePlan, ExportError> {
        let views = build_vehicle_views(
            &request.categories,
            &request.items,
            &request.pointer_targets,
            &self.media,
        );
        Ok(build_plan(views, &request.options, rigsheet_resource::probe)?)
    }

    /// Runs a complete export on the calling thread.
    pub fn export(&self, request: &ExportRequest) -> Result<ExportedDocument, ExportError> {
        self.export_with(request, &CancellationToken::new(), &NoProgress)
    }

    /// Runs a complete export, observing `cancel` and reporting to `progress`.
    pub fn export_with(
        &self,
        request: &ExportRequest,
        cancel: &CancellationToken,
        progress: &dyn ProgressSink,
    ) -> Result<ExportedDocument, ExportError> {
        let started = Instant::now();
        cancel.checkpoint()?;
        let plan = self.plan(request)?;
        let planned = Instant::now();

        let selected = select_renderer(self.mode, &self.capabilities)?;
        let ctx = RenderContext::new(request.generated_at, &self.cache, cancel)
            .with_progress(progress)
            .with_image_settings(self.image_dpi, self.image_quality);

        let (bytes, renderer) = match selected {
            SelectedRenderer::Vector => (VectorRenderer::new().render(&plan, &ctx)?, SelectedRenderer::Vector),
            SelectedRenderer::Markup => match self.render_markup(&plan, &ctx) {
                Ok(bytes) => (bytes, SelectedRenderer::Markup),
                Err(e) if e.is_cancelled() => return Err(e.into()),
                Err(e) if self.mode == RendererMode::Auto => {
                    warn!("markup renderer failed, falling back to vector: {}", e);
                    (VectorRenderer::new().render(&plan, &ctx)?, SelectedRenderer::Vector)
                }
                Err(e) => return Err(e.into()),
            },
        };

        info!(
            "[vehicle_inventory_pdf] renderer={} pages={} build_ms={:.2} render_ms={:.2} total_ms={:.2} size_bytes={}",
            renderer,
            plan.len(),
            (planned - started).as_secs_f64() * 1000.0,
            planned.elapsed().as_secs_f64() * 1000.0,
            started.elapsed().as_secs_f64() * 1000.0,
            bytes.len()
        );

        Ok(ExportedDocument {
            bytes,
            content_type: PDF_CONTENT_TYPE.to_string(),
            filename: export_filename(&request.generated_at),
            renderer,
        })
    }

    fn render_markup(&self, plan: &PagePlan, ctx: &RenderContext<'_>) -> Result<Vec<u8>, RenderError> {
        let engine = self.engine.clone().ok_or_else(|| RenderError::Unavailable {
            hint: rigsheet_render_html::install_hint(),
        })?;
        MarkupRenderer::new(engine).render(plan, ctx)
    }
}
