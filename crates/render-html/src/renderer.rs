use crate::engine::{BrowserEngine, ChromiumEngine};
use crate::markup::build_document;
use log::debug;
use rigsheet_core::PagePlan;
use rigsheet_render_core::{PageRenderer, RenderContext, RenderError};
use std::time::Instant;

/// Builds an HTML document for the plan and prints it with a browser engine.
#[derive(Debug, Clone)]
pub struct MarkupRenderer<E = ChromiumEngine> {
    engine: E,
}

impl<E: BrowserEngine> MarkupRenderer<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }
}

impl<E: BrowserEngine> PageRenderer for MarkupRenderer<E> {
    fn name(&self) -> &'static str {
        "markup"
    }

    fn render(&self, plan: &PagePlan, ctx: &RenderContext<'_>) -> Result<Vec<u8>, RenderError> {
        ctx.checkpoint()?;
        let started = Instant::now();
        let html = build_document(plan, ctx)?;
        let built = Instant::now();

        ctx.checkpoint()?;
        let bytes = self.engine.html_to_pdf(&html, ctx.cancel)?;
        if !bytes.starts_with(b"%PDF-") {
            return Err(RenderError::Browser(format!(
                "{} returned {} bytes that are not a PDF",
                self.engine.name(),
                bytes.len()
            )));
        }
        ctx.report("Rendu des pages", plan.len(), plan.len());
        debug!(
            "markup render pages={} html_bytes={} html_build_ms={:.2} html_render_ms={:.2} size_bytes={}",
            plan.len(),
            html.len(),
            (built - started).as_secs_f64() * 1000.0,
            built.elapsed().as_secs_f64() * 1000.0,
            bytes.len()
        );
        Ok(bytes)
    }
}
