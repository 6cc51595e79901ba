use crate::error::RenderError;
use chrono::NaiveDateTime;
use log::debug;
use rigsheet_resource::{
    DEFAULT_IMAGE_DPI, DEFAULT_IMAGE_QUALITY, ImageCache, ImagePreprocessResult,
    target_pixels_for_bounds,
};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared cancellation flag, checked cooperatively by renderers.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Fails with [`RenderError::Cancelled`] once cancellation was requested.
    pub fn checkpoint(&self) -> Result<(), RenderError> {
        if self.is_cancelled() {
            Err(RenderError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Receives progress as a renderer advances through the plan.
pub trait ProgressSink: Send + Sync {
    fn report(&self, step: &str, current: usize, total: usize);
}

impl<F> ProgressSink for F
where
    F: Fn(&str, usize, usize) + Send + Sync,
{
    fn report(&self, step: &str, current: usize, total: usize) {
        self(step, current, total)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _step: &str, _current: usize, _total: usize) {}
}

/// Everything a renderer needs besides the plan itself.
pub struct RenderContext<'a> {
    pub generated_at: NaiveDateTime,
    pub cache: &'a ImageCache,
    pub image_dpi: u32,
    pub image_quality: u8,
    pub cancel: &'a CancellationToken,
    pub progress: &'a dyn ProgressSink,
}

impl<'a> RenderContext<'a> {
    pub fn new(generated_at: NaiveDateTime, cache: &'a ImageCache, cancel: &'a CancellationToken) -> Self {
        Self {
            generated_at,
            cache,
            image_dpi: DEFAULT_IMAGE_DPI,
            image_quality: DEFAULT_IMAGE_QUALITY,
            cancel,
            progress: &NoProgress,
        }
    }

    pub fn with_progress(mut self, progress: &'a dyn ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_image_settings(mut self, dpi: u32, quality: u8) -> Self {
        self.image_dpi = dpi;
        self.image_quality = quality;
        self
    }

    pub fn checkpoint(&self) -> Result<(), RenderError> {
        self.cancel.checkpoint()
    }

    pub fn report(&self, step: &str, current: usize, total: usize) {
        self.progress.report(step, current, total);
    }

    /// Prepares `source` for drawing into a `width_pt` x `height_pt` area.
    pub fn prepare_image(
        &self,
        source: &Path,
        width_pt: f32,
        height_pt: f32,
    ) -> Result<ImagePreprocessResult, RenderError> {
        self.checkpoint()?;
        let (w, h) = target_pixels_for_bounds(width_pt, height_pt, self.image_dpi);
        let result = self.cache.preprocess(source, w, h, self.image_quality)?;
        debug!(
            "prepared {} at {}x{}px (hit={}, {:.1} ms)",
            source.display(),
            w,
            h,
            result.cache_hit,
            result.elapsed_ms()
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn token_is_shared_between_clones() {
        let token = CancellationToken::new();
        let worker_side = token.clone();
        assert!(worker_side.checkpoint().is_ok());
        token.cancel();
        assert!(worker_side.is_cancelled());
        assert!(matches!(worker_side.checkpoint(), Err(RenderError::Cancelled)));
    }

    #[test]
    fn closures_are_progress_sinks() {
        let seen = Mutex::new(Vec::new());
        let sink = |step: &str, current: usize, total: usize| {
            seen.lock().unwrap().push(format!("{step} {current}/{total}"));
        };
        sink.report("page", 1, 3);
        NoProgress.report("ignored", 0, 0);
        assert_eq!(seen.into_inner().unwrap(), vec!["page 1/3"]);
    }
}
