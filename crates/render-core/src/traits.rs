use crate::context::RenderContext;
use crate::error::RenderError;
use rigsheet_core::PagePlan;

/// A backend that turns a page plan into a complete PDF document.
///
/// Implementations must emit exactly one PDF page per planned page, in plan
/// order, and call [`RenderContext::checkpoint`] before each page and before
/// any expensive sub-step so cancellation is observed promptly.
pub trait PageRenderer {
    /// Short identifier used in logs and diagnostics.
    fn name(&self) -> &'static str;

    fn render(&self, plan: &PagePlan, ctx: &RenderContext<'_>) -> Result<Vec<u8>, RenderError>;
}
