//! Markup renderer for inventory sheets.
//!
//! The plan is turned into one self-contained HTML document (images inlined
//! as data URIs) and printed to PDF by a [`BrowserEngine`], by default a
//! headless Chromium child process.

mod assets;
mod engine;
mod markup;
mod renderer;

pub use engine::{
    BROWSER_ENV_VAR, BrowserDiagnostics, BrowserEngine, BrowserStatus, ChromiumEngine,
    DEFAULT_BROWSER_TIMEOUT, discover_browser, install_hint, probe_browser,
};
pub use markup::{build_document, escape_html};
pub use renderer::MarkupRenderer;
