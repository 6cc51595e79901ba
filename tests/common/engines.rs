//! Browser engines standing in for Chromium.

use rigsheet::{CancellationToken, RenderError};
use rigsheet_render_html::BrowserEngine;
use std::time::{Duration, Instant};

/// Returns a canned PDF header.
pub struct CannedEngine;

impl BrowserEngine for CannedEngine {
    fn name(&self) -> &str {
        "canned"
    }

    fn html_to_pdf(&self, html: &str, cancel: &CancellationToken) -> Result<Vec<u8>, RenderError> {
        cancel.checkpoint()?;
        assert!(html.contains("<section class=\"page"));
        Ok(b"%PDF-1.7\n% canned\n".to_vec())
    }
}

/// Always crashes.
pub struct CrashingEngine;

impl BrowserEngine for CrashingEngine {
    fn name(&self) -> &str {
        "crashing"
    }

    fn html_to_pdf(&self, _html: &str, _cancel: &CancellationToken) -> Result<Vec<u8>, RenderError> {
        Err(RenderError::Browser("renderer process exited with signal 11".to_string()))
    }
}

/// Blocks until cancelled, like a browser stuck on a huge page.
pub struct StallingEngine;

impl BrowserEngine for StallingEngine {
    fn name(&self) -> &str {
        "stalling"
    }

    fn html_to_pdf(&self, _html: &str, cancel: &CancellationToken) -> Result<Vec<u8>, RenderError> {
        let deadline = Instant::now() + Duration::from_secs(20);
        while !cancel.is_cancelled() {
            if Instant::now() > deadline {
                return Err(RenderError::Timeout(20));
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        Err(RenderError::Cancelled)
    }
}
