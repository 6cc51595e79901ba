use crate::config::BrowserConfig;
use crate::error::ExportError;
use rigsheet_render_html::{BrowserDiagnostics, BrowserStatus, probe_browser};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Which renderer the caller asks for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererMode {
    /// Markup when a browser is available, vector otherwise or on failure.
    #[default]
    Auto,
    Markup,
    Vector,
}

impl std::fmt::Display for RendererMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RendererMode::Auto => write!(f, "auto"),
            RendererMode::Markup => write!(f, "markup"),
            RendererMode::Vector => write!(f, "vector"),
        }
    }
}

impl FromStr for RendererMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(RendererMode::Auto),
            "markup" | "html" => Ok(RendererMode::Markup),
            "vector" | "lopdf" => Ok(RendererMode::Vector),
            other => Err(format!("Invalid renderer mode: {}", other)),
        }
    }
}

/// The renderer that actually produced (or will produce) a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectedRenderer {
    Markup,
    Vector,
}

impl SelectedRenderer {
    pub fn as_str(self) -> &'static str {
        match self {
            SelectedRenderer::Markup => "markup",
            SelectedRenderer::Vector => "vector",
        }
    }
}

impl std::fmt::Display for SelectedRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the host can render with, probed once at startup.
#[derive(Debug, Clone)]
pub struct RendererCapabilities {
    pub browser: BrowserDiagnostics,
}

impl RendererCapabilities {
    pub fn probe(browser: &BrowserConfig) -> Self {
        let caps = Self {
            browser: probe_browser(browser.binary.as_deref()),
        };
        log::info!(
            "renderer capabilities: browser={:?} path={:?} version={:?}",
            caps.browser.status,
            caps.browser.browser_path,
            caps.browser.browser_version
        );
        caps
    }

    /// Capabilities of a host with a ready browser at `path`.
    pub fn with_browser(path: impl Into<PathBuf>, version: Option<String>) -> Self {
        Self {
            browser: BrowserDiagnostics {
                status: BrowserStatus::Ready,
                browser_available: true,
                browser_path: Some(path.into()),
                browser_version: version,
                install_hint: None,
            },
        }
    }

    /// Capabilities of a host without any browser.
    pub fn vector_only() -> Self {
        Self {
            browser: BrowserDiagnostics {
                status: BrowserStatus::BrowserMissing,
                browser_available: false,
                browser_path: None,
                browser_version: None,
                install_hint: Some(rigsheet_render_html::install_hint()),
            },
        }
    }

    pub fn markup_ready(&self) -> bool {
        self.browser.is_ready()
    }

    fn hint(&self) -> String {
        self.browser
            .install_hint
            .clone()
            .unwrap_or_else(rigsheet_render_html::install_hint)
    }
}

/// Picks the renderer for `mode`. Only an explicit markup request can fail.
pub fn select_renderer(
    mode: RendererMode,
    caps: &RendererCapabilities,
) -> Result<SelectedRenderer, ExportError> {
    match mode {
        RendererMode::Vector => Ok(SelectedRenderer::Vector),
        RendererMode::Auto if caps.markup_ready() => Ok(SelectedRenderer::Markup),
        RendererMode::Auto => Ok(SelectedRenderer::Vector),
        RendererMode::Markup if caps.markup_ready() => Ok(SelectedRenderer::Markup),
        RendererMode::Markup => Err(ExportError::RendererUnavailable { hint: caps.hint() }),
    }
}

/// Renderer status payload reported by the `diagnostics` command.
#[derive(Debug, Clone, Serialize)]
pub struct RendererDiagnostics {
    pub renderer_mode: RendererMode,
    /// `None` when the configured mode cannot run on this host.
    pub renderer_active: Option<SelectedRenderer>,
    pub browser_status: BrowserStatus,
    pub browser_available: bool,
    pub browser_path: Option<PathBuf>,
    pub browser_version: Option<String>,
    pub install_hint: Option<String>,
    pub os: String,
}

impl RendererDiagnostics {
    pub fn new(mode: RendererMode, caps: &RendererCapabilities) -> Self {
        Self {
            renderer_mode: mode,
            renderer_active: select_renderer(mode, caps).ok(),
            browser_status: caps.browser.status,
            browser_available: caps.browser.browser_available,
            browser_path: caps.browser.browser_path.clone(),
            browser_version: caps.browser.browser_version.clone(),
            install_hint: caps.browser.install_hint.clone(),
            os: format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_prefers_markup_only_when_ready() {
        let ready = RendererCapabilities::with_browser("/usr/bin/chromium", None);
        let missing = RendererCapabilities::vector_only();
        assert_eq!(select_renderer(RendererMode::Auto, &ready).unwrap(), SelectedRenderer::Markup);
        assert_eq!(select_renderer(RendererMode::Auto, &missing).unwrap(), SelectedRenderer::Vector);
        assert_eq!(select_renderer(RendererMode::Vector, &ready).unwrap(), SelectedRenderer::Vector);
    }

    #[test]
    fn pinned_markup_without_browser_carries_a_hint() {
        let err = select_renderer(RendererMode::Markup, &RendererCapabilities::vector_only()).unwrap_err();
        match err {
            ExportError::RendererUnavailable { hint } => assert!(hint.contains("Chromium")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn modes_parse_from_config_strings() {
        assert_eq!("HTML".parse::<RendererMode>().unwrap(), RendererMode::Markup);
        assert_eq!(" vector ".parse::<RendererMode>().unwrap(), RendererMode::Vector);
        assert!("pdfkit".parse::<RendererMode>().is_err());
    }

    #[test]
    fn diagnostics_report_no_active_renderer_for_unusable_pin() {
        let diagnostics = RendererDiagnostics::new(RendererMode::Markup, &RendererCapabilities::vector_only());
        assert_eq!(diagnostics.renderer_active, None);
        assert!(!diagnostics.browser_available);
        let json = serde_json::to_value(&diagnostics).unwrap();
        assert_eq!(json["browser_status"], "BROWSER_MISSING");
        assert_eq!(json["renderer_mode"], "markup");
    }
}
