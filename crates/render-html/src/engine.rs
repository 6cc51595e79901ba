//! Headless browser drivers.
//!
//! The markup renderer only needs "HTML in, PDF bytes out". [`ChromiumEngine`]
//! provides that by running a Chromium-family binary as a child process with
//! `--print-to-pdf`, polling it so the timeout and cancellation are honored.

use log::{debug, info, warn};
use rigsheet_render_core::{CancellationToken, RenderError};
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Environment variable consulted when no binary is configured.
pub const BROWSER_ENV_VAR: &str = "CHROME_BIN";

pub const DEFAULT_BROWSER_TIMEOUT: Duration = Duration::from_secs(60);

const VERSION_TIMEOUT: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(50);

const CANDIDATES: &[&str] = &[
    "chromium",
    "chromium-browser",
    "google-chrome-stable",
    "google-chrome",
    "chrome",
    "chrome-headless-shell",
    "headless_shell",
    "msedge",
];

const WELL_KNOWN_PATHS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
];

/// Converts a complete HTML document into PDF bytes.
pub trait BrowserEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Prints `html` to PDF. Implementations poll `cancel` while waiting.
    fn html_to_pdf(&self, html: &str, cancel: &CancellationToken) -> Result<Vec<u8>, RenderError>;
}

impl<E: BrowserEngine + ?Sized> BrowserEngine for Arc<E> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn html_to_pdf(&self, html: &str, cancel: &CancellationToken) -> Result<Vec<u8>, RenderError> {
        (**self).html_to_pdf(html, cancel)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BrowserStatus {
    Ready,
    BrowserMissing,
}

/// Result of looking for a usable browser, reported by `diagnostics`.
#[derive(Debug, Clone, Serialize)]
pub struct BrowserDiagnostics {
    pub status: BrowserStatus,
    pub browser_available: bool,
    pub browser_path: Option<PathBuf>,
    pub browser_version: Option<String>,
    /// Set when the browser is missing.
    pub install_hint: Option<String>,
}

impl BrowserDiagnostics {
    pub fn is_ready(&self) -> bool {
        self.status == BrowserStatus::Ready
    }
}

/// Guidance shown when the markup renderer is requested without a browser.
pub fn install_hint() -> String {
    format!(
        "Chromium est introuvable. Installez Chromium ou Google Chrome (par ex. `apt install chromium`), \
         indiquez son chemin dans la configuration `browser.binary` ou via la variable {}.",
        BROWSER_ENV_VAR
    )
}

fn find_in_path(program: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path_var) {
        let candidate = dir.join(program);
        if candidate.is_file() {
            return Some(candidate);
        }
        if cfg!(windows) {
            let exe = dir.join(format!("{program}.exe"));
            if exe.is_file() {
                return Some(exe);
            }
        }
    }
    None
}

fn resolve_program(program: &Path) -> Option<PathBuf> {
    if program.is_absolute() || program.components().count() > 1 {
        return program.is_file().then(|| program.to_path_buf());
    }
    find_in_path(program.to_str()?)
}

/// Finds a browser binary: explicit override, then `CHROME_BIN`, then `PATH`
/// and well-known install locations. An override that does not resolve is
/// not silently replaced by discovery.
pub fn discover_browser(binary_override: Option<&Path>) -> Option<PathBuf> {
    if let Some(program) = binary_override {
        let resolved = resolve_program(program);
        if resolved.is_none() {
            warn!("configured browser {} not found", program.display());
        }
        return resolved;
    }

    if let Some(value) = std::env::var_os(BROWSER_ENV_VAR) {
        if !value.is_empty() {
            return resolve_program(Path::new(&value));
        }
    }

    CANDIDATES
        .iter()
        .find_map(|name| find_in_path(name))
        .or_else(|| {
            WELL_KNOWN_PATHS
                .iter()
                .map(PathBuf::from)
                .find(|path| path.is_file())
        })
}

fn wait_with_timeout(
    child: &mut Child,
    timeout: Duration,
    cancel: Option<&CancellationToken>,
) -> Result<ExitStatus, RenderError> {
    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            let _ = child.kill();
            let _ = child.wait();
            return Err(RenderError::Cancelled);
        }
        if started.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Err(RenderError::Timeout(timeout.as_secs()));
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

/// Last lines of the browser log, for error messages.
fn log_tail(path: &Path) -> String {
    let text = fs::read_to_string(path).unwrap_or_default();
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(5);
    lines[start..].join(" | ")
}

/// Drives a Chromium-family browser in headless print mode.
#[derive(Debug, Clone)]
pub struct ChromiumEngine {
    binary: PathBuf,
    timeout: Duration,
}

impl ChromiumEngine {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            timeout: DEFAULT_BROWSER_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Locates a browser or fails with an actionable hint.
    pub fn discover(binary_override: Option<&Path>) -> Result<Self, RenderError> {
        discover_browser(binary_override)
            .map(Self::new)
            .ok_or_else(|| RenderError::Unavailable { hint: install_hint() })
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs `--version`. Some builds print nothing, so this is best effort.
    pub fn version(&self) -> Option<String> {
        let scratch = tempfile::tempdir().ok()?;
        let out_path = scratch.path().join("version.txt");
        let out = File::create(&out_path).ok()?;
        let mut child = Command::new(&self.binary)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::from(out))
            .stderr(Stdio::null())
            .spawn()
            .ok()?;
        let status = wait_with_timeout(&mut child, VERSION_TIMEOUT, None).ok()?;
        if !status.success() {
            return None;
        }
        let text = fs::read_to_string(&out_path).ok()?;
        let version = text.trim();
        (!version.is_empty()).then(|| version.to_string())
    }

    fn args(&self, profile_dir: &Path, output: &Path) -> Vec<String> {
        vec![
            "--headless".to_string(),
            "--disable-gpu".to_string(),
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--hide-scrollbars".to_string(),
            "--no-first-run".to_string(),
            "--no-default-browser-check".to_string(),
            "--disable-background-networking".to_string(),
            "--disable-extensions".to_string(),
            "--allow-file-access-from-files".to_string(),
            "--run-all-compositor-stages-before-draw".to_string(),
            "--no-pdf-header-footer".to_string(),
            "--print-to-pdf-no-header".to_string(),
            format!("--user-data-dir={}", profile_dir.display()),
            format!("--print-to-pdf={}", output.display()),
        ]
    }
}

fn file_url(path: &Path) -> String {
    let text = path.display().to_string().replace('\\', "/");
    if text.starts_with('/') {
        format!("file://{text}")
    } else {
        format!("file:///{text}")
    }
}

impl BrowserEngine for ChromiumEngine {
    fn name(&self) -> &str {
        "chromium"
    }

    fn html_to_pdf(&self, html: &str, cancel: &CancellationToken) -> Result<Vec<u8>, RenderError> {
        cancel.checkpoint()?;
        let scratch = tempfile::Builder::new().prefix("rigsheet-print-").tempdir()?;
        let input = scratch.path().join("document.html");
        let output = scratch.path().join("document.pdf");
        let log_path = scratch.path().join("browser.log");
        let profile = scratch.path().join("profile");
        fs::create_dir_all(&profile)?;
        fs::write(&input, html)?;

        let log_file = File::create(&log_path)?;
        let stderr = log_file.try_clone()?;
        let started = Instant::now();
        let mut child = Command::new(&self.binary)
            .args(self.args(&profile, &output))
            .arg(file_url(&input))
            .stdin(Stdio::null())
            .stdout(Stdio::from(log_file))
            .stderr(Stdio::from(stderr))
            .spawn()
            .map_err(|e| RenderError::Browser(format!("failed to launch {}: {}", self.binary.display(), e)))?;
        debug!("browser pid {} printing {} bytes of markup", child.id(), html.len());

        let status = wait_with_timeout(&mut child, self.timeout, Some(cancel))?;
        if !status.success() {
            return Err(RenderError::Browser(format!(
                "{} exited with {}: {}",
                self.binary.display(),
                status,
                log_tail(&log_path)
            )));
        }
        let bytes = fs::read(&output).map_err(|_| {
            RenderError::Browser(format!("browser produced no PDF: {}", log_tail(&log_path)))
        })?;
        info!(
            "browser print finished in {:.2} ms ({} bytes)",
            started.elapsed().as_secs_f64() * 1000.0,
            bytes.len()
        );
        Ok(bytes)
    }
}

/// Looks for a browser and reports what was found.
pub fn probe_browser(binary_override: Option<&Path>) -> BrowserDiagnostics {
    match discover_browser(binary_override) {
        Some(path) => {
            let version = ChromiumEngine::new(&path).version();
            BrowserDiagnostics {
                status: BrowserStatus::Ready,
                browser_available: true,
                browser_path: Some(path),
                browser_version: version,
                install_hint: None,
            }
        }
        None => {
            warn!("headless browser not found; {}", install_hint());
            BrowserDiagnostics {
                status: BrowserStatus::BrowserMissing,
                browser_available: false,
                browser_path: None,
                browser_version: None,
                install_hint: Some(install_hint()),
            }
        }
    }
}
