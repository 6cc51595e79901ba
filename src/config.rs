//! Export configuration.
//!
//! Values come from an optional TOML file layered with `RIGSHEET__*`
//! environment variables, e.g. `RIGSHEET__BROWSER__BINARY=/usr/bin/chromium`
//! or `RIGSHEET__JOBS__RESULT_STORAGE=file`. Every field has a default, so an
//! empty configuration is valid.

use crate::pipeline::RendererMode;
use rigsheet_render_html::DEFAULT_BROWSER_TIMEOUT;
use rigsheet_resource::{DEFAULT_IMAGE_DPI, DEFAULT_IMAGE_QUALITY};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming a config file to load instead of `rigsheet.toml`.
pub const CONFIG_ENV_VAR: &str = "RIGSHEET_CONFIG";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory that `/media/...` URLs resolve under.
    pub media_root: PathBuf,
    pub renderer: RendererConfig,
    pub browser: BrowserConfig,
    pub images: ImageConfig,
    pub jobs: JobsConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub mode: RendererMode,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Browser executable; discovered on `PATH` when unset.
    pub binary: Option<PathBuf>,
    pub timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            binary: None,
            timeout_secs: DEFAULT_BROWSER_TIMEOUT.as_secs(),
        }
    }
}

impl BrowserConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    pub dpi: u32,
    pub quality: u8,
    /// Defaults to a directory under the system temp dir.
    pub cache_dir: Option<PathBuf>,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_IMAGE_DPI,
            quality: DEFAULT_IMAGE_QUALITY,
            cache_dir: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStorage {
    #[default]
    Memory,
    File,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    pub ttl_secs: u64,
    pub max_concurrent: usize,
    pub result_storage: ResultStorage,
    /// Where file results are written; defaults under the system temp dir.
    pub dir: Option<PathBuf>,
    /// Also drop image cache files older than the TTL during sweeps.
    pub purge_image_cache: bool,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 30 * 60,
            max_concurrent: num_cpus::get(),
            result_storage: ResultStorage::Memory,
            dir: None,
            purge_image_cache: false,
        }
    }
}

impl JobsConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn results_dir(&self) -> PathBuf {
        self.dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("rigsheet_jobs"))
    }
}

impl ExportConfig {
    /// Loads `path` if given, otherwise the file named by `RIGSHEET_CONFIG`,
    /// otherwise `rigsheet.toml` in the working directory when present.
    /// Environment variables are always layered on top.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from))
            .filter(|p| !p.as_os_str().is_empty());
        builder = match explicit {
            Some(file) => builder.add_source(config::File::from(file).required(true)),
            None => builder.add_source(config::File::with_name("rigsheet").required(false)),
        };

        builder = builder.add_source(
            config::Environment::with_prefix("RIGSHEET")
                .separator("__")
                .try_parsing(true),
        );

        let config: ExportConfig = builder.build()?.try_deserialize()?;
        log::debug!("loaded configuration: {:?}", config);
        Ok(config)
    }
}
