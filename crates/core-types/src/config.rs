//! TOML-backed application configuration with environment overrides.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "config/cityquest.toml";
pub const CONFIG_PATH_ENV: &str = "CITYQUEST_CONFIG";
pub const DEFAULT_PORT: u16 = 5000;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub paths: PathsConfig,
    pub model: ModelConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on a request body; base64 photos are large.
    pub max_body_bytes: usize,
    /// Concurrent embedding jobs. 0 means one per available core.
    pub compare_workers: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            max_body_bytes: 32 * 1024 * 1024,
            compare_workers: 0,
        }
    }
}

impl ServerConfig {
    pub fn effective_compare_workers(&self) -> usize {
        if self.compare_workers > 0 {
            return self.compare_workers;
        }
        std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// One sub-directory per quest, holding its JSON/JS file and answer photos.
    pub quests_dir: PathBuf,
    pub leaderboard_file: PathBuf,
    /// Asset folders that predate the quests directory.
    pub legacy_asset_dirs: Vec<PathBuf>,
    /// Prefixes tried in front of every quest/legacy folder, in order.
    pub relative_prefixes: Vec<PathBuf>,
    /// Directories probed for the bare identifier once every folder missed.
    pub fallback_dirs: Vec<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            quests_dir: PathBuf::from("quests"),
            leaderboard_file: PathBuf::from("leaderboard.json"),
            legacy_asset_dirs: vec![
                PathBuf::from("assets/beaverton"),
                PathBuf::from("assets/aloha"),
            ],
            relative_prefixes: vec![
                PathBuf::new(),
                PathBuf::from(".."),
                PathBuf::from("../.."),
                PathBuf::from("src"),
                PathBuf::from("../src"),
            ],
            fallback_dirs: vec![
                PathBuf::new(),
                PathBuf::from("assets"),
                PathBuf::from("../assets"),
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncoderBackend {
    /// CLIP ViT-B/16 vision tower.
    Clip,
    /// Colour histogram; no weights, for offline development.
    Histogram,
}

impl std::str::FromStr for EncoderBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clip" => Ok(Self::Clip),
            "histogram" => Ok(Self::Histogram),
            other => anyhow::bail!("unknown encoder backend `{other}` (expected clip|histogram)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub backend: EncoderBackend,
    /// Hugging Face repository the weights come from.
    pub repo: String,
    /// Local `model.safetensors`; takes precedence over `download`.
    pub weights: PathBuf,
    /// Fetch the weights from the hub when `weights` does not exist.
    pub download: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backend: EncoderBackend::Clip,
            repo: "openai/clip-vit-base-patch16".into(),
            weights: PathBuf::from("models/clip-vit-base-patch16/model.safetensors"),
            download: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` overrides it.
    pub level: String,
    pub json: bool,
    /// Optional log file; stdout is always written.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            file: None,
        }
    }
}

/// Load the config file, writing defaults when it does not exist yet, then
/// apply environment overrides.
///
/// Path resolution: explicit argument, then `CITYQUEST_CONFIG`, then
/// `config/cityquest.toml`.
pub fn load_or_create_config(path: Option<&Path>) -> Result<AppConfig> {
    let path = path
        .map(Path::to_path_buf)
        .or_else(|| env::var_os(CONFIG_PATH_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let mut cfg = if path.exists() {
        load_config_file(&path)?
    } else {
        let cfg = AppConfig::default();
        if let Err(err) = write_config_file(&path, &cfg) {
            tracing::warn!(path = %path.display(), error = %err, "could not write default config");
        }
        cfg
    };
    apply_env_overrides(&mut cfg, |key| env::var(key).ok())?;
    Ok(cfg)
}

pub fn load_config_file(path: &Path) -> Result<AppConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

pub fn write_config_file(path: &Path, cfg: &AppConfig) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating config dir {}", parent.display()))?;
    }
    let body = toml::to_string_pretty(cfg).context("serializing default config")?;
    fs::write(path, body).with_context(|| format!("writing config {}", path.display()))
}

/// Overlay environment variables on top of a loaded config.
///
/// `lookup` is injected so tests do not have to mutate the process env.
pub fn apply_env_overrides<F>(cfg: &mut AppConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = lookup("PORT") {
        cfg.server.port = port
            .trim()
            .parse()
            .with_context(|| format!("PORT must be a port number, got `{port}`"))?;
    }
    if let Some(host) = lookup("CITYQUEST_HOST") {
        cfg.server.host = host;
    }
    if let Some(dir) = lookup("CITYQUEST_QUESTS_DIR") {
        cfg.paths.quests_dir = PathBuf::from(dir);
    }
    if let Some(file) = lookup("CITYQUEST_LEADERBOARD_FILE") {
        cfg.paths.leaderboard_file = PathBuf::from(file);
    }
    if let Some(backend) = lookup("CITYQUEST_MODEL_BACKEND") {
        cfg.model.backend = backend.parse()?;
    }
    if let Some(weights) = lookup("CITYQUEST_MODEL_WEIGHTS") {
        cfg.model.weights = PathBuf::from(weights);
    }
    if let Some(json) = lookup("CITYQUEST_LOG_JSON") {
        cfg.logging.json = matches!(json.as_str(), "1" | "true" | "TRUE" | "yes" | "YES");
    }
    Ok(())
}

/// Load `.env` if present; missing files are not an error.
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}
