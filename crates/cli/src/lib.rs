//! Helpers behind `cityquest-cli`: config loading, local-file comparisons and
//! resolver introspection. Kept out of `main.rs` so they can be tested.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use console::style;
use core_types::config::{
    AppConfig, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH, EncoderBackend, ModelConfig,
    apply_env_overrides, load_config_file,
};
use image_embedding::EmbeddingProvider;
use matcher::{
    AnswerImageResolver, AnswerImageSource, CandidateOutcome, CandidateSet, MatchReport,
    compare_pair, match_candidates,
};
use tracing::debug;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Read the config without creating it; a missing file means defaults.
pub fn load_config(path: Option<&Path>, backend: Option<EncoderBackend>) -> Result<AppConfig> {
    let path = path
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let mut cfg = if path.exists() {
        load_config_file(&path)?
    } else {
        debug!(path = %path.display(), "no config file, using defaults");
        AppConfig::default()
    };
    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok())?;
    if let Some(backend) = backend {
        cfg.model.backend = backend;
    }
    Ok(cfg)
}

pub fn build_provider(cfg: &ModelConfig) -> Result<EmbeddingProvider> {
    EmbeddingProvider::from_config(cfg)
        .with_context(|| format!("initialising {:?} encoder", cfg.backend))
}

pub fn read_image(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("reading {}", path.display()))
}

/// Similarity of two local image files.
pub fn compare_files(provider: &EmbeddingProvider, a: &Path, b: &Path) -> Result<f32> {
    let first = read_image(a)?;
    let second = read_image(b)?;
    let result = compare_pair(provider, &first, &second)?;
    Ok(result.score)
}

/// Run the matcher for a local probe file. A [`matcher::MatchError`] is kept
/// as the error source so callers can downcast it for per-candidate detail.
pub fn match_files(
    provider: &EmbeddingProvider,
    source: &dyn AnswerImageSource,
    probe: &Path,
    ids: &[String],
) -> Result<MatchReport> {
    let probe = read_image(probe)?;
    let candidates: CandidateSet = ids.iter().cloned().collect();
    Ok(match_candidates(provider, source, &probe, &candidates)?)
}

/// One path the resolver would try.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathProbe {
    pub path: PathBuf,
    pub exists: bool,
}

/// The full lookup order for `identifier`, marking which paths exist.
pub fn explain(resolver: &AnswerImageResolver, identifier: &str) -> Result<Vec<PathProbe>> {
    let paths = resolver.candidate_paths(identifier)?;
    Ok(paths
        .into_iter()
        .map(|path| PathProbe {
            exists: path.is_file(),
            path,
        })
        .collect())
}

/// One line per candidate; the winner is starred.
pub fn describe_outcome(outcome: &CandidateOutcome, best: Option<&str>) -> String {
    match &outcome.score {
        Ok(score) if best == Some(outcome.id.as_str()) => format!(
            "{} {:<32} {}",
            style("*").green().bold(),
            outcome.id,
            style(format!("{score:.4}")).green()
        ),
        Ok(score) => format!("  {:<32} {score:.4}", outcome.id),
        Err(err) => format!(
            "{} {:<32} {}",
            style("!").red(),
            outcome.id,
            style(err).dim()
        ),
    }
}
