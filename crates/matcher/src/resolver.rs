//! Locate answer photos on disk.
//!
//! Lookup order: every quest folder (sorted by name) and then each existing
//! legacy asset folder, each tried under every relative prefix; finally the
//! bare fallback directories. The first readable file wins.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use core_types::config::PathsConfig;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Answer image '{0}' not found at any of the expected paths")]
    NotFound(String),
    #[error("answer image identifier '{0}' must be a relative path inside the asset tree")]
    InvalidIdentifier(String),
}

/// Bytes of a resolved answer image plus where they came from.
#[derive(Debug, Clone)]
pub struct ResolvedImage {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

/// Anything that can turn an answer identifier into image bytes.
pub trait AnswerImageSource: Send + Sync {
    fn load(&self, identifier: &str) -> Result<Vec<u8>, ResolveError>;
}

#[derive(Debug, Clone)]
pub struct AnswerImageResolver {
    base: PathBuf,
    quests_dir: PathBuf,
    legacy_dirs: Vec<PathBuf>,
    prefixes: Vec<PathBuf>,
    fallback_dirs: Vec<PathBuf>,
}

impl AnswerImageResolver {
    /// Resolve relative to the process working directory.
    pub fn new(paths: &PathsConfig) -> Self {
        Self::with_base(PathBuf::new(), paths)
    }

    /// Resolve relative to `base` instead of the working directory.
    pub fn with_base(base: impl Into<PathBuf>, paths: &PathsConfig) -> Self {
        Self {
            base: base.into(),
            quests_dir: paths.quests_dir.clone(),
            legacy_dirs: paths.legacy_asset_dirs.clone(),
            prefixes: paths.relative_prefixes.clone(),
            fallback_dirs: paths.fallback_dirs.clone(),
        }
    }

    /// Folders searched before the fallbacks, in precedence order.
    pub fn search_folders(&self) -> Vec<PathBuf> {
        let mut folders = Vec::new();
        match fs::read_dir(self.base.join(&self.quests_dir)) {
            Ok(entries) => {
                let mut names: Vec<_> = entries
                    .filter_map(Result::ok)
                    .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()))
                    .map(|e| e.file_name())
                    .collect();
                names.sort();
                folders.extend(names.into_iter().map(|n| self.quests_dir.join(n)));
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                warn!(dir = %self.quests_dir.display(), error = %err, "cannot list quests dir");
            }
        }
        folders.extend(
            self.legacy_dirs
                .iter()
                .filter(|dir| self.base.join(dir).is_dir())
                .cloned(),
        );
        folders
    }

    /// Every path `resolve` would try for `identifier`, in order, relative to
    /// the resolver base.
    pub fn candidate_paths(&self, identifier: &str) -> Result<Vec<PathBuf>, ResolveError> {
        validate_identifier(identifier)?;
        let mut paths = Vec::new();
        for folder in self.search_folders() {
            for prefix in &self.prefixes {
                push_unique(&mut paths, prefix.join(&folder).join(identifier));
            }
        }
        for dir in &self.fallback_dirs {
            push_unique(&mut paths, dir.join(identifier));
        }
        Ok(paths)
    }

    pub fn resolve(&self, identifier: &str) -> Result<ResolvedImage, ResolveError> {
        for path in self.candidate_paths(identifier)? {
            let full = self.base.join(&path);
            if !full.is_file() {
                continue;
            }
            match fs::read(&full) {
                Ok(bytes) => {
                    info!(identifier, path = %path.display(), "resolved answer image");
                    return Ok(ResolvedImage { path, bytes });
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "unreadable answer image, skipping");
                }
            }
        }
        debug!(identifier, "answer image not found");
        Err(ResolveError::NotFound(identifier.to_string()))
    }
}

impl AnswerImageSource for AnswerImageResolver {
    fn load(&self, identifier: &str) -> Result<Vec<u8>, ResolveError> {
        self.resolve(identifier).map(|found| found.bytes)
    }
}

fn validate_identifier(identifier: &str) -> Result<(), ResolveError> {
    if identifier.trim().is_empty() {
        return Err(ResolveError::NotFound(identifier.to_string()));
    }
    let escapes = Path::new(identifier)
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(ResolveError::InvalidIdentifier(identifier.to_string()));
    }
    Ok(())
}

fn push_unique(paths: &mut Vec<PathBuf>, path: PathBuf) {
    if !paths.contains(&path) {
        paths.push(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{TempDir, tempdir};

    /// Default folders, but only paths that stay inside the base.
    fn contained_paths() -> PathsConfig {
        PathsConfig {
            relative_prefixes: vec![PathBuf::new()],
            fallback_dirs: vec![PathBuf::new(), PathBuf::from("assets")],
            ..PathsConfig::default()
        }
    }

    fn layout() -> (TempDir, AnswerImageResolver) {
        layout_with(&contained_paths())
    }

    fn layout_with(paths: &PathsConfig) -> (TempDir, AnswerImageResolver) {
        let dir = tempdir().unwrap();
        let root = dir.path();
        for quest in ["zeta", "alpha", "mid"] {
            fs::create_dir_all(root.join("quests").join(quest)).unwrap();
        }
        fs::write(root.join("quests").join("not-a-folder.txt"), b"x").unwrap();
        fs::create_dir_all(root.join("assets/aloha")).unwrap();
        let resolver = AnswerImageResolver::with_base(root, paths);
        (dir, resolver)
    }

    #[test]
    fn folders_are_sorted_then_existing_legacy_dirs() {
        let (_dir, resolver) = layout();
        let folders = resolver.search_folders();
        assert_eq!(
            folders,
            vec![
                PathBuf::from("quests/alpha"),
                PathBuf::from("quests/mid"),
                PathBuf::from("quests/zeta"),
                PathBuf::from("assets/aloha"),
            ]
        );
    }

    #[test]
    fn candidate_order_is_prefix_major_per_folder_then_fallbacks() {
        let (_dir, resolver) = layout_with(&PathsConfig::default());
        let paths = resolver.candidate_paths("a.jpg").unwrap();
        assert_eq!(paths.len(), 4 * 5 + 3);
        assert_eq!(paths[0], PathBuf::from("quests/alpha/a.jpg"));
        assert_eq!(paths[1], PathBuf::from("../quests/alpha/a.jpg"));
        assert_eq!(paths[2], PathBuf::from("../../quests/alpha/a.jpg"));
        assert_eq!(paths[3], PathBuf::from("src/quests/alpha/a.jpg"));
        assert_eq!(paths[4], PathBuf::from("../src/quests/alpha/a.jpg"));
        assert_eq!(paths[5], PathBuf::from("quests/mid/a.jpg"));
        assert_eq!(paths[20], PathBuf::from("a.jpg"));
        assert_eq!(paths[21], PathBuf::from("assets/a.jpg"));
        assert_eq!(paths[22], PathBuf::from("../assets/a.jpg"));
    }

    #[test]
    fn first_match_in_sorted_order_wins() {
        let (dir, resolver) = layout();
        let root = dir.path();
        fs::write(root.join("quests/zeta/dup.jpg"), b"zeta").unwrap();
        fs::write(root.join("quests/mid/dup.jpg"), b"mid").unwrap();
        let found = resolver.resolve("dup.jpg").unwrap();
        assert_eq!(found.bytes, b"mid");
        assert_eq!(found.path, PathBuf::from("quests/mid/dup.jpg"));
    }

    #[test]
    fn quest_folders_beat_fallbacks() {
        let (dir, resolver) = layout();
        let root = dir.path();
        fs::write(root.join("assets/answer.png"), b"fallback").unwrap();
        assert_eq!(resolver.load("answer.png").unwrap(), b"fallback");
        fs::write(root.join("assets/aloha/answer.png"), b"legacy").unwrap();
        assert_eq!(resolver.load("answer.png").unwrap(), b"legacy");
    }

    #[test]
    fn directories_named_like_the_image_are_skipped() {
        let (dir, resolver) = layout();
        let root = dir.path();
        fs::create_dir_all(root.join("quests/alpha/photo.jpg")).unwrap();
        fs::write(root.join("quests/mid/photo.jpg"), b"real").unwrap();
        assert_eq!(resolver.load("photo.jpg").unwrap(), b"real");
    }

    #[test]
    fn missing_and_empty_identifiers_are_not_found() {
        let (_dir, resolver) = layout();
        assert!(matches!(resolver.resolve("missing.jpg"), Err(ResolveError::NotFound(_))));
        assert!(matches!(resolver.resolve(""), Err(ResolveError::NotFound(_))));
        assert!(matches!(resolver.resolve("   "), Err(ResolveError::NotFound(_))));
    }

    #[test]
    fn escaping_identifiers_are_rejected() {
        let (_dir, resolver) = layout();
        for id in ["../secret.jpg", "a/../../b.jpg", "/etc/passwd"] {
            assert!(
                matches!(resolver.candidate_paths(id), Err(ResolveError::InvalidIdentifier(_))),
                "{id} should be rejected"
            );
        }
        assert!(resolver.candidate_paths("sub/dir/ok.jpg").is_ok());
    }

    #[test]
    fn missing_quests_dir_still_uses_fallbacks() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("bare.jpg"), b"bare").unwrap();
        let resolver = AnswerImageResolver::with_base(dir.path(), &contained_paths());
        assert!(resolver.search_folders().is_empty());
        assert_eq!(resolver.load("bare.jpg").unwrap(), b"bare");
    }

    #[test]
    fn parent_prefixes_reach_outside_the_base() {
        let outer = tempdir().unwrap();
        let base = outer.path().join("server");
        fs::create_dir_all(base.join("quests/alpha")).unwrap();
        fs::create_dir_all(outer.path().join("quests/alpha")).unwrap();
        fs::write(outer.path().join("quests/alpha/stray.jpg"), b"outside").unwrap();

        let contained = AnswerImageResolver::with_base(&base, &contained_paths());
        assert!(matches!(contained.resolve("stray.jpg"), Err(ResolveError::NotFound(_))));

        let default = AnswerImageResolver::with_base(&base, &PathsConfig::default());
        let found = default.resolve("stray.jpg").unwrap();
        assert_eq!(found.path, PathBuf::from("../quests/alpha/stray.jpg"));
    }
}
