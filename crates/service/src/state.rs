use std::sync::Arc;

use core_types::config::AppConfig;
use image_embedding::EmbeddingProvider;
use matcher::AnswerImageResolver;
use quest_store::{LeaderboardStore, QuestCatalog};
use tokio::sync::Semaphore;

/// Everything a handler needs, cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<EmbeddingProvider>,
    pub resolver: Arc<AnswerImageResolver>,
    pub catalog: Arc<QuestCatalog>,
    pub leaderboard: Arc<LeaderboardStore>,
    /// Bounds concurrent embedding jobs on the blocking pool.
    pub compare_permits: Arc<Semaphore>,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(cfg: &AppConfig, provider: Arc<EmbeddingProvider>) -> Self {
        let workers = cfg.server.effective_compare_workers();
        tracing::debug!(workers, "compare worker permits");
        Self {
            provider,
            resolver: Arc::new(AnswerImageResolver::new(&cfg.paths)),
            catalog: Arc::new(QuestCatalog::new(cfg.paths.quests_dir.clone())),
            leaderboard: Arc::new(LeaderboardStore::new(cfg.paths.leaderboard_file.clone())),
            compare_permits: Arc::new(Semaphore::new(workers)),
            max_body_bytes: cfg.server.max_body_bytes,
        }
    }

    /// A provider exists for the whole life of the state.
    pub const fn model_loaded(&self) -> bool {
        true
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("provider", &self.provider)
            .field("quests_dir", &self.catalog.root())
            .field("leaderboard", &self.leaderboard.path())
            .field("compare_permits", &self.compare_permits.available_permits())
            .finish_non_exhaustive()
    }
}
