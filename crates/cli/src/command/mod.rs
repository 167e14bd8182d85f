pub mod checkpoint;
pub mod lessons;
pub mod synthesize;

use phc_checkpoint::CheckpointConfig;
use phc_lessons::LessonStore;
use phc_protocol::ErrorEnvelope;
use std::path::PathBuf;

use crate::exit_with_error;

/// Flags shared by every subcommand.
pub struct GlobalOptions {
    pub config: Option<PathBuf>,
    pub lessons_path: Option<PathBuf>,
}

impl GlobalOptions {
    /// Resolves the layered checkpoint config; a bad config is an input error.
    pub async fn checkpoint_config(&self) -> CheckpointConfig {
        let mut cfg = match CheckpointConfig::load(self.config.as_deref()).await {
            Ok(cfg) => cfg,
            Err(err) => exit_with_error(
                &ErrorEnvelope::new("invalid_config", format!("{err:#}"))
                    .with_hint("Fix the config file or the PHC_* environment variables"),
            ),
        };
        if let Some(path) = &self.lessons_path {
            cfg.lessons_path = path.clone();
        }
        cfg
    }

    pub async fn lesson_store(&self) -> LessonStore {
        let cfg = self.checkpoint_config().await;
        LessonStore::new(cfg.lessons_path, cfg.max_entries)
    }
}
