use crate::ledger::{LessonLedger, RecordOutcome};
use crate::ledger_lock::acquire_ledger_lock;
use crate::lesson::LessonDraft;
use crate::{LessonsError, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

pub const DEFAULT_LEDGER_PATH: &str = ".claude/memory/.esmc-lessons.json";

/// File-backed lessons ledger.
///
/// Every mutation holds an exclusive lock on `<ledger>.lock` for the whole
/// read-modify-write and lands through a temp file plus rename, so concurrent
/// checkpoints never interleave partial writes.
#[derive(Debug, Clone)]
pub struct LessonStore {
    path: PathBuf,
    default_max_entries: usize,
}

impl LessonStore {
    pub fn new(path: impl Into<PathBuf>, default_max_entries: usize) -> Self {
        Self {
            path: path.into(),
            default_max_entries,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the ledger; a missing file yields an empty ledger that has not
    /// been written yet.
    pub async fn load(&self) -> Result<LessonLedger> {
        read_ledger(&self.path)
            .await
            .map(|ledger| ledger.unwrap_or_else(|| LessonLedger::new(self.default_max_entries)))
    }

    pub async fn record(&self, draft: LessonDraft) -> Result<RecordOutcome> {
        let _lock = acquire_ledger_lock(&self.path).await?;
        let mut ledger = self.load().await?;
        let outcome = ledger.record(draft);
        match &outcome {
            RecordOutcome::Created { lesson, evicted } => {
                write_ledger(&self.path, &ledger).await?;
                log::info!(
                    "Recorded lesson {} in {} ({} evicted)",
                    lesson.id,
                    self.path.display(),
                    evicted.len()
                );
            }
            RecordOutcome::Duplicate { existing_id } => {
                log::info!("Skipping lesson: similar to existing {existing_id}");
            }
        }
        Ok(outcome)
    }
}

async fn read_ledger(path: &Path) -> Result<Option<LessonLedger>> {
    match fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| LessonsError::Corrupted {
                path: path.to_path_buf(),
                source,
            }),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

async fn write_ledger(path: &Path, ledger: &LessonLedger) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    let bytes = serde_json::to_vec_pretty(ledger)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}
