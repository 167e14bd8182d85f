use crate::{LessonsError, Result};
use fs2::FileExt;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Exclusive advisory lock held for one read-modify-write of the ledger.
pub(crate) struct LedgerLock {
    file: std::fs::File,
}

impl Drop for LedgerLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

pub(crate) fn lock_path_for_ledger(ledger: &Path) -> PathBuf {
    let mut name = ledger
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "lessons.json".into());
    name.push(".lock");
    ledger.with_file_name(name)
}

pub(crate) async fn acquire_ledger_lock(ledger: &Path) -> Result<LedgerLock> {
    let path = lock_path_for_ledger(ledger);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    tokio::task::spawn_blocking(move || -> Result<LedgerLock> {
        use std::fs::OpenOptions;

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|err| {
                LessonsError::LockError(format!("open ledger lock {}: {err}", path.display()))
            })?;

        let start = Instant::now();
        file.lock_exclusive().map_err(|err| {
            LessonsError::LockError(format!("acquire ledger lock {}: {err}", path.display()))
        })?;
        log::debug!(
            "Ledger lock {} acquired after {}ms",
            path.display(),
            start.elapsed().as_millis()
        );

        Ok(LedgerLock { file })
    })
    .await
    .map_err(|err| LessonsError::LockError(format!("join ledger lock task: {err}")))?
}
