use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::store::Store;

/// Owned handles for one running application: the database pool, the data
/// directory holding the database and its backups, and the import lock.
#[derive(Clone)]
pub struct AppState {
    pool: SqlitePool,
    data_dir: Arc<PathBuf>,
    import_active: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(pool: SqlitePool, data_dir: PathBuf) -> Self {
        Self {
            pool,
            data_dir: Arc::new(data_dir),
            import_active: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn store(&self) -> Store {
        Store::new(self.pool.clone())
    }

    /// Claim the exclusive import slot. The guard releases it on drop, so an
    /// import that panics or errors out does not wedge subsequent imports.
    pub fn begin_import(&self) -> AppResult<ImportGuard> {
        ImportGuard::begin(self.import_active.clone())
    }

    pub fn import_active(&self) -> bool {
        self.import_active.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct ImportGuard {
    flag: Arc<AtomicBool>,
}

impl ImportGuard {
    fn begin(flag: Arc<AtomicBool>) -> AppResult<Self> {
        if flag
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(AppError::new(
                "IMPORT/ALREADY_RUNNING",
                "An import is already running.",
            ));
        }
        Ok(Self { flag })
    }
}

impl Drop for ImportGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_pool;

    #[tokio::test]
    async fn import_guard_is_exclusive_and_released_on_drop() {
        let pool = open_memory_pool().await.unwrap();
        let state = AppState::new(pool, PathBuf::from("/tmp"));

        let guard = state.begin_import().expect("first claim");
        assert!(state.import_active());
        let refused = state.begin_import();
        assert!(refused.is_err());
        assert_eq!(refused.unwrap_err().code(), "IMPORT/ALREADY_RUNNING");

        drop(guard);
        assert!(!state.import_active());
        state.begin_import().expect("claim after release");
    }
}
