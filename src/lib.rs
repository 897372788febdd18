use std::path::{Path, PathBuf};

pub mod backup;
pub mod db;
mod error;
pub mod export;
mod id;
pub mod import;
pub mod logging;
pub mod migrate;
pub mod schema;
pub mod state;
pub mod store;
mod time;

pub use error::{AppError, AppResult};
pub use export::{export_snapshot, Snapshot, SNAPSHOT_VERSION};
pub use import::{import_data, ImportOutcome};
pub use schema::Entity;
pub use state::{AppState, ImportGuard};
pub use store::{CompanySettings, Store, StoreError};

/// Directory holding the database file and the backups subdirectory.
/// `SHOPLITE_DATA_DIR` overrides the platform default (tests point it at a
/// temp dir).
pub fn default_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("SHOPLITE_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("shoplite")
}

/// Open the database under `data_dir`, apply pending migrations, and hand
/// back the assembled application state.
pub async fn bootstrap(data_dir: &Path) -> AppResult<AppState> {
    let db_path = data_dir.join(db::DB_FILE_NAME);
    let pool = db::open_sqlite_pool(&db_path)
        .await
        .map_err(AppError::from)?;
    migrate::apply_migrations(&pool)
        .await
        .map_err(AppError::from)?;
    Ok(AppState::new(pool, data_dir.to_path_buf()))
}
