//! Data directory layout for Salesline.

use std::path::{Path, PathBuf};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "SALESLINE_DATA_DIR";

/// Resolve the data directory: `SALESLINE_DATA_DIR`, else `~/.salesline`.
pub fn resolve_data_dir() -> PathBuf {
    resolve_data_dir_from(std::env::var(DATA_DIR_ENV).ok())
}

fn resolve_data_dir_from(env_override: Option<String>) -> PathBuf {
    if let Some(dir) = env_override.filter(|d| !d.trim().is_empty()) {
        return PathBuf::from(dir);
    }

    // Use home directory fallback: ~/.salesline
    if let Some(home) = dirs::home_dir() {
        return home.join(".salesline");
    }

    // Last resort: current directory
    PathBuf::from(".salesline")
}

/// Path of the SQLite database inside the data directory.
pub fn database_path(data_dir: &Path) -> PathBuf {
    data_dir.join("salesline.db")
}

/// SQLite connection URL for the database inside `data_dir`.
pub fn database_url(data_dir: &Path) -> String {
    format!("sqlite://{}?mode=rwc", database_path(data_dir).display())
}

/// Create the data directory if it does not exist yet.
pub async fn ensure_data_dir(data_dir: &Path) -> Result<(), std::io::Error> {
    tokio::fs::create_dir_all(data_dir).await
}
