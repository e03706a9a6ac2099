#![cfg(test)]
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::storage::LocalStorage;

/// Fresh, isolated storage root under the system temp dir.
pub fn temp_root(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!("abc_{}_{}", label, Uuid::new_v4()))
}

/// Initialized storage over a fresh temp root; returns the root for reloading.
pub async fn temp_storage(label: &str) -> Result<(LocalStorage, PathBuf), anyhow::Error> {
    use crate::storage::StorageService;

    let root = temp_root(label);
    let storage = LocalStorage::new(&root);
    storage.initialize().await?;
    Ok((storage, root))
}

pub async fn cleanup(root: &Path) {
    let _ = tokio::fs::remove_dir_all(root).await;
}
