//! On-disk layout of the local storage emulation and the small file helpers
//! shared by the table, blob, queue and file-share stores.

use std::path::{Path, PathBuf};

use tokio::{
    fs::{self, File, OpenOptions},
    io::{AsyncRead, AsyncWriteExt},
};
use uuid::Uuid;

use crate::errors::ServiceError;

pub const TABLES_DIR: &str = "tables";
pub const UPLOADS_DIR: &str = "uploads";
pub const FILESHARE_DIR: &str = "fileshare";
pub const QUEUE_LOG: &str = "queue.log";

/// Paths of the emulated cloud primitives under one data root.
#[derive(Clone, Debug)]
pub struct StorageLayout {
    pub root: PathBuf,
    pub tables: PathBuf,
    pub uploads: PathBuf,
    pub fileshare: PathBuf,
    pub queue_log: PathBuf,
}

impl StorageLayout {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        let root = root.into();
        Self {
            tables: root.join(TABLES_DIR),
            uploads: root.join(UPLOADS_DIR),
            fileshare: root.join(FILESHARE_DIR),
            queue_log: root.join(QUEUE_LOG),
            root,
        }
    }

    /// Create the three root areas. `create_dir_all` makes this idempotent.
    pub async fn ensure_dirs(&self) -> Result<(), ServiceError> {
        for dir in [&self.tables, &self.uploads, &self.fileshare] {
            fs::create_dir_all(dir).await?;
        }
        Ok(())
    }
}

/// File-name component of a caller-supplied upload name.
///
/// Accepts both `/` and `\` separators since browsers may send client paths.
pub(crate) fn base_name(original: &str) -> Result<&str, ServiceError> {
    let name = original.rsplit(['/', '\\']).next().unwrap_or("").trim();
    if name.is_empty() || name == "." || name == ".." {
        return Err(ServiceError::Validation(format!("invalid file name: {original:?}")));
    }
    Ok(name)
}

/// Path of a previously generated name inside `dir`, or `None` if the name
/// could escape the directory.
pub(crate) fn stored_path(dir: &Path, name: &str) -> Option<PathBuf> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return None;
    }
    Some(dir.join(name))
}

/// Stream `reader` into an already created file; a partial file is removed on failure.
pub(crate) async fn fill_new_file<R>(mut file: File, path: &Path, reader: &mut R) -> Result<u64, ServiceError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let copied = async {
        let n = tokio::io::copy(reader, &mut file).await?;
        file.flush().await?;
        Ok::<u64, std::io::Error>(n)
    }
    .await;
    match copied {
        Ok(n) => Ok(n),
        Err(e) => {
            drop(file);
            let _ = fs::remove_file(path).await;
            Err(e.into())
        }
    }
}

/// Open `path` for writing, failing if it already exists.
pub(crate) async fn create_new(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().write(true).create_new(true).open(path).await
}

/// Replace `path` with `data` so readers see either the old or the new content.
pub(crate) async fn write_atomic(path: &Path, data: &[u8]) -> Result<(), ServiceError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("collection");
    let tmp = path.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()));
    if let Err(e) = fs::write(&tmp, data).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}
