use std::{io::ErrorKind, path::PathBuf, time::Duration};

use chrono::Utc;
use tokio::{fs, io::AsyncRead};
use tracing::{debug, info};

use crate::errors::ServiceError;
use crate::storage::layout::{base_name, create_new, fill_new_file, stored_path};

/// Sortable millisecond prefix of file-share names.
const NAME_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S%3f";
const MAX_NAME_ATTEMPTS: usize = 100;

/// File-share emulation: documents named `<yyyyMMddHHmmssfff>_<original name>`.
#[derive(Clone, Debug)]
pub struct FileShare {
    dir: PathBuf,
}

impl FileShare {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    /// Store a document and return its generated name.
    ///
    /// Names are created exclusively; a same-millisecond clash waits for the
    /// next millisecond rather than overwriting.
    pub async fn upload<R>(&self, reader: &mut R, original_name: &str) -> Result<String, ServiceError>
    where
        R: AsyncRead + Unpin + Send + ?Sized,
    {
        let base = base_name(original_name)?;
        fs::create_dir_all(&self.dir).await?;

        for _ in 0..MAX_NAME_ATTEMPTS {
            let name = format!("{}_{}", Utc::now().format(NAME_TIMESTAMP_FORMAT), base);
            let path = self.dir.join(&name);
            match create_new(&path).await {
                Ok(file) => {
                    let bytes = fill_new_file(file, &path, reader).await?;
                    info!(file = %name, bytes, "file share upload");
                    return Ok(name);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!(file = %name, "file share name taken; retrying");
                    tokio::time::sleep(Duration::from_millis(1)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(ServiceError::Conflict(format!("could not allocate a unique name for {base}")))
    }

    pub async fn download(&self, name: &str) -> Result<Vec<u8>, ServiceError> {
        let path = stored_path(&self.dir, name).ok_or_else(|| ServiceError::not_found(name))?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(ServiceError::not_found(name)),
            Err(e) => Err(e.into()),
        }
    }
}
