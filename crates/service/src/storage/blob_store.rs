use std::{io::ErrorKind, path::PathBuf};

use tokio::{fs, io::AsyncRead};
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::storage::layout::{base_name, create_new, fill_new_file, stored_path};

/// Route prefix under which uploaded images are served back.
pub const MEDIA_PREFIX: &str = "/media/";

/// Image "blob container": flat directory of `<uuid>_<original name>` files.
#[derive(Clone, Debug)]
pub struct BlobStore {
    dir: PathBuf,
}

impl BlobStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    /// Store an image and return its `/media/<name>` reference.
    ///
    /// `content_type` is advisory only and is not persisted.
    pub async fn upload<R>(&self, reader: &mut R, original_name: &str, content_type: &str) -> Result<String, ServiceError>
    where
        R: AsyncRead + Unpin + Send + ?Sized,
    {
        let base = base_name(original_name)?;
        let name = format!("{}_{}", Uuid::new_v4().simple(), base);
        let path = self.dir.join(&name);

        fs::create_dir_all(&self.dir).await?;
        let file = create_new(&path).await?;
        let bytes = fill_new_file(file, &path, reader).await?;
        debug!(%content_type, "image content type not persisted");
        info!(blob = %name, bytes, "image uploaded");
        Ok(format!("{MEDIA_PREFIX}{name}"))
    }

    /// Bytes of a stored image. Accepts either the bare name or its `/media/` reference.
    pub async fn read(&self, name: &str) -> Result<Vec<u8>, ServiceError> {
        let name = name.strip_prefix(MEDIA_PREFIX).unwrap_or(name);
        let path = stored_path(&self.dir, name).ok_or_else(|| ServiceError::not_found(name))?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(ServiceError::not_found(name)),
            Err(e) => Err(e.into()),
        }
    }
}
