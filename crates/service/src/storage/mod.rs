//! Storage abstractions for service layer
//!
//! A local, file-backed emulation of a cloud storage account:
//! - `table_store`: typed entity collections, one JSON file per type
//! - `blob_store`: uploaded images
//! - `queue`: append-only message log
//! - `file_share`: timestamp-named documents
//!
//! `StorageService` is the capability interface callers program against;
//! `LocalStorage` implements it over a single data root.

pub mod layout;
pub mod table_store;
pub mod blob_store;
pub mod queue;
pub mod file_share;
pub mod local;

use async_trait::async_trait;
use models::TableEntity;
use tokio::io::AsyncRead;

use crate::errors::ServiceError;

pub use blob_store::{BlobStore, MEDIA_PREFIX};
pub use file_share::FileShare;
pub use layout::StorageLayout;
pub use local::LocalStorage;
pub use queue::{MessageQueue, QueueMessage};
pub use table_store::TableStore;

#[async_trait]
pub trait StorageService: Send + Sync {
    /// Idempotent; creates the storage areas if they are missing.
    async fn initialize(&self) -> Result<(), ServiceError>;

    async fn list_all<T: TableEntity>(&self) -> Result<Vec<T>, ServiceError>;
    /// `Ok(None)` when no entity has both keys.
    async fn get<T: TableEntity>(&self, partition_key: &str, row_key: &str) -> Result<Option<T>, ServiceError>;
    async fn add<T: TableEntity>(&self, entity: T) -> Result<T, ServiceError>;
    /// Upsert: replaces the entity with the same keys or adds it.
    async fn update<T: TableEntity>(&self, entity: T) -> Result<T, ServiceError>;
    /// Number of removed entities; deleting a missing key is not an error.
    async fn delete<T: TableEntity>(&self, partition_key: &str, row_key: &str) -> Result<usize, ServiceError>;

    async fn upload_image<R>(&self, reader: R, file_name: &str, content_type: &str) -> Result<String, ServiceError>
    where
        R: AsyncRead + Unpin + Send;
    async fn read_image(&self, name: &str) -> Result<Vec<u8>, ServiceError>;

    async fn send_message(&self, message: &str) -> Result<(), ServiceError>;

    async fn upload_to_share<R>(&self, reader: R, file_name: &str) -> Result<String, ServiceError>
    where
        R: AsyncRead + Unpin + Send;
    async fn download_from_share(&self, name: &str) -> Result<Vec<u8>, ServiceError>;
}
