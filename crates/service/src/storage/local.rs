use std::path::PathBuf;

use async_trait::async_trait;
use models::TableEntity;
use tokio::io::AsyncRead;
use tracing::info;

use crate::errors::ServiceError;
use crate::storage::{BlobStore, FileShare, MessageQueue, StorageLayout, StorageService, TableStore};

/// File-backed storage account rooted at one directory.
///
/// Construct once and share by `Arc`; the sub-stores only share the layout.
pub struct LocalStorage {
    layout: StorageLayout,
    tables: TableStore,
    blobs: BlobStore,
    queue: MessageQueue,
    share: FileShare,
}

impl LocalStorage {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        let layout = StorageLayout::new(root);
        Self {
            tables: TableStore::new(&layout.tables),
            blobs: BlobStore::new(&layout.uploads),
            queue: MessageQueue::new(&layout.queue_log),
            share: FileShare::new(&layout.fileshare),
            layout,
        }
    }

    pub fn layout(&self) -> &StorageLayout { &self.layout }
    pub fn tables(&self) -> &TableStore { &self.tables }
}

#[async_trait]
impl StorageService for LocalStorage {
    async fn initialize(&self) -> Result<(), ServiceError> {
        self.layout.ensure_dirs().await?;
        info!(root = %self.layout.root.display(), "storage initialized");
        Ok(())
    }

    async fn list_all<T: TableEntity>(&self) -> Result<Vec<T>, ServiceError> { self.tables.list().await }
    async fn get<T: TableEntity>(&self, partition_key: &str, row_key: &str) -> Result<Option<T>, ServiceError> {
        self.tables.get(partition_key, row_key).await
    }
    async fn add<T: TableEntity>(&self, entity: T) -> Result<T, ServiceError> { self.tables.add(entity).await }
    async fn update<T: TableEntity>(&self, entity: T) -> Result<T, ServiceError> { self.tables.update(entity).await }
    async fn delete<T: TableEntity>(&self, partition_key: &str, row_key: &str) -> Result<usize, ServiceError> {
        self.tables.delete::<T>(partition_key, row_key).await
    }

    async fn upload_image<R>(&self, mut reader: R, file_name: &str, content_type: &str) -> Result<String, ServiceError>
    where
        R: AsyncRead + Unpin + Send,
    {
        self.blobs.upload(&mut reader, file_name, content_type).await
    }
    async fn read_image(&self, name: &str) -> Result<Vec<u8>, ServiceError> { self.blobs.read(name).await }

    async fn send_message(&self, message: &str) -> Result<(), ServiceError> {
        self.queue.send(message).await.map(|_| ())
    }

    async fn upload_to_share<R>(&self, mut reader: R, file_name: &str) -> Result<String, ServiceError>
    where
        R: AsyncRead + Unpin + Send,
    {
        self.share.upload(&mut reader, file_name).await
    }
    async fn download_from_share(&self, name: &str) -> Result<Vec<u8>, ServiceError> { self.share.download(name).await }
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::{Customer, EntityKeys, Order, Product};
    use rust_decimal::Decimal;

    use crate::storage::QueueMessage;
    use crate::test_support::{cleanup, temp_storage};

    #[tokio::test]
    async fn initialize_is_idempotent_and_concurrent_safe() -> Result<(), anyhow::Error> {
        let (storage, root) = temp_storage("local_init").await?;
        let (a, b) = tokio::join!(storage.initialize(), storage.initialize());
        a?;
        b?;
        assert!(tokio::fs::metadata(&storage.layout().tables).await?.is_dir());
        assert!(tokio::fs::metadata(&storage.layout().uploads).await?.is_dir());
        assert!(tokio::fs::metadata(&storage.layout().fileshare).await?.is_dir());
        cleanup(&root).await;
        Ok(())
    }

    #[tokio::test]
    async fn mutations_survive_a_restart() -> Result<(), anyhow::Error> {
        let (storage, root) = temp_storage("local_restart").await?;
        let kept = storage.add(Customer::new("Ada", "Lovelace", "ada")).await?;
        let removed = storage.add(Customer::new("Alan", "Turing", "alan")).await?;
        let mut edited = kept.clone();
        edited.email = "ada@example.com".into();
        storage.update(edited).await?;
        storage.delete::<Customer>("Customer", &removed.keys.row_key).await?;

        let reopened = LocalStorage::new(&root);
        let all = reopened.list_all::<Customer>().await?;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].email, "ada@example.com");
        assert!(reopened.get::<Customer>("Customer", &removed.keys.row_key).await?.is_none());
        cleanup(&root).await;
        Ok(())
    }

    #[tokio::test]
    async fn entity_types_use_independent_collections() -> Result<(), anyhow::Error> {
        let (storage, root) = temp_storage("local_types").await?;
        let mut p = Product::new("Mug", Decimal::new(4500, 2), 10);
        p.keys = EntityKeys::new("Product", "same-key");
        let mut c = Customer::new("Ada", "Lovelace", "ada");
        c.keys = EntityKeys::new("Product", "same-key");
        storage.add(p).await?;
        storage.add(c).await?;

        assert_eq!(storage.list_all::<Product>().await?.len(), 1);
        assert_eq!(storage.list_all::<Customer>().await?.len(), 1);
        assert!(storage.list_all::<Order>().await?.is_empty());
        assert!(storage.tables().path_for::<Product>().ends_with("tables/Product.json"));
        cleanup(&root).await;
        Ok(())
    }

    #[tokio::test]
    async fn list_all_returns_a_detached_copy() -> Result<(), anyhow::Error> {
        let (storage, root) = temp_storage("local_copy").await?;
        storage.add(Customer::new("Ada", "Lovelace", "ada")).await?;
        let mut first = storage.list_all::<Customer>().await?;
        first[0].name = "Changed".into();
        first.clear();
        let second = storage.list_all::<Customer>().await?;
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].name, "Ada");
        cleanup(&root).await;
        Ok(())
    }

    #[tokio::test]
    async fn share_queue_and_blob_through_the_interface() -> Result<(), anyhow::Error> {
        let (storage, root) = temp_storage("local_assets").await?;

        let name = storage.upload_to_share(&[1u8, 2, 3][..], "receipt.pdf").await?;
        assert!(name.contains("receipt.pdf"));
        assert_eq!(storage.download_from_share(&name).await?, vec![1, 2, 3]);
        assert!(matches!(storage.download_from_share("unrelated.pdf").await, Err(ServiceError::NotFound(_))));

        let reference = storage.upload_image(&b"img"[..], "mug.png", "image/png").await?;
        assert_eq!(storage.read_image(&reference).await?, b"img");

        storage.send_message("one").await?;
        storage.send_message("two").await?;
        storage.send_message("three").await?;
        let log = tokio::fs::read_to_string(&storage.layout().queue_log).await?;
        let bodies: Vec<String> = log.lines().map(|l| QueueMessage::parse(l).unwrap().body).collect();
        assert_eq!(bodies, ["one", "two", "three"]);
        cleanup(&root).await;
        Ok(())
    }
}
