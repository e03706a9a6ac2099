use std::{io::ErrorKind, path::PathBuf, sync::Arc};

use chrono::Utc;
use dashmap::DashMap;
use models::TableEntity;
use tokio::{fs, sync::Mutex};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::storage::layout::write_atomic;

/// File-backed table emulation: one pretty-printed JSON array per entity type.
///
/// Every mutation is a full read-modify-write of the type's collection file.
/// Mutations of the same table are serialized by a per-table async mutex so
/// concurrent writers cannot drop each other's changes; reads take no lock and
/// always deserialize a fresh copy from disk.
#[derive(Clone)]
pub struct TableStore {
    dir: PathBuf,
    locks: Arc<DashMap<&'static str, Arc<Mutex<()>>>>,
}

impl TableStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into(), locks: Arc::new(DashMap::new()) }
    }

    /// Backing file for `T`'s collection.
    pub fn path_for<T: TableEntity>(&self) -> PathBuf {
        self.dir.join(format!("{}.json", T::TABLE))
    }

    fn lock_for(&self, table: &'static str) -> Arc<Mutex<()>> {
        self.locks.entry(table).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    async fn load<T: TableEntity>(&self) -> Result<Vec<T>, ServiceError> {
        let path = self.path_for::<T>();
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes).map_err(|source| {
            warn!(table = T::TABLE, path = %path.display(), error = %source, "collection file is malformed");
            ServiceError::Malformed { table: T::TABLE, source }
        })
    }

    async fn save<T: TableEntity>(&self, entities: &[T]) -> Result<(), ServiceError> {
        let data = serde_json::to_vec_pretty(entities).map_err(ServiceError::Serialize)?;
        write_atomic(&self.path_for::<T>(), &data).await?;
        debug!(table = T::TABLE, count = entities.len(), "collection saved");
        Ok(())
    }

    /// Apply a mutation to `T`'s collection under the table lock and persist it.
    ///
    /// The closure reports whether anything changed; unchanged collections are not rewritten.
    pub async fn update_collection<T, F, R>(&self, f: F) -> Result<R, ServiceError>
    where
        T: TableEntity,
        F: FnOnce(&mut Vec<T>) -> Result<(R, bool), ServiceError>,
    {
        let lock = self.lock_for(T::TABLE);
        let _guard = lock.lock().await;
        let mut list = self.load::<T>().await?;
        let (out, changed) = f(&mut list)?;
        if changed {
            self.save(&list).await?;
        }
        Ok(out)
    }

    /// Full collection for `T`; empty when nothing was stored yet.
    pub async fn list<T: TableEntity>(&self) -> Result<Vec<T>, ServiceError> {
        self.load::<T>().await
    }

    pub async fn get<T: TableEntity>(&self, partition_key: &str, row_key: &str) -> Result<Option<T>, ServiceError> {
        let list = self.load::<T>().await?;
        Ok(list.into_iter().find(|e| e.keys().matches(partition_key, row_key)))
    }

    /// Append `entity`, assigning blank keys. Key collisions are not detected.
    pub async fn add<T: TableEntity>(&self, entity: T) -> Result<T, ServiceError> {
        let stored = self
            .update_collection::<T, _, _>(|list| Ok((push_new(list, entity), true)))
            .await?;
        debug!(table = T::TABLE, row_key = %stored.row_key(), "entity added");
        Ok(stored)
    }

    /// Replace the entity with the same keys, or add it when none exists (upsert).
    ///
    /// A caller ETag other than `*` must match the stored one, else `Conflict`.
    pub async fn update<T: TableEntity>(&self, entity: T) -> Result<T, ServiceError> {
        self.update_collection::<T, _, _>(|list| {
            let keys = entity.keys();
            let Some(idx) = list.iter().position(|e| e.keys().matches(&keys.partition_key, &keys.row_key)) else {
                debug!(table = T::TABLE, row_key = %keys.row_key, "update target missing; adding");
                return Ok((push_new(list, entity), true));
            };
            if keys.is_conditional() && keys.etag != list[idx].keys().etag {
                return Err(ServiceError::Conflict(format!(
                    "{} {}/{} was modified since it was read",
                    T::TABLE, keys.partition_key, keys.row_key
                )));
            }
            let mut entity = entity;
            stamp(&mut entity);
            list[idx] = entity.clone();
            Ok((entity, true))
        })
        .await
    }

    /// Remove every entity with the given keys; returns how many were removed.
    pub async fn delete<T: TableEntity>(&self, partition_key: &str, row_key: &str) -> Result<usize, ServiceError> {
        let removed = self
            .update_collection::<T, _, _>(|list| {
                let before = list.len();
                list.retain(|e| !e.keys().matches(partition_key, row_key));
                let removed = before - list.len();
                Ok((removed, removed > 0))
            })
            .await?;
        debug!(table = T::TABLE, %row_key, removed, "entity delete");
        Ok(removed)
    }
}

fn stamp<T: TableEntity>(entity: &mut T) {
    let keys = entity.keys_mut();
    keys.timestamp = Some(Utc::now());
    keys.etag = Some(Uuid::new_v4().simple().to_string());
}

fn push_new<T: TableEntity>(list: &mut Vec<T>, mut entity: T) -> T {
    let keys = entity.keys_mut();
    if keys.partition_key.trim().is_empty() {
        keys.partition_key = T::TABLE.to_string();
    }
    if keys.row_key.trim().is_empty() {
        keys.row_key = Uuid::new_v4().to_string();
    }
    stamp(&mut entity);
    list.push(entity.clone());
    entity
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::{Customer, EntityKeys, Product};
    use rust_decimal::Decimal;

    use crate::test_support::{cleanup, temp_root};

    fn store_at(root: &std::path::Path) -> TableStore {
        TableStore::new(root.join("tables"))
    }

    #[tokio::test]
    async fn add_assigns_missing_keys_and_round_trips() -> Result<(), anyhow::Error> {
        let root = temp_root("table_add");
        let store = store_at(&root);

        let before = Utc::now();
        let input = Customer::new("Ada", "Lovelace", "ada");
        let stored = store.add(input.clone()).await?;
        assert_eq!(stored.keys.partition_key, "Customer");
        assert!(!stored.keys.row_key.is_empty());
        assert!(stored.keys.timestamp.unwrap() >= before);
        assert!(stored.keys.etag.is_some());

        let found = store.get::<Customer>("Customer", &stored.keys.row_key).await?.unwrap();
        assert_eq!(found, stored);
        // identical to the input apart from the store-managed columns
        let mut expected = input;
        expected.keys = EntityKeys { timestamp: found.keys.timestamp, etag: found.keys.etag.clone(), ..EntityKeys::new("Customer", &found.keys.row_key) };
        assert_eq!(found, expected);

        cleanup(&root).await;
        Ok(())
    }

    #[tokio::test]
    async fn generated_row_keys_are_unique() -> Result<(), anyhow::Error> {
        let root = temp_root("table_unique");
        let store = store_at(&root);
        let a = store.add(Customer::new("A", "A", "a")).await?;
        let b = store.add(Customer::new("B", "B", "b")).await?;
        assert_ne!(a.keys.row_key, b.keys.row_key);
        assert_eq!(store.list::<Customer>().await?.len(), 2);
        cleanup(&root).await;
        Ok(())
    }

    #[tokio::test]
    async fn caller_keys_are_kept() -> Result<(), anyhow::Error> {
        let root = temp_root("table_keys");
        let store = store_at(&root);
        let mut p = Product::new("Mug", Decimal::new(500, 2), 4);
        p.keys = EntityKeys::new("Kitchen", "mug-1");
        store.add(p).await?;
        assert!(store.get::<Product>("Kitchen", "mug-1").await?.is_some());
        assert!(store.get::<Product>("Product", "mug-1").await?.is_none());
        cleanup(&root).await;
        Ok(())
    }

    #[tokio::test]
    async fn update_replaces_in_place_and_refreshes_stamp() -> Result<(), anyhow::Error> {
        let root = temp_root("table_update");
        let store = store_at(&root);
        let first = store.add(Customer::new("Ada", "Lovelace", "ada")).await?;
        let other = store.add(Customer::new("Alan", "Turing", "alan")).await?;

        let mut edited = first.clone();
        edited.surname = "King".into();
        let updated = store.update(edited).await?;
        assert_ne!(updated.keys.etag, first.keys.etag);
        assert!(updated.keys.timestamp >= first.keys.timestamp);

        let all = store.list::<Customer>().await?;
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].surname, "King");
        assert_eq!(all[1], other);
        cleanup(&root).await;
        Ok(())
    }

    #[tokio::test]
    async fn update_of_missing_key_behaves_like_add() -> Result<(), anyhow::Error> {
        let root = temp_root("table_upsert");
        let store = store_at(&root);
        let mut c = Customer::new("Grace", "Hopper", "grace");
        c.keys = EntityKeys::new("Customer", "gh");
        let stored = store.update(c.clone()).await?;
        let found = store.get::<Customer>("Customer", "gh").await?.unwrap();
        assert_eq!(found, stored);
        assert_eq!(found.username, "grace");

        // blank keys on update get assigned, same as add
        let blank = store.update(Customer::new("Blank", "Keys", "bk")).await?;
        assert_eq!(blank.keys.partition_key, "Customer");
        assert!(!blank.keys.row_key.is_empty());
        assert_eq!(store.list::<Customer>().await?.len(), 2);
        cleanup(&root).await;
        Ok(())
    }

    #[tokio::test]
    async fn stale_etag_is_a_conflict_and_writes_nothing() -> Result<(), anyhow::Error> {
        let root = temp_root("table_etag");
        let store = store_at(&root);
        let v1 = store.add(Customer::new("Ada", "Lovelace", "ada")).await?;

        let mut first_edit = v1.clone();
        first_edit.name = "Augusta".into();
        let v2 = store.update(first_edit).await?;

        let mut stale = v1.clone();
        stale.name = "Stale".into();
        let err = store.update(stale).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        let current = store.get::<Customer>("Customer", &v1.keys.row_key).await?.unwrap();
        assert_eq!(current, v2);

        let mut forced = v1.clone();
        forced.keys.etag = Some(models::entity::ETAG_ANY.into());
        forced.name = "Forced".into();
        assert_eq!(store.update(forced).await?.name, "Forced");
        cleanup(&root).await;
        Ok(())
    }

    #[tokio::test]
    async fn delete_is_idempotent() -> Result<(), anyhow::Error> {
        let root = temp_root("table_delete");
        let store = store_at(&root);
        let keep = store.add(Customer::new("Keep", "Me", "keep")).await?;
        let gone = store.add(Customer::new("Drop", "Me", "drop")).await?;

        assert_eq!(store.delete::<Customer>("Customer", &gone.keys.row_key).await?, 1);
        let after_first = store.list::<Customer>().await?;
        assert_eq!(store.delete::<Customer>("Customer", &gone.keys.row_key).await?, 0);
        assert_eq!(store.list::<Customer>().await?, after_first);
        assert_eq!(after_first, vec![keep]);

        // deleting from a table that was never written is a no-op too
        assert_eq!(store.delete::<Product>("Product", "nothing").await?, 0);
        assert!(fs::metadata(store.path_for::<Product>()).await.is_err());
        cleanup(&root).await;
        Ok(())
    }

    #[tokio::test]
    async fn malformed_collection_fails_loudly() -> Result<(), anyhow::Error> {
        let root = temp_root("table_malformed");
        let store = store_at(&root);
        fs::create_dir_all(root.join("tables")).await?;
        fs::write(store.path_for::<Customer>(), b"{ not json").await?;

        assert!(matches!(store.list::<Customer>().await, Err(ServiceError::Malformed { table: "Customer", .. })));
        assert!(matches!(
            store.add(Customer::new("A", "B", "c")).await,
            Err(ServiceError::Malformed { .. })
        ));
        // the corrupt file is left untouched
        assert_eq!(fs::read(store.path_for::<Customer>()).await?, b"{ not json");
        cleanup(&root).await;
        Ok(())
    }

    #[tokio::test]
    async fn file_is_pretty_printed_json_array() -> Result<(), anyhow::Error> {
        let root = temp_root("table_pretty");
        let store = store_at(&root);
        store.add(Customer::new("Ada", "Lovelace", "ada")).await?;
        let text = fs::read_to_string(store.path_for::<Customer>()).await?;
        assert!(text.starts_with("[\n"));
        let value: serde_json::Value = serde_json::from_str(&text)?;
        assert_eq!(value[0]["Name"], "Ada");
        assert_eq!(value[0]["PartitionKey"], "Customer");
        cleanup(&root).await;
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_adds_are_not_lost() -> Result<(), anyhow::Error> {
        let root = temp_root("table_concurrent");
        let store = store_at(&root);
        let n = 32;

        let mut handles = Vec::new();
        for i in 0..n {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let mut c = Customer::new("C", "C", &format!("user{i}"));
                c.keys = EntityKeys::new("Customer", format!("row-{i}"));
                store.add(c).await
            }));
        }
        for h in handles {
            h.await??;
        }

        let all = store.list::<Customer>().await?;
        assert_eq!(all.len(), n);
        for i in 0..n {
            assert!(all.iter().any(|c| c.keys.row_key == format!("row-{i}")));
        }
        cleanup(&root).await;
        Ok(())
    }
}
