use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// ETag value that matches any stored version (unconditional write).
pub const ETAG_ANY: &str = "*";

/// Identity and bookkeeping columns carried by every persisted record.
///
/// Flattened into each entity so the on-disk JSON reads like a cloud table row:
/// `PartitionKey`, `RowKey`, `Timestamp`, `ETag` next to the business fields.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EntityKeys {
    #[serde(default)]
    pub partition_key: String,
    #[serde(default)]
    pub row_key: String,
    /// Set by the store on every write; caller-supplied values are overwritten.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, rename = "ETag", skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

impl EntityKeys {
    pub fn new(partition_key: impl Into<String>, row_key: impl Into<String>) -> Self {
        Self { partition_key: partition_key.into(), row_key: row_key.into(), ..Self::default() }
    }

    pub fn matches(&self, partition_key: &str, row_key: &str) -> bool {
        self.partition_key == partition_key && self.row_key == row_key
    }

    /// True when the caller asked for a conditional write against a specific version.
    pub fn is_conditional(&self) -> bool {
        matches!(self.etag.as_deref(), Some(tag) if !tag.is_empty() && tag != ETAG_ANY)
    }
}

/// A record type persisted as its own collection by the table store.
///
/// `TABLE` is the schema tag: it names the backing collection file and is the
/// partition key the store assigns when a caller leaves it blank.
pub trait TableEntity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const TABLE: &'static str;

    fn keys(&self) -> &EntityKeys;
    fn keys_mut(&mut self) -> &mut EntityKeys;

    fn row_key(&self) -> &str { &self.keys().row_key }
}
