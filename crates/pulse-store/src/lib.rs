pub mod memory;
pub mod paths;
pub mod subscription;

use std::collections::BTreeMap;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

pub use memory::MemoryStore;
pub use subscription::Subscription;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("corrupt value at {path}: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// The authoritative key-path store. Single-key operations are atomic;
/// there is no cross-key atomicity, so callers must tolerate transient
/// asymmetry between two related keys.
///
/// Paths are `/`-separated segment strings (see [`paths`]). Writes to a
/// path are observed by every subscriber whose path is an ancestor or
/// descendant of the written path.
pub trait RealtimeStore: Clone + Send + Sync + 'static {
    fn get(&self, path: &str) -> impl Future<Output = Result<Option<Value>, StoreError>> + Send;

    /// Full overwrite of the value at `path`.
    fn set(&self, path: &str, value: Value) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Shallow merge of `fields` into the object at `path`, creating it
    /// if absent.
    fn update(
        &self,
        path: &str,
        fields: BTreeMap<String, Value>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn remove(&self, path: &str) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Appends `value` under a generated time-ordered child key and
    /// returns the key. Keys sort by creation time, so map iteration
    /// order doubles as arrival order.
    fn push(&self, path: &str, value: Value)
    -> impl Future<Output = Result<String, StoreError>> + Send;

    /// Atomic membership insert on the array-as-set at `path`. Returns
    /// true when the member was absent and has been added. This is the
    /// primitive follow edges and likes go through instead of
    /// read-modify-write of the whole record, which loses concurrent
    /// updates under last-write-wins.
    fn set_add(
        &self,
        path: &str,
        member: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Atomic membership removal; true when the member was present.
    fn set_remove(
        &self,
        path: &str,
        member: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Atomic counter bump, saturating at zero. Returns the new value.
    fn increment(
        &self,
        path: &str,
        delta: i64,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;

    /// Snapshot stream for `path`: the current value first, then one
    /// snapshot per committed change. Ends when the subscription is
    /// dropped.
    fn subscribe(&self, path: &str) -> impl Future<Output = Subscription> + Send;

    fn get_record<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> impl Future<Output = Result<Option<T>, StoreError>> + Send {
        async move {
            match self.get(path).await? {
                None => Ok(None),
                Some(value) => serde_json::from_value(value)
                    .map(Some)
                    .map_err(|source| StoreError::Corrupt { path: path.to_string(), source }),
            }
        }
    }

    fn set_record<T: Serialize + Sync>(
        &self,
        path: &str,
        record: &T,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        async move {
            let value = serde_json::to_value(record)
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
            self.set(path, value).await
        }
    }
}

/// Failure taxonomy for primary-effect mutations (follow, like, post,
/// send). Side-effect emissions never surface here — they are logged
/// and dropped at the point of failure.
#[derive(Debug, thiserror::Error)]
pub enum PulseError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PulseError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { entity, id: id.into() }
    }
}

/// Collision-resistant, time-ordered record id (UUIDv7). Replaces the
/// weak client-generated random ids the store layer used to hand out.
pub fn fresh_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

/// Decodes a keyed-collection snapshot (`{childKey: record}`) into its
/// records, in child-key order. Entries that fail to decode are dropped
/// with a warning rather than poisoning the whole collection.
pub fn decode_collection<T: DeserializeOwned>(snapshot: Option<Value>) -> Vec<T> {
    let Some(Value::Object(map)) = snapshot else {
        return Vec::new();
    };
    map.into_iter()
        .filter_map(|(key, value)| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("dropping corrupt collection entry {key}: {e}");
                None
            }
        })
        .collect()
}
