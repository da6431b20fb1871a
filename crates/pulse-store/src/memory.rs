use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};
use tokio::sync::{RwLock, broadcast};
use uuid::Uuid;
use uuid::timestamp::context::ContextV7;

use crate::subscription::Subscription;
use crate::{RealtimeStore, StoreError};

const TOPIC_CAPACITY: usize = 64;

/// In-memory [`RealtimeStore`]: one JSON tree behind a `tokio` RwLock,
/// one broadcast topic per subscribed path. Single-key operations are
/// atomic under the write lock; subscribers are notified while the
/// lock is still held, so per-path snapshot order matches commit
/// order. There is deliberately no cross-key atomicity — components
/// must cope with the same contract a hosted realtime backend gives.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    tree: RwLock<Value>,
    topics: Mutex<HashMap<String, broadcast::Sender<Option<Value>>>>,
    /// Monotonic UUIDv7 context so push keys generated in the same
    /// millisecond still sort by arrival. The context keeps interior
    /// counter state, so key generation serializes through this lock.
    push_ctx: Mutex<ContextV7>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                tree: RwLock::new(Value::Object(Map::new())),
                topics: Mutex::new(HashMap::new()),
                push_ctx: Mutex::new(ContextV7::new()),
            }),
        }
    }

    fn next_push_key(&self) -> String {
        let ctx = self.inner.push_ctx.lock().unwrap_or_else(|e| e.into_inner());
        Uuid::new_v7(uuid::Timestamp::now(&*ctx)).to_string()
    }

    /// Fan a committed change out to every topic that can observe it.
    /// Called with the write guard still held so snapshot order equals
    /// commit order.
    fn publish(&self, tree: &Value, changed_path: &str) {
        let mut topics = self.inner.topics.lock().unwrap_or_else(|e| e.into_inner());
        topics.retain(|_, tx| tx.receiver_count() > 0);
        for (topic_path, tx) in topics.iter() {
            if paths_related(topic_path, changed_path) {
                let _ = tx.send(lookup(tree, topic_path).cloned());
            }
        }
    }
}

impl RealtimeStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let tree = self.inner.tree.read().await;
        Ok(lookup(&tree, path).cloned())
    }

    async fn set(&self, path: &str, value: Value) -> Result<(), StoreError> {
        let mut tree = self.inner.tree.write().await;
        write_at(&mut tree, path, value);
        self.publish(&tree, path);
        Ok(())
    }

    async fn update(&self, path: &str, fields: BTreeMap<String, Value>) -> Result<(), StoreError> {
        let mut tree = self.inner.tree.write().await;
        let target = slot_mut(&mut tree, path);
        if !target.is_object() {
            *target = Value::Object(Map::new());
        }
        let map = target.as_object_mut().unwrap_or_else(|| unreachable!());
        for (field, value) in fields {
            map.insert(field, value);
        }
        self.publish(&tree, path);
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<(), StoreError> {
        let mut tree = self.inner.tree.write().await;
        if remove_at(&mut tree, path) {
            self.publish(&tree, path);
        }
        Ok(())
    }

    async fn push(&self, path: &str, value: Value) -> Result<String, StoreError> {
        let key = self.next_push_key();
        let child = format!("{path}/{key}");
        let mut tree = self.inner.tree.write().await;
        write_at(&mut tree, &child, value);
        self.publish(&tree, &child);
        Ok(key)
    }

    async fn set_add(&self, path: &str, member: &str) -> Result<bool, StoreError> {
        let mut tree = self.inner.tree.write().await;
        let slot = slot_mut(&mut tree, path);
        if !slot.is_array() {
            *slot = Value::Array(Vec::new());
        }
        let members = slot.as_array_mut().unwrap_or_else(|| unreachable!());
        if members.iter().any(|m| m.as_str() == Some(member)) {
            return Ok(false);
        }
        members.push(Value::String(member.to_string()));
        self.publish(&tree, path);
        Ok(true)
    }

    async fn set_remove(&self, path: &str, member: &str) -> Result<bool, StoreError> {
        let mut tree = self.inner.tree.write().await;
        let Some(slot) = lookup_mut(&mut tree, path) else {
            return Ok(false);
        };
        let Some(members) = slot.as_array_mut() else {
            return Ok(false);
        };
        let before = members.len();
        members.retain(|m| m.as_str() != Some(member));
        if members.len() == before {
            return Ok(false);
        }
        self.publish(&tree, path);
        Ok(true)
    }

    async fn increment(&self, path: &str, delta: i64) -> Result<u64, StoreError> {
        let mut tree = self.inner.tree.write().await;
        let slot = slot_mut(&mut tree, path);
        let current = slot.as_u64().or_else(|| slot.as_i64().map(|v| v.max(0) as u64)).unwrap_or(0);
        let next = if delta.is_negative() {
            current.saturating_sub(delta.unsigned_abs())
        } else {
            current.saturating_add(delta as u64)
        };
        *slot = Value::from(next);
        self.publish(&tree, path);
        Ok(next)
    }

    async fn subscribe(&self, path: &str) -> Subscription {
        // Hold the tree lock across topic registration so no commit
        // can slip between the initial snapshot and the stream.
        let tree = self.inner.tree.read().await;
        let initial = lookup(&tree, path).cloned();
        let mut topics = self.inner.topics.lock().unwrap_or_else(|e| e.into_inner());
        let tx = topics
            .entry(path.to_string())
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0);
        Subscription::new(initial, tx.subscribe())
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Two paths observe each other when one is an ancestor of the other,
/// compared segment-wise ("users/u1" is unrelated to "users/u10").
fn paths_related(a: &str, b: &str) -> bool {
    let mut a = segments(a);
    let mut b = segments(b);
    loop {
        match (a.next(), b.next()) {
            (Some(x), Some(y)) if x == y => continue,
            (Some(_), Some(_)) => return false,
            _ => return true,
        }
    }
}

fn lookup<'a>(tree: &'a Value, path: &str) -> Option<&'a Value> {
    let mut node = tree;
    for seg in segments(path) {
        node = node.as_object()?.get(seg)?;
    }
    Some(node)
}

fn lookup_mut<'a>(tree: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    let mut node = tree;
    for seg in segments(path) {
        node = node.as_object_mut()?.get_mut(seg)?;
    }
    Some(node)
}

/// Mutable slot at `path`, materializing intermediate objects. A
/// non-object on the way is replaced, matching overwrite semantics.
fn slot_mut<'a>(tree: &'a mut Value, path: &str) -> &'a mut Value {
    let mut node = tree;
    for seg in segments(path) {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        node = node
            .as_object_mut()
            .unwrap_or_else(|| unreachable!())
            .entry(seg.to_string())
            .or_insert(Value::Null);
    }
    node
}

fn write_at(tree: &mut Value, path: &str, value: Value) {
    *slot_mut(tree, path) = value;
}

fn remove_at(tree: &mut Value, path: &str) -> bool {
    let segs: Vec<&str> = segments(path).collect();
    let Some((last, parents)) = segs.split_last() else {
        return false;
    };
    let mut node = tree;
    for seg in parents {
        let Some(next) = node.as_object_mut().and_then(|m| m.get_mut(*seg)) else {
            return false;
        };
        node = next;
    }
    node.as_object_mut().is_some_and(|m| m.remove(*last).is_some())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn store_handle_is_shareable_across_tasks() {
        // RealtimeStore demands Send + Sync + 'static handles; this
        // fails to compile if any interior state (like the push-key
        // context) stops being shareable.
        fn assert_store<T: RealtimeStore>() {}
        assert_store::<MemoryStore>();
    }

    #[tokio::test]
    async fn push_keys_from_concurrent_tasks_are_unique() {
        let store = MemoryStore::new();
        let mut handles = Vec::new();
        for n in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.push("chats/c/messages", json!({ "n": n })).await
            }));
        }
        let mut keys = Vec::new();
        for handle in handles {
            keys.push(handle.await.unwrap().unwrap());
        }
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), 8);
    }

    #[tokio::test]
    async fn set_get_roundtrip() {
        let store = MemoryStore::new();
        store.set("users/u1", json!({"username": "ana"})).await.unwrap();
        let got = store.get("users/u1").await.unwrap();
        assert_eq!(got, Some(json!({"username": "ana"})));
        assert_eq!(store.get("users/u2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn update_merges_fields_without_clobbering() {
        let store = MemoryStore::new();
        store.set("users/u1", json!({"username": "ana", "bio": "hi"})).await.unwrap();
        store
            .update("users/u1", BTreeMap::from([("bio".to_string(), json!("new bio"))]))
            .await
            .unwrap();
        assert_eq!(
            store.get("users/u1").await.unwrap(),
            Some(json!({"username": "ana", "bio": "new bio"}))
        );
    }

    #[tokio::test]
    async fn push_keys_sort_by_arrival() {
        let store = MemoryStore::new();
        let k1 = store.push("chats/c/messages", json!({"n": 1})).await.unwrap();
        let k2 = store.push("chats/c/messages", json!({"n": 2})).await.unwrap();
        let k3 = store.push("chats/c/messages", json!({"n": 3})).await.unwrap();
        assert!(k1 < k2 && k2 < k3);
    }

    #[tokio::test]
    async fn set_add_is_idempotent_and_remove_reports_absence() {
        let store = MemoryStore::new();
        assert!(store.set_add("videos/v/likes", "u1").await.unwrap());
        assert!(!store.set_add("videos/v/likes", "u1").await.unwrap());
        assert!(store.set_remove("videos/v/likes", "u1").await.unwrap());
        assert!(!store.set_remove("videos/v/likes", "u1").await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_set_adds_both_land() {
        let store = MemoryStore::new();
        let a = {
            let store = store.clone();
            tokio::spawn(async move { store.set_add("videos/v/likes", "u1").await })
        };
        let b = {
            let store = store.clone();
            tokio::spawn(async move { store.set_add("videos/v/likes", "u2").await })
        };
        assert!(a.await.unwrap().unwrap());
        assert!(b.await.unwrap().unwrap());
        let likes = store.get("videos/v/likes").await.unwrap().unwrap();
        assert_eq!(likes.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn increment_saturates_at_zero() {
        let store = MemoryStore::new();
        assert_eq!(store.increment("videos/v/shares", 2).await.unwrap(), 2);
        assert_eq!(store.increment("videos/v/shares", -5).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn subscriber_sees_initial_then_descendant_writes() {
        let store = MemoryStore::new();
        store.set("videos/v1", json!({"caption": "first"})).await.unwrap();

        let mut sub = store.subscribe("videos").await;
        let initial = sub.next().await.unwrap().unwrap();
        assert!(initial.get("v1").is_some());

        store.set("videos/v2/caption", json!("second")).await.unwrap();
        let snapshot = sub.next().await.unwrap().unwrap();
        assert!(snapshot.get("v2").is_some());
    }

    #[tokio::test]
    async fn subscriber_at_absent_path_gets_none_first() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe("chats/none").await;
        assert_eq!(sub.next().await, Some(None));
    }

    #[tokio::test]
    async fn sibling_paths_do_not_cross_notify() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe("users/u1").await;
        assert_eq!(sub.next().await, Some(None));

        // Prefix as a string but not as a segment path.
        store.set("users/u10", json!({"username": "other"})).await.unwrap();
        store.set("users/u1", json!({"username": "mine"})).await.unwrap();
        let snapshot = sub.next().await.unwrap().unwrap();
        assert_eq!(snapshot["username"], "mine");
    }

    #[tokio::test]
    async fn remove_notifies_with_absent_snapshot() {
        let store = MemoryStore::new();
        store.set("notifications/u1/n1", json!({"read": false})).await.unwrap();
        let mut sub = store.subscribe("notifications/u1/n1").await;
        sub.next().await.unwrap();

        store.remove("notifications/u1/n1").await.unwrap();
        assert_eq!(sub.next().await, Some(None));
    }
}
