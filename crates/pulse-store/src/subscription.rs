use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

use crate::decode_collection;

/// A live snapshot stream for one store path. The first [`next`] call
/// yields the value as of subscribe time (`None` when the path is
/// absent); every committed change to the path or its descendants
/// yields a fresh full snapshot. Dropping the subscription
/// unsubscribes.
///
/// [`next`]: Subscription::next
pub struct Subscription {
    initial: Option<Option<Value>>,
    rx: broadcast::Receiver<Option<Value>>,
}

impl Subscription {
    pub(crate) fn new(initial: Option<Value>, rx: broadcast::Receiver<Option<Value>>) -> Self {
        Self { initial: Some(initial), rx }
    }

    /// Next snapshot, or `None` once the store side is gone. A slow
    /// consumer that falls behind skips straight to newer snapshots;
    /// since every delivery is the full current value, nothing is lost
    /// beyond intermediate states.
    pub async fn next(&mut self) -> Option<Option<Value>> {
        if let Some(initial) = self.initial.take() {
            return Some(initial);
        }
        loop {
            match self.rx.recv().await {
                Ok(snapshot) => return Some(snapshot),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("subscriber lagged, skipped {skipped} snapshots");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Typed view over a keyed collection at this path, decoding each
    /// snapshot into records in child-key (arrival) order.
    pub fn collection<T: DeserializeOwned>(self) -> CollectionSubscription<T> {
        CollectionSubscription { inner: self, _marker: std::marker::PhantomData }
    }
}

/// Typed change-topic over a keyed collection: each update delivers the
/// decoded records of the full current collection.
pub struct CollectionSubscription<T> {
    inner: Subscription,
    _marker: std::marker::PhantomData<T>,
}

impl<T: DeserializeOwned> CollectionSubscription<T> {
    pub async fn next(&mut self) -> Option<Vec<T>> {
        self.inner.next().await.map(decode_collection)
    }
}
