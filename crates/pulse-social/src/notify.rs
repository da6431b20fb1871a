use chrono::Utc;
use pulse_store::{RealtimeStore, StoreError, decode_collection, fresh_id, paths};
use pulse_types::{Notification, NotificationId, NotificationKind, User, UserId};
use tracing::{debug, warn};

/// Derives notification records from graph/content transitions and
/// fans them out through the recipient's `notifications/{userId}`
/// stream. Delivery is best-effort by contract: a like or follow must
/// succeed even when its notification write does not.
#[derive(Clone)]
pub struct NotificationEngine<S: RealtimeStore> {
    store: S,
}

impl<S: RealtimeStore> NotificationEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Stores a notification unless an unread one from the same sender
    /// and of the same kind is already pending — repeat "X liked your
    /// video" events are suppressed until the first is read. Store
    /// failures are swallowed and logged; callers never see them.
    pub async fn notify(
        &self,
        from: &User,
        to: &UserId,
        kind: NotificationKind,
    ) -> Option<Notification> {
        match self.try_notify(from, to, kind).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(to = %to, ?kind, "notification dropped: {e}");
                None
            }
        }
    }

    async fn try_notify(
        &self,
        from: &User,
        to: &UserId,
        kind: NotificationKind,
    ) -> Result<Option<Notification>, StoreError> {
        let existing: Vec<Notification> =
            decode_collection(self.store.get(&paths::notifications(to)).await?);
        let pending_unread = existing
            .iter()
            .any(|n| !n.read && n.from_user_id == from.id && n.kind == kind);
        if pending_unread {
            debug!(to = %to, ?kind, from = %from.id, "suppressed duplicate notification");
            return Ok(None);
        }

        let notif = Notification {
            id: fresh_id(),
            from_user_id: from.id.clone(),
            from_username: from.username.clone(),
            to_user_id: to.clone(),
            kind,
            timestamp: Utc::now(),
            read: false,
        };
        self.store
            .set_record(&paths::notification(to, &notif.id), &notif)
            .await?;
        Ok(Some(notif))
    }

    /// Marks one notification as read, re-arming dedup for its
    /// `(sender, kind)` pair.
    pub async fn mark_read(
        &self,
        user_id: &UserId,
        notif_id: &NotificationId,
    ) -> Result<(), StoreError> {
        let path = paths::notification(user_id, notif_id);
        self.store
            .update(&path, [("read".to_string(), serde_json::Value::Bool(true))].into())
            .await
    }

    /// Deletes one notification from the recipient's stream.
    pub async fn remove(
        &self,
        user_id: &UserId,
        notif_id: &NotificationId,
    ) -> Result<(), StoreError> {
        self.store.remove(&paths::notification(user_id, notif_id)).await
    }

    /// Live notification stream for one recipient, newest-first.
    /// Restart by resubscribing; ends when the feed is dropped.
    pub async fn subscribe(&self, user_id: &UserId) -> NotificationFeed {
        NotificationFeed {
            sub: self.store.subscribe(&paths::notifications(user_id)).await.collection(),
        }
    }
}

pub struct NotificationFeed {
    sub: pulse_store::subscription::CollectionSubscription<Notification>,
}

impl NotificationFeed {
    /// Next snapshot of the recipient's notifications, newest-first.
    pub async fn next(&mut self) -> Option<Vec<Notification>> {
        let mut notifs = self.sub.next().await?;
        notifs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Some(notifs)
    }
}
