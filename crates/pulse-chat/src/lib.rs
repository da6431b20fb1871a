use chrono::Utc;
use pulse_social::NotificationEngine;
use pulse_store::{PulseError, RealtimeStore, fresh_id, paths};
use pulse_types::{Chat, ChatId, Message, NotificationKind, User, UserId};
use tracing::debug;

/// Two-party conversations: canonical chat identity, message delivery
/// and ordering.
#[derive(Clone)]
pub struct ChatService<S: RealtimeStore> {
    store: S,
    notifier: NotificationEngine<S>,
}

/// Deterministic, order-independent id for a two-party conversation:
/// both ids sorted lexicographically, joined with `_`. Either
/// participant derives the same id from the pair.
pub fn canonical_chat_id(user_a: &UserId, user_b: &UserId) -> ChatId {
    let (first, second) = if user_a <= user_b { (user_a, user_b) } else { (user_b, user_a) };
    format!("{first}_{second}")
}

impl<S: RealtimeStore> ChatService<S> {
    pub fn new(store: S, notifier: NotificationEngine<S>) -> Self {
        Self { store, notifier }
    }

    /// The conversation between two users, created on first access.
    pub async fn open(&self, user_a: &UserId, user_b: &UserId) -> Result<Chat, PulseError> {
        if user_a == user_b {
            return Err(PulseError::InvalidArgument("chat requires two distinct users".into()));
        }
        let chat_id = canonical_chat_id(user_a, user_b);
        if let Some(existing) = self.store.get_record(&paths::chat(&chat_id)).await? {
            return Ok(existing);
        }
        let chat = Chat {
            id: chat_id,
            participants: [user_a.clone(), user_b.clone()],
        };
        self.store.set_record(&paths::chat(&chat.id), &chat).await?;
        Ok(chat)
    }

    /// Appends a message to the conversation. Empty or whitespace-only
    /// text is a no-op — nothing is written and `None` comes back. The
    /// other participant gets a best-effort `Message` notification.
    pub async fn send(
        &self,
        chat_id: &ChatId,
        sender: &User,
        text: &str,
    ) -> Result<Option<Message>, PulseError> {
        if text.trim().is_empty() {
            debug!(chat = %chat_id, "ignoring empty message");
            return Ok(None);
        }
        let chat: Chat = self
            .store
            .get_record(&paths::chat(chat_id))
            .await?
            .ok_or_else(|| PulseError::not_found("chat", chat_id))?;

        let message = Message {
            id: fresh_id(),
            sender_id: sender.id.clone(),
            text: text.to_string(),
            timestamp: Utc::now(),
        };
        self.store
            .set_record(
                &format!("{}/{}", paths::chat_messages(chat_id), message.id),
                &message,
            )
            .await?;

        if let Some(peer) = chat.peer_of(&sender.id) {
            self.notifier.notify(sender, peer, NotificationKind::Message).await;
        }
        Ok(Some(message))
    }

    /// Live message stream, timestamp ascending with arrival order
    /// breaking ties (message keys are time-ordered). Restartable;
    /// runs until dropped.
    pub async fn subscribe(&self, chat_id: &ChatId) -> MessageFeed {
        MessageFeed {
            sub: self.store.subscribe(&paths::chat_messages(chat_id)).await.collection(),
        }
    }
}

pub struct MessageFeed {
    sub: pulse_store::subscription::CollectionSubscription<Message>,
}

impl MessageFeed {
    pub async fn next(&mut self) -> Option<Vec<Message>> {
        let mut messages = self.sub.next().await?;
        // Stable sort: equal timestamps keep store insertion order.
        messages.sort_by_key(|m| m.timestamp);
        Some(messages)
    }
}
