use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ChatId, NotificationId, UserId, VideoId};

/// Who may see a posted video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    Everyone,
    Friends,
    Private,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    /// Users who follow this user. Stored as a set — never duplicated,
    /// never contains `id` itself.
    #[serde(default)]
    pub followers: BTreeSet<UserId>,
    /// Users this user follows. Same invariants as `followers`.
    #[serde(default)]
    pub following: BTreeSet<UserId>,
    #[serde(default)]
    pub likes_received: u64,
}

impl User {
    /// Mutual follows ("friends"): both directions present. Derived on
    /// every read, never stored.
    pub fn mutuals(&self) -> BTreeSet<UserId> {
        self.following.intersection(&self.followers).cloned().collect()
    }

    pub fn is_friend_of(&self, other: &UserId) -> bool {
        self.following.contains(other) && self.followers.contains(other)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub user_id: UserId,
    /// Author name snapshotted at comment time.
    pub username: String,
    pub text: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub id: VideoId,
    pub user_id: UserId,
    /// Owner name/avatar snapshotted at post time.
    pub username: String,
    #[serde(default)]
    pub user_avatar: String,
    pub url: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub likes: BTreeSet<UserId>,
    /// Newest-first by insertion.
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub shares: u64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub privacy: Privacy,
    #[serde(default)]
    pub is_draft: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub music_title: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Like,
    Follow,
    Comment,
    Message,
    FriendRequest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub from_user_id: UserId,
    /// Sender name snapshotted at creation — not re-synced on rename.
    pub from_username: String,
    pub to_user_id: UserId,
    pub kind: NotificationKind,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender_id: UserId,
    pub text: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

/// A two-party conversation. The id is canonical: both participant ids
/// sorted lexicographically and joined, so either party derives the same
/// chat from the pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    pub participants: [UserId; 2],
}

impl Chat {
    /// The participant other than `user`, if `user` is in the chat.
    pub fn peer_of(&self, user: &UserId) -> Option<&UserId> {
        let [a, b] = &self.participants;
        if a == user {
            Some(b)
        } else if b == user {
            Some(a)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> User {
        User {
            id: id.into(),
            username: id.to_uppercase(),
            email: format!("{id}@example.com"),
            avatar: String::new(),
            bio: None,
            followers: BTreeSet::new(),
            following: BTreeSet::new(),
            likes_received: 0,
        }
    }

    #[test]
    fn mutuals_requires_both_directions() {
        let mut alice = user("alice");
        alice.following.insert("bob".into());

        assert!(alice.mutuals().is_empty());

        alice.followers.insert("bob".into());
        assert_eq!(alice.mutuals(), BTreeSet::from(["bob".to_string()]));
        assert!(alice.is_friend_of(&"bob".to_string()));
    }

    #[test]
    fn privacy_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Privacy::Everyone).unwrap(),
            "\"everyone\""
        );
        assert_eq!(
            serde_json::to_string(&NotificationKind::FriendRequest).unwrap(),
            "\"friend_request\""
        );
    }

    #[test]
    fn chat_peer_lookup() {
        let chat = Chat {
            id: "alice_bob".into(),
            participants: ["alice".into(), "bob".into()],
        };
        assert_eq!(chat.peer_of(&"alice".to_string()), Some(&"bob".to_string()));
        assert_eq!(chat.peer_of(&"carol".to_string()), None);
    }
}
