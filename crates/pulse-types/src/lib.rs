pub mod models;

pub use models::{
    Chat, Comment, Message, Notification, NotificationKind, Privacy, User, Video,
};

/// Opaque user identity issued by the external auth provider.
pub type UserId = String;
pub type VideoId = String;
pub type ChatId = String;
pub type NotificationId = String;
