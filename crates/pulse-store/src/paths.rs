//! Key-path layout of the store. Kept stable so the engine can be
//! pointed at an existing backend:
//!
//! ```text
//! users/{userId}                      -> User
//! videos/{videoId}                    -> Video
//! drafts/{userId}/{videoId}           -> Video (is_draft = true)
//! notifications/{userId}/{notifId}    -> Notification
//! chats/{chatId}                      -> Chat
//! chats/{chatId}/messages/{msgId}     -> Message
//! ```

pub const USERS: &str = "users";
pub const VIDEOS: &str = "videos";

pub fn user(user_id: &str) -> String {
    format!("users/{user_id}")
}

pub fn user_following(user_id: &str) -> String {
    format!("users/{user_id}/following")
}

pub fn user_followers(user_id: &str) -> String {
    format!("users/{user_id}/followers")
}

pub fn user_likes_received(user_id: &str) -> String {
    format!("users/{user_id}/likes_received")
}

pub fn video(video_id: &str) -> String {
    format!("videos/{video_id}")
}

pub fn video_likes(video_id: &str) -> String {
    format!("videos/{video_id}/likes")
}

pub fn video_shares(video_id: &str) -> String {
    format!("videos/{video_id}/shares")
}

pub fn drafts(user_id: &str) -> String {
    format!("drafts/{user_id}")
}

pub fn draft(user_id: &str, video_id: &str) -> String {
    format!("drafts/{user_id}/{video_id}")
}

pub fn notifications(user_id: &str) -> String {
    format!("notifications/{user_id}")
}

pub fn notification(user_id: &str, notif_id: &str) -> String {
    format!("notifications/{user_id}/{notif_id}")
}

pub fn chat(chat_id: &str) -> String {
    format!("chats/{chat_id}")
}

pub fn chat_messages(chat_id: &str) -> String {
    format!("chats/{chat_id}/messages")
}
