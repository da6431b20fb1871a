pub mod graph;
pub mod inbox;
pub mod notify;

pub use graph::SocialGraph;
pub use inbox::{Inbox, partition};
pub use notify::{NotificationEngine, NotificationFeed};
