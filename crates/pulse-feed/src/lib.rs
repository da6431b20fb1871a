pub mod service;
pub mod visibility;

pub use service::{FeedService, PublishedFeed};
pub use visibility::{FeedScope, ProfileTab, profile_videos, visible_videos};
