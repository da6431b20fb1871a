//! Pure visibility filtering. Everything here is computed from the
//! records the caller already holds — transient follow-graph asymmetry
//! self-heals on the next read.

use pulse_types::{Privacy, User, UserId, Video};

/// Which feed surface is being rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedScope {
    /// Own videos plus everything public.
    Home,
    /// Videos from mutual follows only.
    Friends,
    /// No scope filter; profile tabs narrow further.
    All,
}

/// Profile-page tab on a specific target user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileTab {
    /// The target's non-private videos.
    Public,
    /// Videos the target has liked.
    Liked,
    /// The target's private videos — owner only.
    Private,
}

/// Filters `videos` down to what `viewer` may see in `scope`, newest
/// first. Drafts never appear here regardless of scope.
pub fn visible_videos(viewer: &User, videos: Vec<Video>, scope: FeedScope) -> Vec<Video> {
    let mut visible: Vec<Video> = videos
        .into_iter()
        .filter(|v| !v.is_draft)
        .filter(|v| match scope {
            FeedScope::Home => v.user_id == viewer.id || v.privacy == Privacy::Everyone,
            FeedScope::Friends => viewer.is_friend_of(&v.user_id),
            FeedScope::All => true,
        })
        .collect();
    visible.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    visible
}

/// Tab listing for `target_id`'s profile as seen by `viewer`, newest
/// first. The private tab is empty for everyone but the owner.
pub fn profile_videos(
    viewer: &User,
    target_id: &UserId,
    videos: Vec<Video>,
    tab: ProfileTab,
) -> Vec<Video> {
    let mut listed: Vec<Video> = videos
        .into_iter()
        .filter(|v| !v.is_draft)
        .filter(|v| match tab {
            ProfileTab::Public => v.user_id == *target_id && v.privacy != Privacy::Private,
            ProfileTab::Liked => v.likes.contains(target_id),
            ProfileTab::Private => {
                viewer.id == *target_id && v.user_id == *target_id && v.privacy == Privacy::Private
            }
        })
        .collect();
    listed.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    listed
}
