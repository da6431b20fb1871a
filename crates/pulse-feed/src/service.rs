use chrono::Utc;
use pulse_social::NotificationEngine;
use pulse_store::{PulseError, RealtimeStore, decode_collection, fresh_id, paths};
use pulse_types::{Comment, NotificationKind, User, UserId, Video, VideoId};

/// Video publishing, likes, comments, shares and drafts over the
/// store. Like-set mutations go through the store's atomic membership
/// primitives, so two viewers liking the same video concurrently both
/// land; rewriting the full record would lose one of them under the
/// store's last-write-wins conflict rule.
#[derive(Clone)]
pub struct FeedService<S: RealtimeStore> {
    store: S,
    notifier: NotificationEngine<S>,
}

impl<S: RealtimeStore> FeedService<S> {
    pub fn new(store: S, notifier: NotificationEngine<S>) -> Self {
        Self { store, notifier }
    }

    pub async fn get_video(&self, video_id: &VideoId) -> Result<Option<Video>, PulseError> {
        Ok(self.store.get_record(&paths::video(video_id)).await?)
    }

    /// Writes the video as published. A draft copy under the owner, if
    /// any, is removed once the published record is in place.
    pub async fn publish(&self, video: &Video) -> Result<Video, PulseError> {
        let mut published = video.clone();
        published.is_draft = false;
        self.store.set_record(&paths::video(&published.id), &published).await?;
        self.store.remove(&paths::draft(&published.user_id, &published.id)).await?;
        Ok(published)
    }

    /// Flips the viewer's membership in the video's like set. On the
    /// absent-to-present transition a best-effort `Like` notification
    /// goes to the owner (never for self-likes), and the owner's
    /// received-likes counter follows the set atomically.
    pub async fn toggle_like(&self, viewer: &User, video_id: &VideoId) -> Result<Video, PulseError> {
        let video: Video = self
            .store
            .get_record(&paths::video(video_id))
            .await?
            .ok_or_else(|| PulseError::not_found("video", video_id))?;

        if video.likes.contains(&viewer.id) {
            let removed = self.store.set_remove(&paths::video_likes(video_id), &viewer.id).await?;
            if removed {
                self.store.increment(&paths::user_likes_received(&video.user_id), -1).await?;
            }
        } else {
            let added = self.store.set_add(&paths::video_likes(video_id), &viewer.id).await?;
            if added {
                self.store.increment(&paths::user_likes_received(&video.user_id), 1).await?;
                if video.user_id != viewer.id {
                    self.notifier.notify(viewer, &video.user_id, NotificationKind::Like).await;
                }
            }
        }

        self.store
            .get_record(&paths::video(video_id))
            .await?
            .ok_or_else(|| PulseError::not_found("video", video_id))
    }

    /// Prepends a comment (comments are kept newest-first). Moderation
    /// is the caller's precondition — text reaching this point is
    /// persisted as-is. The owner gets a best-effort `Comment`
    /// notification unless they commented themselves.
    pub async fn add_comment(
        &self,
        viewer: &User,
        video_id: &VideoId,
        text: &str,
    ) -> Result<Video, PulseError> {
        let video: Video = self
            .store
            .get_record(&paths::video(video_id))
            .await?
            .ok_or_else(|| PulseError::not_found("video", video_id))?;

        let comment = Comment {
            id: fresh_id(),
            user_id: viewer.id.clone(),
            username: viewer.username.clone(),
            text: text.to_string(),
            timestamp: Utc::now(),
        };
        let mut comments = Vec::with_capacity(video.comments.len() + 1);
        comments.push(comment);
        comments.extend(video.comments.iter().cloned());

        let comments_value = serde_json::to_value(&comments)
            .map_err(|e| pulse_store::StoreError::Unavailable(e.to_string()))?;
        self.store
            .update(&paths::video(video_id), [("comments".to_string(), comments_value)].into())
            .await?;

        if video.user_id != viewer.id {
            self.notifier.notify(viewer, &video.user_id, NotificationKind::Comment).await;
        }

        self.store
            .get_record(&paths::video(video_id))
            .await?
            .ok_or_else(|| PulseError::not_found("video", video_id))
    }

    /// Bumps the share counter; the video record is the source of
    /// truth, so a missing record is an error rather than a silent
    /// counter on nothing.
    pub async fn record_share(&self, video_id: &VideoId) -> Result<u64, PulseError> {
        if self.store.get(&paths::video(video_id)).await?.is_none() {
            return Err(PulseError::not_found("video", video_id));
        }
        Ok(self.store.increment(&paths::video_shares(video_id), 1).await?)
    }

    /// Saves under the owner's draft space, forcing the draft flag so
    /// it can never leak into a feed listing.
    pub async fn save_draft(&self, video: &Video) -> Result<(), PulseError> {
        let mut draft = video.clone();
        draft.is_draft = true;
        self.store.set_record(&paths::draft(&draft.user_id, &draft.id), &draft).await?;
        Ok(())
    }

    /// Owner-only draft listing, newest first.
    pub async fn drafts(&self, user_id: &UserId) -> Result<Vec<Video>, PulseError> {
        let mut drafts: Vec<Video> =
            decode_collection(self.store.get(&paths::drafts(user_id)).await?);
        drafts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(drafts)
    }

    pub async fn delete_draft(&self, user_id: &UserId, video_id: &VideoId) -> Result<(), PulseError> {
        self.store.remove(&paths::draft(user_id, video_id)).await?;
        Ok(())
    }

    /// Live stream of all published videos, newest first. Scope and
    /// profile filtering happen on top via [`crate::visible_videos`]
    /// and [`crate::profile_videos`].
    pub async fn subscribe(&self) -> PublishedFeed {
        PublishedFeed { sub: self.store.subscribe(paths::VIDEOS).await.collection() }
    }
}

pub struct PublishedFeed {
    sub: pulse_store::subscription::CollectionSubscription<Video>,
}

impl PublishedFeed {
    pub async fn next(&mut self) -> Option<Vec<Video>> {
        let mut videos: Vec<Video> =
            self.sub.next().await?.into_iter().filter(|v| !v.is_draft).collect();
        videos.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Some(videos)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use pulse_store::MemoryStore;
    use pulse_types::Privacy;

    use super::*;

    fn user(id: &str) -> User {
        User {
            id: id.into(),
            username: id.to_uppercase(),
            email: String::new(),
            avatar: String::new(),
            bio: None,
            followers: BTreeSet::new(),
            following: BTreeSet::new(),
            likes_received: 0,
        }
    }

    fn video(id: &str, owner: &User) -> Video {
        Video {
            id: id.into(),
            user_id: owner.id.clone(),
            username: owner.username.clone(),
            user_avatar: String::new(),
            url: format!("https://cdn.example/{id}.mp4"),
            caption: "first clip".into(),
            likes: BTreeSet::new(),
            comments: Vec::new(),
            shares: 0,
            timestamp: Utc::now(),
            privacy: Privacy::Everyone,
            is_draft: false,
            music_title: None,
        }
    }

    fn service() -> FeedService<MemoryStore> {
        let store = MemoryStore::new();
        FeedService::new(store.clone(), NotificationEngine::new(store))
    }

    async fn notifications_for(feed: &FeedService<MemoryStore>, user: &str) -> usize {
        feed.notifier
            .subscribe(&user.to_string())
            .await
            .next()
            .await
            .map(|n| n.len())
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn like_toggles_membership_and_notifies_owner_once() {
        let feed = service();
        let ana = user("ana");
        let bo = user("bo");
        feed.publish(&video("v1", &ana)).await.unwrap();

        let liked = feed.toggle_like(&bo, &"v1".to_string()).await.unwrap();
        assert!(liked.likes.contains(&bo.id));
        assert_eq!(notifications_for(&feed, "ana").await, 1);

        let unliked = feed.toggle_like(&bo, &"v1".to_string()).await.unwrap();
        assert!(unliked.likes.is_empty());
        // Unlike emits nothing.
        assert_eq!(notifications_for(&feed, "ana").await, 1);
    }

    #[tokio::test]
    async fn self_like_does_not_notify() {
        let feed = service();
        let ana = user("ana");
        feed.publish(&video("v1", &ana)).await.unwrap();

        feed.toggle_like(&ana, &"v1".to_string()).await.unwrap();
        assert_eq!(notifications_for(&feed, "ana").await, 0);
    }

    #[tokio::test]
    async fn liking_a_missing_video_is_not_found() {
        let feed = service();
        let err = feed.toggle_like(&user("ana"), &"ghost".to_string()).await.unwrap_err();
        assert!(matches!(err, PulseError::NotFound { .. }));
    }

    #[tokio::test]
    async fn likes_from_two_viewers_both_land() {
        let feed = service();
        let ana = user("ana");
        feed.publish(&video("v1", &ana)).await.unwrap();

        feed.toggle_like(&user("bo"), &"v1".to_string()).await.unwrap();
        let after = feed.toggle_like(&user("cam"), &"v1".to_string()).await.unwrap();
        assert_eq!(after.likes.len(), 2);
    }

    #[tokio::test]
    async fn comments_prepend_newest_first() {
        let feed = service();
        let ana = user("ana");
        let bo = user("bo");
        feed.publish(&video("v1", &ana)).await.unwrap();

        feed.add_comment(&bo, &"v1".to_string(), "nice").await.unwrap();
        let after = feed.add_comment(&ana, &"v1".to_string(), "thanks").await.unwrap();

        assert_eq!(after.comments.len(), 2);
        assert_eq!(after.comments[0].text, "thanks");
        assert_eq!(after.comments[1].text, "nice");
        // Only bo's comment notified the owner.
        assert_eq!(notifications_for(&feed, "ana").await, 1);
    }

    #[tokio::test]
    async fn share_counter_increments() {
        let feed = service();
        let ana = user("ana");
        feed.publish(&video("v1", &ana)).await.unwrap();

        assert_eq!(feed.record_share(&"v1".to_string()).await.unwrap(), 1);
        assert_eq!(feed.record_share(&"v1".to_string()).await.unwrap(), 2);
        assert!(feed.record_share(&"ghost".to_string()).await.is_err());
    }

    #[tokio::test]
    async fn drafts_are_listed_per_owner_and_deletable() {
        let feed = service();
        let ana = user("ana");
        let mut draft = video("v1", &ana);
        draft.is_draft = true;

        feed.save_draft(&draft).await.unwrap();
        let listed = feed.drafts(&ana.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].is_draft);

        feed.delete_draft(&ana.id, &"v1".to_string()).await.unwrap();
        assert!(feed.drafts(&ana.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn publishing_a_draft_removes_the_draft_copy() {
        let feed = service();
        let ana = user("ana");
        let mut draft = video("v1", &ana);
        draft.is_draft = true;
        feed.save_draft(&draft).await.unwrap();

        let published = feed.publish(&draft).await.unwrap();
        assert!(!published.is_draft);
        assert!(feed.drafts(&ana.id).await.unwrap().is_empty());
        assert!(feed.get_video(&"v1".to_string()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn published_feed_is_live_and_newest_first() {
        let feed = service();
        let ana = user("ana");
        feed.publish(&video("v1", &ana)).await.unwrap();

        let mut live = feed.subscribe().await;
        assert_eq!(live.next().await.unwrap().len(), 1);

        let mut second = video("v2", &ana);
        second.timestamp = Utc::now();
        feed.publish(&second).await.unwrap();
        let videos = live.next().await.unwrap();
        assert_eq!(videos.len(), 2);
        assert!(videos[0].timestamp >= videos[1].timestamp);
    }

    #[tokio::test]
    async fn like_updates_owner_received_count() {
        let store = MemoryStore::new();
        let feed = FeedService::new(store.clone(), NotificationEngine::new(store.clone()));
        let ana = user("ana");
        let bo = user("bo");
        store.set_record(&paths::user(&ana.id), &ana).await.unwrap();
        feed.publish(&video("v1", &ana)).await.unwrap();

        feed.toggle_like(&bo, &"v1".to_string()).await.unwrap();
        let owner: User = store.get_record(&paths::user(&ana.id)).await.unwrap().unwrap();
        assert_eq!(owner.likes_received, 1);

        feed.toggle_like(&bo, &"v1".to_string()).await.unwrap();
        let owner: User = store.get_record(&paths::user(&ana.id)).await.unwrap().unwrap();
        assert_eq!(owner.likes_received, 0);
    }
}
