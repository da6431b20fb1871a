use std::collections::BTreeSet;

use pulse_store::{PulseError, RealtimeStore, paths};
use pulse_types::{Notification, NotificationKind, User, UserId};
use tracing::debug;

use crate::notify::NotificationEngine;

/// Owns follow-edge consistency across `users/{id}` records and the
/// derived friend (mutual-follow) relation.
///
/// A follow touches two records through two independent single-key
/// writes; the store gives no cross-key atomicity, so a reader can
/// transiently observe one side only. All derived facts are computed
/// on read, so the asymmetry self-heals once both writes land — no
/// compensating transaction is run.
#[derive(Clone)]
pub struct SocialGraph<S: RealtimeStore> {
    store: S,
    notifier: NotificationEngine<S>,
}

impl<S: RealtimeStore> SocialGraph<S> {
    pub fn new(store: S, notifier: NotificationEngine<S>) -> Self {
        Self { store, notifier }
    }

    /// Normalizing full-record write used at signup and profile edit:
    /// strips any self-follow entry before persisting.
    pub async fn save_user(&self, user: &User) -> Result<(), PulseError> {
        let mut safe = user.clone();
        safe.followers.remove(&safe.id);
        safe.following.remove(&safe.id);
        self.store.set_record(&paths::user(&safe.id), &safe).await?;
        Ok(())
    }

    pub async fn get_user(&self, user_id: &UserId) -> Result<Option<User>, PulseError> {
        Ok(self.store.get_record(&paths::user(user_id)).await?)
    }

    /// Follows `target_id` if not currently followed, otherwise
    /// unfollows. Self-follow is a silent no-op. Returns the updated
    /// actor record so the caller can refresh its view.
    ///
    /// On a fresh follow the notification kind depends on the state of
    /// `actor.followers` *before* this mutation: if the target already
    /// followed the actor this follow completes a mutual pair and
    /// emits `Follow` ("became your friend"); otherwise it is a
    /// one-sided `FriendRequest` awaiting reciprocation. An unfollow
    /// emits nothing.
    pub async fn toggle_follow(
        &self,
        actor_id: &UserId,
        target_id: &UserId,
    ) -> Result<Option<User>, PulseError> {
        if actor_id == target_id {
            debug!(actor = %actor_id, "ignoring self-follow");
            return Ok(None);
        }

        let actor: User = self
            .store
            .get_record(&paths::user(actor_id))
            .await?
            .ok_or_else(|| PulseError::not_found("user", actor_id))?;
        let target: User = self
            .store
            .get_record(&paths::user(target_id))
            .await?
            .ok_or_else(|| PulseError::not_found("user", target_id))?;

        if actor.following.contains(target_id) {
            self.store.set_remove(&paths::user_following(actor_id), target_id).await?;
            self.store.set_remove(&paths::user_followers(target_id), actor_id).await?;
        } else {
            // Captured before the mutation: this decides follow-back
            // vs friend-request and must not be reordered after the
            // edge writes.
            let followed_back = actor.followers.contains(target_id);

            self.store.set_add(&paths::user_following(actor_id), target_id).await?;
            self.store.set_add(&paths::user_followers(target_id), actor_id).await?;

            let kind = if followed_back {
                NotificationKind::Follow
            } else {
                NotificationKind::FriendRequest
            };
            self.notifier.notify(&actor, &target.id, kind).await;
        }

        let updated = self
            .store
            .get_record(&paths::user(actor_id))
            .await?
            .ok_or_else(|| PulseError::not_found("user", actor_id))?;
        Ok(Some(updated))
    }

    /// Mutual follows of `user`. Pure — derived from the record the
    /// caller already holds, never stored.
    pub fn compute_mutuals(user: &User) -> BTreeSet<UserId> {
        user.mutuals()
    }

    /// The recipient follows the requester back, then the request
    /// notification is deleted from the recipient's stream.
    pub async fn accept_friend_request(&self, notif: &Notification) -> Result<(), PulseError> {
        self.toggle_follow(&notif.to_user_id, &notif.from_user_id).await?;
        self.notifier.remove(&notif.to_user_id, &notif.id).await?;
        Ok(())
    }

    /// Deletes the request notification without touching the graph.
    pub async fn reject_friend_request(&self, notif: &Notification) -> Result<(), PulseError> {
        self.notifier.remove(&notif.to_user_id, &notif.id).await?;
        Ok(())
    }
}
