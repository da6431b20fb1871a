use std::collections::HashMap;

use pulse_types::{Notification, NotificationKind};

/// Inbox view of a notification stream: pending friend requests split
/// out from general activity.
#[derive(Debug, Default)]
pub struct Inbox {
    /// At most one request per sender — the newest. The store may
    /// still hold older duplicates from before write-time dedup
    /// applied, so the display layer dedups a second time.
    pub friend_requests: Vec<Notification>,
    /// Everything that is not a friend request, in the given order.
    pub activity: Vec<Notification>,
}

/// Partitions a newest-first notification list for display. Pure.
pub fn partition(notifications: Vec<Notification>) -> Inbox {
    let mut newest_request: HashMap<String, Notification> = HashMap::new();
    let mut activity = Vec::new();

    for notif in notifications {
        if notif.kind == NotificationKind::FriendRequest {
            match newest_request.get(&notif.from_user_id) {
                Some(kept) if kept.timestamp >= notif.timestamp => {}
                _ => {
                    newest_request.insert(notif.from_user_id.clone(), notif);
                }
            }
        } else {
            activity.push(notif);
        }
    }

    let mut friend_requests: Vec<Notification> = newest_request.into_values().collect();
    friend_requests.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    Inbox { friend_requests, activity }
}
