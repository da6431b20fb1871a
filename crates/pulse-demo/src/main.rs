use std::collections::BTreeSet;

use chrono::Utc;
use tracing::info;

use pulse_chat::ChatService;
use pulse_feed::{FeedScope, FeedService, visible_videos};
use pulse_gateway::{AuthProvider, GeminiGateway, ModerationGateway, PermissiveGateway, StaticAuth};
use pulse_social::{NotificationEngine, SocialGraph, partition};
use pulse_store::MemoryStore;
use pulse_types::{Privacy, User, Video};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pulse=info".into()),
        )
        .init();

    // A Gemini key makes the gateway real; without one every call
    // resolves to the safe defaults anyway, so the permissive double
    // keeps the demo offline.
    match std::env::var("PULSE_GEMINI_API_KEY") {
        Ok(key) if !key.is_empty() => {
            let gateway = match std::env::var("PULSE_GEMINI_MODEL") {
                Ok(model) => GeminiGateway::new(key).with_model(model),
                Err(_) => GeminiGateway::new(key),
            };
            run(&gateway).await
        }
        _ => run(&PermissiveGateway).await,
    }
}

fn user(id: &str, username: &str) -> User {
    User {
        id: id.into(),
        username: username.into(),
        email: format!("{id}@pulse.example"),
        avatar: String::new(),
        bio: None,
        followers: BTreeSet::new(),
        following: BTreeSet::new(),
        likes_received: 0,
    }
}

/// Walks the whole engine end to end against the in-memory store:
/// publish, like, follow, accept, comment, chat.
async fn run(gateway: &impl ModerationGateway) -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let notifier = NotificationEngine::new(store.clone());
    let graph = SocialGraph::new(store.clone(), notifier.clone());
    let feed = FeedService::new(store.clone(), notifier.clone());
    let chats = ChatService::new(store.clone(), notifier.clone());

    let ana = user("u1", "ana");
    let bo = user("u2", "bo");
    graph.save_user(&ana).await?;
    graph.save_user(&bo).await?;

    let caption = gateway.suggest_caption("first ride of the season").await;
    let video = Video {
        id: "v1".into(),
        user_id: ana.id.clone(),
        username: ana.username.clone(),
        user_avatar: String::new(),
        url: "https://cdn.pulse.example/v1.mp4".into(),
        caption,
        likes: BTreeSet::new(),
        comments: Vec::new(),
        shares: 0,
        timestamp: Utc::now(),
        privacy: Privacy::Everyone,
        is_draft: false,
        music_title: None,
    };
    let video = feed.publish(&video).await?;
    info!(id = %video.id, caption = %video.caption, "ana published a video");

    let liked = feed.toggle_like(&bo, &video.id).await?;
    info!(likes = liked.likes.len(), "bo liked it");

    let comment_text = "that drop was unreal";
    if gateway.classify_comment(comment_text).await {
        feed.add_comment(&bo, &video.id, comment_text).await?;
        info!("bo commented");
    }

    // One-sided follow: a friend request lands in ana's inbox.
    graph.toggle_follow(&bo.id, &ana.id).await?;
    let mut ana_inbox = notifier.subscribe(&ana.id).await;
    let inbox = partition(ana_inbox.next().await.unwrap_or_default());
    info!(
        requests = inbox.friend_requests.len(),
        activity = inbox.activity.len(),
        "ana's inbox"
    );

    if let Some(request) = inbox.friend_requests.first() {
        graph.accept_friend_request(request).await?;
        let ana_now = graph.get_user(&ana.id).await?.unwrap_or(ana.clone());
        info!(mutuals = ?ana_now.mutuals(), "ana accepted the request");
    }

    let chat = chats.open(&ana.id, &bo.id).await?;
    chats.send(&chat.id, &ana, "thanks for the follow!").await?;
    chats.send(&chat.id, &bo, "post more like that one").await?;
    let mut messages = chats.subscribe(&chat.id).await;
    if let Some(thread) = messages.next().await {
        for message in &thread {
            info!(from = %message.sender_id, "{}", message.text);
        }
    }

    // Viewer identity comes from the auth boundary, not from ambient state.
    let auth = StaticAuth::new(None);
    auth.sign_in(ana.id.clone());
    if let Some(viewer_id) = auth.current_identity() {
        if let Some(viewer) = graph.get_user(&viewer_id).await? {
            let mut live = feed.subscribe().await;
            let home =
                visible_videos(&viewer, live.next().await.unwrap_or_default(), FeedScope::Home);
            info!(viewer = %viewer.id, videos = home.len(), "home feed");
        }
    }
    auth.sign_out();

    Ok(())
}
