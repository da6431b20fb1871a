pub mod auth;
pub mod moderation;

pub use auth::{AuthProvider, StaticAuth};
pub use moderation::{GeminiGateway, ModerationGateway, PermissiveGateway};
