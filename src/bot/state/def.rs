use std::{collections::HashSet, sync::Arc};

use thiserror::Error;

use crate::bot::{db::UserId, handler::handler::ChatClient, membership::membership::MembershipLookup, referral::referral::LinkPolicy, state::session::SessionStore};

pub struct AppState {
    pub config: Arc<BotConfig>,
    /// `@username` of the bot itself, needed for deep links
    pub bot_username: String,
    pub chat_client: Arc<dyn ChatClient>,
    pub membership: Arc<dyn MembershipLookup>,
    pub sessions: SessionStore,
}

pub struct BotSecrets {
    pub telegram_token: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetChat {
    /// numeric chat id or `@channelname`
    pub chat_id: String,
    pub invite_url: String,
}

#[derive(Clone, Debug)]
pub struct BotConfig {
    pub admins: HashSet<UserId>,
    pub channel: TargetChat,
    pub group: TargetChat,
    pub social_link_1: String,
    pub social_link_2: String,
    pub database_path: String,
    pub link_policy: LinkPolicy,
}

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

#[derive(Debug, Error)]
pub enum BotError {
    #[error("Telegram request error: {0}")]
    Telegram(#[from] teloxide::RequestError),
    #[error("Database error: {0}")]
    SqlxError(#[from] sqlx::Error),
    #[error("Telegram request timed out: {0}")]
    Timeout(String),
    #[error("Configuration error: {0}")]
    Config(#[from] SecretError),
    #[error("{0}")]
    Custom(String),
}
