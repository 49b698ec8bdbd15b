use std::{collections::HashSet, str::FromStr, sync::Arc};

use tracing::warn;

use crate::bot::{db::UserId, handler::handler::ChatClient, membership::membership::MembershipLookup, referral::referral::LinkPolicy, state::{def::{AppState, BotConfig, BotSecrets, SecretError, TargetChat}, session::SessionStore}};

pub const DEFAULT_DATABASE_PATH: &str = "bot_data.db";

fn required<F>(lookup: &F, key: &'static str) -> Result<String, SecretError> where F: Fn(&str) -> Option<String> {
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or(SecretError::Missing(key))
}

fn optional<F>(lookup: &F, key: &str) -> String where F: Fn(&str) -> Option<String> {
    lookup(key).unwrap_or_default()
}

impl BotSecrets {
    pub fn from_env() -> Result<Self, SecretError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, SecretError> where F: Fn(&str) -> Option<String> {
        Ok(Self {
            telegram_token: required(&lookup, "TELEGRAM_TOKEN")?,
        })
    }
}

impl BotConfig {
    pub fn from_env() -> Result<Self, SecretError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, SecretError> where F: Fn(&str) -> Option<String> {
        let link_policy = match lookup("REFERRAL_LINK_POLICY") {
            Some(raw) if !raw.trim().is_empty() => LinkPolicy::from_str(raw.trim())
                .map_err(|e| SecretError::Invalid("REFERRAL_LINK_POLICY", e.to_string()))?,
            _ => LinkPolicy::default(),
        };

        let database_path = lookup("DATABASE_PATH")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string());

        Ok(Self {
            admins: parse_admins(&optional(&lookup, "ADMINS")),
            channel: TargetChat {
                chat_id: required(&lookup, "CHANNEL_ID")?,
                invite_url: required(&lookup, "CHANNEL_URL")?,
            },
            group: TargetChat {
                chat_id: required(&lookup, "GROUP_ID")?,
                invite_url: required(&lookup, "GROUP_URL")?,
            },
            social_link_1: optional(&lookup, "SOCIAL_LINK_1"),
            social_link_2: optional(&lookup, "SOCIAL_LINK_2"),
            database_path,
            link_policy,
        })
    }
}

/// Comma separated ids. Entries that aren't ids can never match a caller, so they are only logged.
pub fn parse_admins(raw: &str) -> HashSet<UserId> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match UserId::from_str(s) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("Ignoring admin entry {s:?}: {e}");
                None
            }
        })
        .collect()
}

impl AppState {
    pub fn new(config: BotConfig, bot_username: String, chat_client: Arc<dyn ChatClient>, membership: Arc<dyn MembershipLookup>) -> Self {
        Self {
            config: Arc::new(config),
            bot_username,
            chat_client,
            membership,
            sessions: SessionStore::new(),
        }
    }
}
