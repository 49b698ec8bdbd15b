use core::fmt;
use std::str::FromStr;

use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;

use crate::bot::{commands::commands::BotResult, db::{users::{get_user, set_referral_link, set_referral_link_if_absent}, UserId}};

pub const REFERRAL_PREFIX: &str = "referral-";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferralError {
    #[error("referral payload is not referral-<id>")]
    Malformed,
    #[error("users can't refer themselves")]
    SelfReferral,
}

/// What to do with a stored link when verification succeeds again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LinkPolicy {
    #[default]
    WriteOnce,
    Regenerate,
}

impl FromStr for LinkPolicy {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "write_once" | "write-once" => Ok(LinkPolicy::WriteOnce),
            "regenerate" => Ok(LinkPolicy::Regenerate),
            _ => Err("expected write_once or regenerate"),
        }
    }
}

impl fmt::Display for LinkPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkPolicy::WriteOnce => write!(f, "write_once"),
            LinkPolicy::Regenerate => write!(f, "regenerate"),
        }
    }
}

pub fn is_referral_payload(arg: &str) -> bool {
    arg.starts_with(REFERRAL_PREFIX)
}

/// Parses a `referral-<id>` start argument sent by `caller`.
pub fn parse_referral_payload(arg: &str, caller: UserId) -> Result<UserId, ReferralError> {
    let referrer = arg
        .strip_prefix(REFERRAL_PREFIX)
        .and_then(|id| UserId::from_str(id).ok())
        .ok_or(ReferralError::Malformed)?;

    if referrer == caller {
        return Err(ReferralError::SelfReferral);
    }

    Ok(referrer)
}

pub fn referral_payload(user_id: UserId) -> String {
    format!("{REFERRAL_PREFIX}{user_id}")
}

/// `https://t.me/<bot>?start=referral-<id>`
pub fn deep_link(bot_username: &str, user_id: UserId) -> String {
    let bot = bot_username.trim_start_matches('@');
    format!("https://t.me/{}?start={}", bot, referral_payload(user_id))
}

/// Stores the user's own referral link on their record and returns the link the record now holds.
pub async fn generate_referral_link(pool: &SqlitePool, bot_username: &str, user_id: UserId, policy: LinkPolicy) -> BotResult<String> {
    let link = deep_link(bot_username, user_id);

    match policy {
        LinkPolicy::Regenerate => {
            set_referral_link(pool, user_id, &link).await?;
            Ok(link)
        }
        LinkPolicy::WriteOnce => {
            if set_referral_link_if_absent(pool, user_id, &link).await? {
                info!("Stored referral link for {user_id}");
                return Ok(link);
            }
            // bot username may have changed since, the stored one wins
            let stored = get_user(pool, user_id).await?.and_then(|u| u.referral_link);
            Ok(stored.unwrap_or(link))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::db::{test_pool, users::add_user};

    #[test]
    fn accepts_numeric_referrer() {
        assert_eq!(parse_referral_payload("referral-123", UserId::new(5)), Ok(UserId::new(123)));
    }

    #[test]
    fn rejects_self_referral() {
        assert_eq!(parse_referral_payload("referral-5", UserId::new(5)), Err(ReferralError::SelfReferral));
    }

    #[test]
    fn rejects_malformed_payloads() {
        for arg in ["referral-abc", "referral-", "referral--1", "referral-12-3", "ref-12", "12", "referral-1 2"] {
            assert_eq!(parse_referral_payload(arg, UserId::new(5)), Err(ReferralError::Malformed), "{arg}");
        }
    }

    #[test]
    fn deep_link_carries_payload() {
        assert_eq!(deep_link("@RefBot", UserId::new(42)), "https://t.me/RefBot?start=referral-42");
        assert_eq!(deep_link("RefBot", UserId::new(42)), "https://t.me/RefBot?start=referral-42");
    }

    #[test]
    fn link_policy_parses() {
        assert_eq!("write_once".parse(), Ok(LinkPolicy::WriteOnce));
        assert_eq!("Regenerate".parse(), Ok(LinkPolicy::Regenerate));
        assert!("never".parse::<LinkPolicy>().is_err());
    }

    #[tokio::test]
    async fn write_once_keeps_first_link() {
        let pool = test_pool().await;
        let id = UserId::new(9);
        add_user(&pool, id, None).await.unwrap();

        let first = generate_referral_link(&pool, "OldBot", id, LinkPolicy::WriteOnce).await.unwrap();
        let second = generate_referral_link(&pool, "NewBot", id, LinkPolicy::WriteOnce).await.unwrap();

        assert_eq!(first, "https://t.me/OldBot?start=referral-9");
        assert_eq!(second, first);
        assert_eq!(get_user(&pool, id).await.unwrap().unwrap().referral_link, Some(first));
    }

    #[tokio::test]
    async fn regenerate_overwrites_link() {
        let pool = test_pool().await;
        let id = UserId::new(9);
        add_user(&pool, id, None).await.unwrap();

        generate_referral_link(&pool, "OldBot", id, LinkPolicy::Regenerate).await.unwrap();
        let second = generate_referral_link(&pool, "NewBot", id, LinkPolicy::Regenerate).await.unwrap();

        assert_eq!(second, "https://t.me/NewBot?start=referral-9");
        assert_eq!(get_user(&pool, id).await.unwrap().unwrap().referral_link, Some(second));
    }
}
