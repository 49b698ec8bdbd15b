use futures::future::BoxFuture;
use tracing::{error, info};

use crate::bot::{commands::commands::BotResult, db::UserId, state::def::TargetChat};

/// Where a user stands in a chat, as far as the referral flow cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberStatus {
    Creator,
    Administrator,
    Member,
    Restricted,
    Left,
    Kicked,
}

impl MemberStatus {
    pub fn is_joined(&self) -> bool {
        matches!(self, MemberStatus::Member | MemberStatus::Administrator | MemberStatus::Creator)
    }
}

pub trait MembershipLookup: Send + Sync {
    fn member_status<'a>(&'a self, chat_id: &'a str, user_id: UserId) -> BoxFuture<'a, BotResult<MemberStatus>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Verified,
    NotMember { channel: MemberStatus, group: MemberStatus },
    /// user not found, no permission, network trouble...
    LookupFailed(String),
}

impl Verification {
    pub fn is_verified(&self) -> bool {
        matches!(self, Verification::Verified)
    }
}

/// Checks the user is in both the channel and the group. Lookup errors are logged, never returned.
pub async fn verify_membership(lookup: &dyn MembershipLookup, channel: &TargetChat, group: &TargetChat, user_id: UserId) -> Verification {
    let statuses = async {
        let channel_status = lookup.member_status(&channel.chat_id, user_id).await?;
        let group_status = lookup.member_status(&group.chat_id, user_id).await?;
        BotResult::Ok((channel_status, group_status))
    }.await;

    match statuses {
        Ok((channel_status, group_status)) if channel_status.is_joined() && group_status.is_joined() => {
            Verification::Verified
        }
        Ok((channel_status, group_status)) => {
            info!("User {user_id} not a member yet (channel: {channel_status:?}, group: {group_status:?})");
            Verification::NotMember { channel: channel_status, group: group_status }
        }
        Err(e) => {
            error!("Failed to get membership status for user {user_id}: {e}");
            Verification::LookupFailed(e.to_string())
        }
    }
}
