use std::{collections::HashSet, str::FromStr};

use regex::Regex;
use sqlx::SqlitePool;
use tracing::info;

use crate::bot::{
    chat_event::chat_event::{BotReply, Button, ChatUser},
    commands::commands::BotResult,
    db::{users::{add_user, get_user, top_users, update_membership_status, update_points, update_wallet, MAX_WALLET_LEN}, UserId},
    membership::membership::verify_membership,
    permissions::permissions::is_admin,
    referral::referral::{generate_referral_link, is_referral_payload, parse_referral_payload},
    replies::Replies,
    state::def::AppState,
};

pub const LEADERBOARD_SIZE: u32 = 10;

lazy_static::lazy_static! {
    static ref JOIN_CHANNEL_TEXT: Regex = Regex::new(r"^Join Channel$").unwrap();
    static ref JOIN_GROUP_TEXT: Regex = Regex::new(r"^Join Group$").unwrap();
}

/// Inline keyboard buttons, the callback ids are part of the bot's public surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    JoinChannel,
    JoinGroup,
    SubmitWallet,
    ViewPoints,
    ShowReferralLink,
    ReferralLinkNotAvailable,
}

impl MenuAction {
    pub fn callback_id(&self) -> &'static str {
        match self {
            MenuAction::JoinChannel => "join_channel",
            MenuAction::JoinGroup => "join_group",
            MenuAction::SubmitWallet => "submit_wallet",
            MenuAction::ViewPoints => "view_points",
            MenuAction::ShowReferralLink => "show_referral_link",
            MenuAction::ReferralLinkNotAvailable => "referral_link_not_available",
        }
    }

    fn button(self, text: &str) -> Vec<Button> {
        vec![Button::new(text, self.callback_id())]
    }
}

impl FromStr for MenuAction {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "join_channel" => Ok(MenuAction::JoinChannel),
            "join_group" => Ok(MenuAction::JoinGroup),
            "submit_wallet" => Ok(MenuAction::SubmitWallet),
            "view_points" => Ok(MenuAction::ViewPoints),
            "show_referral_link" => Ok(MenuAction::ShowReferralLink),
            "referral_link_not_available" => Ok(MenuAction::ReferralLinkNotAvailable),
            _ => Err("Unknown menu action"),
        }
    }
}

/// The referral link button only works once a wallet is on file.
pub fn main_menu(has_wallet: bool) -> Vec<Vec<Button>> {
    let mut keyboard = vec![
        MenuAction::JoinChannel.button("Join Channel"),
        MenuAction::JoinGroup.button("Join Group"),
        MenuAction::SubmitWallet.button("Submit Wallet Address"),
        MenuAction::ViewPoints.button("View Points"),
    ];

    if has_wallet {
        keyboard.push(MenuAction::ShowReferralLink.button("Show Referral Link"));
    } else {
        keyboard.push(MenuAction::ReferralLinkNotAvailable.button("Referral Link"));
    }
    keyboard
}

impl AppState {
    pub async fn handle_start(&self, pool: &SqlitePool, user: &ChatUser, args: &[String]) -> BotResult<Vec<BotReply>> {
        add_user(pool, user.id, user.username.as_deref()).await?;
        let record = get_user(pool, user.id).await?;

        let mut replies = Vec::new();
        if let Some(arg) = args.first().filter(|a| is_referral_payload(a)) {
            match parse_referral_payload(arg, user.id) {
                Ok(referrer) => {
                    self.sessions.update(user.id, |s| s.referred_by = Some(referrer)).await;
                    info!("{} was referred by {}", user.display(), referrer);
                    replies.push(BotReply::text(Replies::referral_thanks()));
                }
                Err(e) => {
                    info!("Rejected referral payload {:?} from {}: {}", arg, user.display(), e);
                    replies.push(BotReply::text(Replies::referral_invalid()));
                }
            }
        }

        let has_wallet = record
            .and_then(|r| r.wallet_address)
            .is_some_and(|w| !w.is_empty());
        replies.push(BotReply::text(Replies::welcome()).with_keyboard(main_menu(has_wallet)));

        Ok(replies)
    }

    pub async fn handle_menu(&self, pool: &SqlitePool, user: &ChatUser, action: MenuAction) -> BotResult<Vec<BotReply>> {
        let config = &self.config;

        let reply = match action {
            MenuAction::JoinChannel => {
                BotReply::markdown(Replies::join_channel(&config.channel.invite_url, &config.social_link_1))
            }
            MenuAction::JoinGroup => {
                BotReply::markdown(Replies::join_group(&config.group.invite_url, &config.social_link_2))
            }
            MenuAction::SubmitWallet => {
                self.sessions.update(user.id, |s| s.awaiting_wallet = true).await;
                BotReply::text(Replies::wallet_prompt())
            }
            MenuAction::ViewPoints => {
                let points = get_user(pool, user.id).await?.map(|u| u.points);
                BotReply::text(Replies::points(points))
            }
            MenuAction::ShowReferralLink => {
                match get_user(pool, user.id).await?.and_then(|u| u.referral_link) {
                    Some(link) => BotReply::text(Replies::referral_link(&link)),
                    None => BotReply::text(Replies::referral_link_unavailable()),
                }
            }
            MenuAction::ReferralLinkNotAvailable => BotReply::text(Replies::referral_link_unavailable()),
        };

        Ok(vec![reply])
    }

    /// Free text. "Join Channel"/"Join Group" always answer like the buttons,
    /// anything else only matters while a wallet address is expected.
    pub async fn handle_text(&self, pool: &SqlitePool, user: &ChatUser, text: &str) -> BotResult<Vec<BotReply>> {
        if JOIN_CHANNEL_TEXT.is_match(text) {
            return self.handle_menu(pool, user, MenuAction::JoinChannel).await;
        }
        if JOIN_GROUP_TEXT.is_match(text) {
            return self.handle_menu(pool, user, MenuAction::JoinGroup).await;
        }

        if !self.sessions.get(user.id).await.awaiting_wallet {
            return Ok(Vec::new());
        }

        let wallet = text.trim();
        if wallet.is_empty() {
            return Ok(vec![BotReply::text(Replies::wallet_empty())]);
        }
        if wallet.chars().count() > MAX_WALLET_LEN {
            return Ok(vec![BotReply::text(Replies::wallet_too_long())]);
        }

        let result = self.submit_wallet(pool, user, wallet).await;
        // retrying needs another "submit wallet" press, success or not
        self.sessions.update(user.id, |s| s.awaiting_wallet = false).await;
        result
    }

    async fn submit_wallet(&self, pool: &SqlitePool, user: &ChatUser, wallet: &str) -> BotResult<Vec<BotReply>> {
        update_wallet(pool, user.id, wallet).await?;
        let mut replies = vec![BotReply::text(Replies::wallet_updated())];

        let verification = verify_membership(self.membership.as_ref(), &self.config.channel, &self.config.group, user.id).await;
        if !verification.is_verified() {
            replies.push(BotReply::text(Replies::membership_required()));
            return Ok(replies);
        }

        update_membership_status(pool, user.id, true, true).await?;
        let link = generate_referral_link(pool, &self.bot_username, user.id, self.config.link_policy).await?;

        if let Some(referrer) = self.sessions.get(user.id).await.referred_by {
            update_points(pool, referrer, 1).await?;
            self.sessions.update(user.id, |s| s.referred_by = None).await;
            info!("Credited {} with a point for referring {}", referrer, user.display());
        }

        replies.push(BotReply::text(Replies::referral_link(&link)));
        Ok(replies)
    }
}

/// One HTML message normally, more when long wallets push it over the message limit.
pub async fn admin_report(pool: &SqlitePool, admins: &HashSet<UserId>, caller: UserId) -> BotResult<Vec<BotReply>> {
    if !is_admin(admins, caller) {
        return Ok(vec![BotReply::text(Replies::not_authorized())]);
    }

    let users = top_users(pool, LEADERBOARD_SIZE).await?;
    Ok(Replies::leaderboard(&users).into_iter().map(BotReply::html).collect())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::bot::{
        chat_event::chat_event::ParseMode,
        db::test_pool,
        handler::handler::fake::RecordingClient,
        membership::membership::{fake::FakeMembership, MemberStatus},
        referral::referral::LinkPolicy,
        state::def::{BotConfig, TargetChat},
    };

    const CHANNEL: &str = "@refchannel";
    const GROUP: &str = "-1001";

    fn config(admins: &[i64]) -> BotConfig {
        BotConfig {
            admins: admins.iter().copied().map(UserId::new).collect(),
            channel: TargetChat { chat_id: CHANNEL.into(), invite_url: "https://t.me/refchannel".into() },
            group: TargetChat { chat_id: GROUP.into(), invite_url: "https://t.me/+group".into() },
            social_link_1: "https://x.com/ref".into(),
            social_link_2: "https://discord.gg/ref".into(),
            database_path: ":memory:".into(),
            link_policy: LinkPolicy::WriteOnce,
        }
    }

    fn state_with(membership: FakeMembership) -> AppState {
        AppState::new(config(&[1]), "RefBot".into(), Arc::new(RecordingClient::default()), Arc::new(membership))
    }

    fn joined() -> FakeMembership {
        FakeMembership::with(&[(CHANNEL, MemberStatus::Member), (GROUP, MemberStatus::Administrator)])
    }

    fn user(id: i64) -> ChatUser {
        ChatUser { id: UserId::new(id), username: Some(format!("user{id}")) }
    }

    fn texts(replies: &[BotReply]) -> Vec<String> {
        replies.iter().map(|r| r.text.clone()).collect()
    }

    fn last_row_callback(reply: &BotReply) -> String {
        reply.keyboard.as_ref().unwrap().last().unwrap()[0].callback_data.clone()
    }

    #[test]
    fn menu_actions_round_trip_ids() {
        for action in [
            MenuAction::JoinChannel,
            MenuAction::JoinGroup,
            MenuAction::SubmitWallet,
            MenuAction::ViewPoints,
            MenuAction::ShowReferralLink,
            MenuAction::ReferralLinkNotAvailable,
        ] {
            assert_eq!(MenuAction::from_str(action.callback_id()), Ok(action));
        }
        assert!(MenuAction::from_str("delete_everything").is_err());
    }

    #[tokio::test]
    async fn start_records_referrer() {
        let pool = test_pool().await;
        let state = state_with(joined());

        let replies = state.handle_start(&pool, &user(20), &["referral-10".into()]).await.unwrap();

        assert_eq!(texts(&replies), vec![Replies::referral_thanks(), Replies::welcome()]);
        assert_eq!(state.sessions.get(UserId::new(20)).await.referred_by, Some(UserId::new(10)));
        assert!(get_user(&pool, UserId::new(20)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn start_rejects_self_and_malformed_referrals() {
        let pool = test_pool().await;
        let state = state_with(joined());

        for arg in ["referral-20", "referral-abc"] {
            let replies = state.handle_start(&pool, &user(20), &[arg.into()]).await.unwrap();
            assert_eq!(texts(&replies), vec![Replies::referral_invalid(), Replies::welcome()]);
        }
        assert_eq!(state.sessions.get(UserId::new(20)).await.referred_by, None);
    }

    #[tokio::test]
    async fn start_ignores_unrelated_payloads() {
        let pool = test_pool().await;
        let state = state_with(joined());

        let replies = state.handle_start(&pool, &user(20), &["promo".into()]).await.unwrap();
        assert_eq!(texts(&replies), vec![Replies::welcome()]);
    }

    #[tokio::test]
    async fn menu_shows_referral_link_button_once_wallet_is_known() {
        let pool = test_pool().await;
        let state = state_with(joined());

        let replies = state.handle_start(&pool, &user(20), &[]).await.unwrap();
        let menu = replies.last().unwrap();
        assert_eq!(menu.keyboard.as_ref().unwrap().len(), 5);
        assert_eq!(last_row_callback(menu), "referral_link_not_available");

        update_wallet(&pool, UserId::new(20), "wallet").await.unwrap();
        let replies = state.handle_start(&pool, &user(20), &[]).await.unwrap();
        assert_eq!(last_row_callback(replies.last().unwrap()), "show_referral_link");
    }

    #[tokio::test]
    async fn successful_verification_credits_referrer_once() {
        let pool = test_pool().await;
        let state = state_with(joined());
        let referrer = user(10);
        let referee = user(20);

        state.handle_start(&pool, &referrer, &[]).await.unwrap();
        state.handle_start(&pool, &referee, &["referral-10".into()]).await.unwrap();
        state.handle_menu(&pool, &referee, MenuAction::SubmitWallet).await.unwrap();
        assert!(state.sessions.get(referee.id).await.awaiting_wallet);

        let replies = state.handle_text(&pool, &referee, "  0xabc  ").await.unwrap();

        let link = "https://t.me/RefBot?start=referral-20";
        assert_eq!(texts(&replies), vec![Replies::wallet_updated(), Replies::referral_link(link)]);

        let record = get_user(&pool, referee.id).await.unwrap().unwrap();
        assert_eq!(record.wallet_address.as_deref(), Some("0xabc"));
        assert!(record.joined_channel && record.joined_group);
        assert_eq!(record.referral_link.as_deref(), Some(link));

        assert_eq!(get_user(&pool, referrer.id).await.unwrap().unwrap().points, 1);
        let session = state.sessions.get(referee.id).await;
        assert_eq!(session.referred_by, None);
        assert!(!session.awaiting_wallet);

        // verifying again in the same session doesn't credit again
        state.handle_menu(&pool, &referee, MenuAction::SubmitWallet).await.unwrap();
        state.handle_text(&pool, &referee, "0xdef").await.unwrap();
        assert_eq!(get_user(&pool, referrer.id).await.unwrap().unwrap().points, 1);
    }

    #[tokio::test]
    async fn failed_verification_changes_nothing_but_wallet() {
        let pool = test_pool().await;
        let state = state_with(FakeMembership::with(&[(CHANNEL, MemberStatus::Member), (GROUP, MemberStatus::Left)]));
        let referee = user(20);

        state.handle_start(&pool, &user(10), &[]).await.unwrap();
        state.handle_start(&pool, &referee, &["referral-10".into()]).await.unwrap();
        state.handle_menu(&pool, &referee, MenuAction::SubmitWallet).await.unwrap();

        let replies = state.handle_text(&pool, &referee, "0xabc").await.unwrap();
        assert_eq!(texts(&replies), vec![Replies::wallet_updated(), Replies::membership_required()]);

        let record = get_user(&pool, referee.id).await.unwrap().unwrap();
        assert!(!record.joined_channel && !record.joined_group);
        assert_eq!(record.referral_link, None);
        assert_eq!(get_user(&pool, UserId::new(10)).await.unwrap().unwrap().points, 0);

        let session = state.sessions.get(referee.id).await;
        assert!(!session.awaiting_wallet);
        assert_eq!(session.referred_by, Some(UserId::new(10)));

        // resending text without pressing the button again is ignored
        assert!(state.handle_text(&pool, &referee, "0xabc").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn lookup_failure_is_treated_as_not_verified() {
        let pool = test_pool().await;
        let state = state_with(FakeMembership::default());
        let u = user(20);

        state.handle_start(&pool, &u, &[]).await.unwrap();
        state.handle_menu(&pool, &u, MenuAction::SubmitWallet).await.unwrap();
        let replies = state.handle_text(&pool, &u, "0xabc").await.unwrap();

        assert_eq!(replies.last().unwrap().text, Replies::membership_required());
        assert!(!get_user(&pool, u.id).await.unwrap().unwrap().joined_channel);
    }

    #[tokio::test]
    async fn blank_wallet_keeps_waiting() {
        let pool = test_pool().await;
        let state = state_with(joined());
        let u = user(20);

        state.handle_start(&pool, &u, &[]).await.unwrap();
        state.handle_menu(&pool, &u, MenuAction::SubmitWallet).await.unwrap();

        let replies = state.handle_text(&pool, &u, "   ").await.unwrap();
        assert_eq!(texts(&replies), vec![Replies::wallet_empty()]);
        assert!(state.sessions.get(u.id).await.awaiting_wallet);
    }

    #[tokio::test]
    async fn view_points_and_link_queries() {
        let pool = test_pool().await;
        let state = state_with(joined());
        let u = user(20);

        let replies = state.handle_menu(&pool, &u, MenuAction::ViewPoints).await.unwrap();
        assert_eq!(texts(&replies), vec![Replies::points(None)]);
        let replies = state.handle_menu(&pool, &u, MenuAction::ShowReferralLink).await.unwrap();
        assert_eq!(texts(&replies), vec![Replies::referral_link_unavailable()]);

        state.handle_start(&pool, &u, &[]).await.unwrap();
        update_points(&pool, u.id, 4).await.unwrap();
        let replies = state.handle_menu(&pool, &u, MenuAction::ViewPoints).await.unwrap();
        assert_eq!(texts(&replies), vec![Replies::points(Some(4))]);
    }

    #[tokio::test]
    async fn join_texts_and_buttons_use_markdown_links() {
        let pool = test_pool().await;
        let state = state_with(joined());
        let u = user(20);

        let replies = state.handle_menu(&pool, &u, MenuAction::JoinChannel).await.unwrap();
        assert_eq!(replies[0].parse_mode, Some(ParseMode::Markdown));
        assert!(replies[0].text.contains("(https://t.me/refchannel)"));

        let replies = state.handle_text(&pool, &u, "Join Group").await.unwrap();
        assert!(replies[0].text.contains("(https://discord.gg/ref)"));

        assert!(state.handle_text(&pool, &u, "join group please").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn admin_report_only_for_admins() {
        let pool = test_pool().await;
        let admins: HashSet<UserId> = [UserId::new(1)].into_iter().collect();
        for (n, points) in [(5, 2), (6, 7)] {
            add_user(&pool, UserId::new(n), Some(format!("user{n}").as_str())).await.unwrap();
            update_points(&pool, UserId::new(n), points).await.unwrap();
        }

        let denied = admin_report(&pool, &admins, UserId::new(5)).await.unwrap();
        assert_eq!(denied, vec![BotReply::text(Replies::not_authorized())]);

        let empty_admins = admin_report(&pool, &HashSet::new(), UserId::new(1)).await.unwrap();
        assert_eq!(texts(&empty_admins), vec![Replies::not_authorized()]);

        let reports = admin_report(&pool, &admins, UserId::new(1)).await.unwrap();
        assert_eq!(reports.len(), 1);
        let report = &reports[0];
        assert_eq!(report.parse_mode, Some(ParseMode::Html));
        let first = report.text.find("User ID: 6").unwrap();
        let second = report.text.find("User ID: 5").unwrap();
        assert!(first < second);
    }

    #[tokio::test]
    async fn overlong_wallet_is_rejected_and_report_still_fits() {
        let pool = test_pool().await;
        let state = state_with(joined());
        let u = user(20);

        state.handle_start(&pool, &u, &[]).await.unwrap();
        state.handle_menu(&pool, &u, MenuAction::SubmitWallet).await.unwrap();

        let replies = state.handle_text(&pool, &u, &"<".repeat(4000)).await.unwrap();
        assert_eq!(texts(&replies), vec![Replies::wallet_too_long()]);
        assert!(state.sessions.get(u.id).await.awaiting_wallet);
        assert_eq!(get_user(&pool, u.id).await.unwrap().unwrap().wallet_address, None);

        let longest = "x".repeat(MAX_WALLET_LEN);
        let replies = state.handle_text(&pool, &u, &longest).await.unwrap();
        assert_eq!(replies[0].text, Replies::wallet_updated());

        // rows written before the cap existed still render within limits
        for n in 30..40 {
            add_user(&pool, UserId::new(n), None).await.unwrap();
            update_wallet(&pool, UserId::new(n), &"&".repeat(5000)).await.unwrap();
        }
        let admins: HashSet<UserId> = [UserId::new(1)].into_iter().collect();
        let reports = admin_report(&pool, &admins, UserId::new(1)).await.unwrap();
        assert!(reports.iter().all(|r| r.text.chars().count() <= crate::bot::replies::MAX_MESSAGE_LEN));
        assert_eq!(reports.iter().map(|r| r.text.matches("User ID: ").count()).sum::<usize>(), 10);
    }
}
