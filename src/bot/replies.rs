use teloxide::utils::html::escape;

use crate::bot::db::users::{UserRecord, MAX_WALLET_LEN};

/// Telegram rejects longer messages.
pub const MAX_MESSAGE_LEN: usize = 4096;

pub struct Replies;

impl Replies {
    pub fn referral_thanks() -> String {
        "🤝 Thanks for joining through a referral!".to_string()
    }

    pub fn referral_invalid() -> String {
        "❌ Invalid referral link.".to_string()
    }

    pub fn welcome() -> String {
        "👋 Welcome! Please follow the steps below:".to_string()
    }

    pub fn join_channel(channel_url: &str, social_link: &str) -> String {
        if social_link.is_empty() {
            format!("📢 Please join our channel: [Channel]({channel_url})")
        } else {
            format!("📢 Please join our channel: [Channel]({channel_url}) and follow us on [Social Platform 1]({social_link})")
        }
    }

    pub fn join_group(group_url: &str, social_link: &str) -> String {
        if social_link.is_empty() {
            format!("💬 Please join our group: [Group]({group_url})")
        } else {
            format!("💬 Please join our group: [Group]({group_url}) and follow us on [Social Platform 2]({social_link})")
        }
    }

    pub fn wallet_prompt() -> String {
        "👛 Please enter your wallet address:".to_string()
    }

    pub fn wallet_empty() -> String {
        "❌ That doesn't look like a wallet address, please send it again:".to_string()
    }

    pub fn wallet_too_long() -> String {
        format!("❌ Wallet addresses are at most {MAX_WALLET_LEN} characters, please send it again:")
    }

    pub fn wallet_updated() -> String {
        "✅ Wallet address updated.".to_string()
    }

    pub fn points(points: Option<i64>) -> String {
        match points {
            Some(p) => format!("⭐ Your points: {p}"),
            None => "⭐ Your points: N/A".to_string(),
        }
    }

    pub fn referral_link(link: &str) -> String {
        format!("🔗 Your referral link: {link}")
    }

    pub fn referral_link_unavailable() -> String {
        "🔒 Referral link not yet available. Please complete all steps.".to_string()
    }

    pub fn membership_required() -> String {
        "❌ You need to join the channel and group before proceeding.".to_string()
    }

    pub fn not_authorized() -> String {
        "⛔ You are not authorized.".to_string()
    }

    pub fn internal_error() -> String {
        "💀 Something went wrong, please try again later.".to_string()
    }

    /// HTML formatted, values escaped. Split into as many messages as it takes
    /// to stay under the message limit, the header only on the first one.
    pub fn leaderboard(users: &[UserRecord]) -> Vec<String> {
        let mut pages = Vec::new();
        let mut page = String::from("📋 Top 10 Users:\n");
        let mut page_len = page.chars().count();

        for user in users {
            let wallet = user.wallet_address.as_deref().map(|w| shorten(w, MAX_WALLET_LEN)).unwrap_or_else(|| "-".into());
            let line = format!(
                "User ID: {}, @{}, Points: {}, Wallet: <code>{}</code>\n",
                user.user_id,
                escape(user.username.as_deref().unwrap_or("-")),
                user.points,
                escape(&wallet),
            );

            let line_len = line.chars().count();
            if page_len + line_len > MAX_MESSAGE_LEN {
                pages.push(std::mem::take(&mut page));
                page_len = 0;
            }
            page.push_str(&line);
            page_len += line_len;
        }

        pages.push(page);
        pages
    }
}

/// Cuts `s` down to `max` characters, marking the cut.
fn shorten(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((end, _)) => format!("{}…", &s[..end]),
        None => s.to_string(),
    }
}
