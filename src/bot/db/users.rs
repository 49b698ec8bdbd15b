use sqlx::SqlitePool;

use crate::bot::{commands::commands::BotResult, db::UserId};

pub const USERS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS users (
        user_id TEXT PRIMARY KEY,        -- telegram user id, decimal
        username TEXT,                   -- may be missing or change between sessions
        wallet_address TEXT,
        points INTEGER DEFAULT 0,
        joined_channel INTEGER DEFAULT 0,
        joined_group INTEGER DEFAULT 0,
        referral_link TEXT               -- the user's own link, shown to them
    );
";

/// Longest wallet address accepted, in characters. Real addresses are well under this.
pub const MAX_WALLET_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct UserRecord {
    pub user_id: UserId,
    pub username: Option<String>,
    pub wallet_address: Option<String>,
    pub points: i64,
    pub joined_channel: bool,
    pub joined_group: bool,
    pub referral_link: Option<String>,
}

/// Inserts a fresh row, or does nothing when the user is already known.
pub async fn add_user(pool: &SqlitePool, user_id: UserId, username: Option<&str>) -> BotResult<()> {
    sqlx::query("INSERT OR IGNORE INTO users (user_id, username) VALUES (?, ?)")
        .bind(user_id)
        .bind(username)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn update_wallet(pool: &SqlitePool, user_id: UserId, wallet_address: &str) -> BotResult<()> {
    sqlx::query("UPDATE users SET wallet_address = ? WHERE user_id = ?")
        .bind(wallet_address)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn update_membership_status(pool: &SqlitePool, user_id: UserId, joined_channel: bool, joined_group: bool) -> BotResult<()> {
    sqlx::query("UPDATE users SET joined_channel = ?, joined_group = ? WHERE user_id = ?")
        .bind(joined_channel)
        .bind(joined_group)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Relative update, two racing credits can't lose each other.
pub async fn update_points(pool: &SqlitePool, user_id: UserId, delta: i64) -> BotResult<()> {
    sqlx::query("UPDATE users SET points = points + ? WHERE user_id = ?")
        .bind(delta)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn set_referral_link(pool: &SqlitePool, user_id: UserId, link: &str) -> BotResult<()> {
    sqlx::query("UPDATE users SET referral_link = ? WHERE user_id = ?")
        .bind(link)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Returns true when the link was written, false when one was already stored.
pub async fn set_referral_link_if_absent(pool: &SqlitePool, user_id: UserId, link: &str) -> BotResult<bool> {
    let result = sqlx::query("UPDATE users SET referral_link = ? WHERE user_id = ? AND referral_link IS NULL")
        .bind(link)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn get_user(pool: &SqlitePool, user_id: UserId) -> BotResult<Option<UserRecord>> {
    let user = sqlx::query_as::<_, UserRecord>(
        r#"
        SELECT user_id, username, wallet_address, points, joined_channel, joined_group, referral_link
        FROM users
        WHERE user_id = ?
        "#
    ).bind(user_id).fetch_optional(pool).await?;

    Ok(user)
}

/// Leaderboard order: points descending, equal points in insertion order.
pub async fn top_users(pool: &SqlitePool, limit: u32) -> BotResult<Vec<UserRecord>> {
    let users = sqlx::query_as::<_, UserRecord>(
        r#"
        SELECT user_id, username, wallet_address, points, joined_channel, joined_group, referral_link
        FROM users
        ORDER BY points DESC, rowid ASC
        LIMIT ?
        "#
    ).bind(i64::from(limit)).fetch_all(pool).await?;

    Ok(users)
}
