use core::fmt;
use std::{error::Error, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::{encode::IsNull, sqlite::{SqliteConnectOptions, SqlitePoolOptions}, Database, Decode, Encode, Sqlite, SqlitePool, Type};

use crate::bot::commands::commands::BotResult;

pub mod users;

pub async fn connect(database_path: &str) -> BotResult<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(database_path)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}

pub async fn initialize_database(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(users::USERS_TABLE).execute(pool).await?;
    Ok(())
}

/// Telegram user id. Stored as decimal TEXT so the table stays readable
/// from the sqlite shell and matches the deep-link payload format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub struct UserId(i64);

impl UserId {
    pub fn new(id: i64) -> Self {
        UserId(id)
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl FromStr for UserId {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err("user id must be a decimal number");
        }
        s.parse::<i64>().map(UserId).map_err(|_| "user id out of range")
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Type<Sqlite> for UserId {
    fn type_info() -> <Sqlite as Database>::TypeInfo {
        <String as Type<Sqlite>>::type_info()
    }

    fn compatible(ty: &<Sqlite as Database>::TypeInfo) -> bool {
        <String as Type<Sqlite>>::compatible(ty)
    }
}

impl<'q> Encode<'q, Sqlite> for UserId {
    fn encode_by_ref(&self, buf: &mut <Sqlite as Database>::ArgumentBuffer<'q>) -> Result<IsNull, Box<dyn Error + Send + Sync>> {
        <String as Encode<'q, Sqlite>>::encode(self.0.to_string(), buf)
    }
}

impl<'r> Decode<'r, Sqlite> for UserId {
    fn decode(value: <Sqlite as Database>::ValueRef<'r>) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let s = <String as Decode<Sqlite>>::decode(value)?;
        Ok(UserId::from_str(&s)?)
    }
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    // one connection, otherwise every pool connection gets its own in-memory database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    initialize_database(&pool).await.expect("schema");
    pool
}
