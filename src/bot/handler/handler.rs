use std::sync::Arc;

use futures::future::BoxFuture;
use sqlx::SqlitePool;
use tracing::{error, warn};

use crate::bot::{chat_event::chat_event::{BotReply, ChatEvent, EventKind}, commands::{commands::BotResult, CommandMap}, dispatcher::dispatcher::dispatch_event, replies::Replies, state::def::AppState};

pub trait ChatClient: Send + Sync {
    fn send_reply<'a>(&'a self, chat_id: i64, reply: &'a BotReply) -> BoxFuture<'a, BotResult<()>>;
    fn answer_callback<'a>(&'a self, query_id: &'a str) -> BoxFuture<'a, BotResult<()>>;
}

pub async fn send_replies(client: &dyn ChatClient, chat_id: i64, replies: &[BotReply]) -> BotResult<()> {
    for reply in replies {
        client.send_reply(chat_id, reply).await?;
    }
    Ok(())
}

pub async fn handle_event(event: ChatEvent, pool: SqlitePool, state: Arc<AppState>, commands: &CommandMap) -> BotResult<()> {
    let chat_id = event.chat_id;

    // stops the button spinner, nothing else depends on it
    if let EventKind::Callback { query_id, .. } = &event.kind {
        if let Err(e) = state.chat_client.answer_callback(query_id).await {
            warn!("Failed to answer callback {query_id}: {e}");
        }
    }

    if let Err(e) = dispatch_event(commands, state.clone(), event, pool).await {
        error!("Failed to handle update in chat {chat_id}: {e}");
        state.chat_client.send_reply(chat_id, &BotReply::text(Replies::internal_error())).await?;
    }

    Ok(())
}
