use std::time::Duration;

use futures::future::BoxFuture;
use teloxide::{
    prelude::*,
    types::{BotCommand, CallbackQuery, ChatId, ChatMemberStatus, InlineKeyboardButton, InlineKeyboardMarkup, Message, Recipient, User},
};
use tracing::debug;

use crate::bot::{
    chat_event::chat_event::{BotReply, Button, ChatEvent, ChatUser, EventKind, ParseMode},
    commands::{commands::{bot_command_list, BotResult}, CommandMap},
    db::UserId,
    handler::handler::ChatClient,
    membership::membership::{MemberStatus, MembershipLookup},
    state::def::BotError,
};

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub fn new(token: &str) -> Self {
        Self { bot: Bot::new(token) }
    }

    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }

    /// The bot's own `@username`, deep links don't work without one.
    pub async fn username(&self) -> BotResult<String> {
        let me = self.bot.get_me().await?;
        me.user.username.clone()
            .ok_or_else(|| BotError::Custom("getMe returned no username, deep links need one".into()))
    }

    /// Publishes the commands everyone may use, so clients can suggest them.
    pub async fn register_commands(&self, commands: &CommandMap) -> BotResult<()> {
        let list: Vec<BotCommand> = bot_command_list(commands)
            .into_iter()
            .map(|(name, description)| BotCommand::new(name, description))
            .collect();
        self.bot.set_my_commands(list).await?;
        Ok(())
    }

    pub async fn send_message(&self, chat_id: i64, reply: &BotReply) -> BotResult<()> {
        let mut request = self.bot.send_message(ChatId(chat_id), reply.text.clone());
        if let Some(mode) = reply.parse_mode {
            request = request.parse_mode(telegram_parse_mode(mode));
        }
        if let Some(keyboard) = &reply.keyboard {
            request = request.reply_markup(inline_keyboard(keyboard));
        }

        request.await?;
        Ok(())
    }

    pub async fn answer_callback_query(&self, query_id: &str) -> BotResult<()> {
        self.bot.answer_callback_query(query_id.to_string()).await?;
        Ok(())
    }

    pub async fn get_chat_member(&self, chat_id: &str, user_id: UserId) -> BotResult<MemberStatus> {
        let telegram_id = u64::try_from(user_id.get())
            .map_err(|_| BotError::Custom(format!("{user_id} is not a Telegram user id")))?;

        let request = self.bot.get_chat_member(recipient(chat_id), teloxide::types::UserId(telegram_id));
        let member = tokio::time::timeout(LOOKUP_TIMEOUT, request.send())
            .await
            .map_err(|_| BotError::Timeout(format!("getChatMember {chat_id} {user_id}")))??;

        let status = member_status(member.kind.status());
        debug!("getChatMember {chat_id} {user_id}: {status:?}");
        Ok(status)
    }
}

/// `-100123` goes out as a numeric id, anything else as a `@channel` username.
fn recipient(chat_id: &str) -> Recipient {
    match chat_id.parse::<i64>() {
        Ok(id) => Recipient::Id(ChatId(id)),
        Err(_) => Recipient::ChannelUsername(chat_id.to_string()),
    }
}

fn member_status(status: ChatMemberStatus) -> MemberStatus {
    match status {
        ChatMemberStatus::Owner => MemberStatus::Creator,
        ChatMemberStatus::Administrator => MemberStatus::Administrator,
        ChatMemberStatus::Member => MemberStatus::Member,
        ChatMemberStatus::Restricted => MemberStatus::Restricted,
        ChatMemberStatus::Left => MemberStatus::Left,
        ChatMemberStatus::Banned => MemberStatus::Kicked,
    }
}

// the join texts use the legacy [text](url) syntax
#[allow(deprecated)]
fn telegram_parse_mode(mode: ParseMode) -> teloxide::types::ParseMode {
    match mode {
        ParseMode::Markdown => teloxide::types::ParseMode::Markdown,
        ParseMode::Html => teloxide::types::ParseMode::Html,
    }
}

fn inline_keyboard(rows: &[Vec<Button>]) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = rows
        .iter()
        .map(|row| row.iter().map(|b| InlineKeyboardButton::callback(b.text.clone(), b.callback_data.clone())).collect())
        .collect();
    InlineKeyboardMarkup::new(rows)
}

/// Messages from bots and anything without text map to `None`.
pub fn message_event(msg: &Message) -> Option<ChatEvent> {
    let from = msg.from.as_ref().filter(|u| !u.is_bot)?;
    let text = msg.text()?;

    Some(ChatEvent {
        chat_id: msg.chat.id.0,
        user: chat_user(from),
        kind: parse_text(text),
    })
}

pub fn callback_event(query: &CallbackQuery) -> ChatEvent {
    let user = chat_user(&query.from);
    let chat_id = query.message.as_ref().map(|m| m.chat().id.0).unwrap_or(user.id.get());

    ChatEvent {
        chat_id,
        user,
        kind: EventKind::Callback { query_id: query.id.clone(), data: query.data.clone().unwrap_or_default() },
    }
}

fn chat_user(user: &User) -> ChatUser {
    ChatUser { id: UserId::new(user.id.0 as i64), username: user.username.clone() }
}

/// `/start@RefBot referral-1` is the command `start` with one argument.
fn parse_text(text: &str) -> EventKind {
    let Some(rest) = text.strip_prefix('/') else {
        return EventKind::Text(text.to_string());
    };

    let mut words = rest.split_whitespace();
    let name = words
        .next()
        .and_then(|w| w.split('@').next())
        .unwrap_or("")
        .to_ascii_lowercase();

    if name.is_empty() {
        return EventKind::Text(text.to_string());
    }

    EventKind::Command { name, args: words.map(String::from).collect() }
}

impl ChatClient for TelegramClient {
    fn send_reply<'a>(&'a self, chat_id: i64, reply: &'a BotReply) -> BoxFuture<'a, BotResult<()>> {
        Box::pin(self.send_message(chat_id, reply))
    }

    fn answer_callback<'a>(&'a self, query_id: &'a str) -> BoxFuture<'a, BotResult<()>> {
        Box::pin(self.answer_callback_query(query_id))
    }
}

impl MembershipLookup for TelegramClient {
    fn member_status<'a>(&'a self, chat_id: &'a str, user_id: UserId) -> BoxFuture<'a, BotResult<MemberStatus>> {
        Box::pin(self.get_chat_member(chat_id, user_id))
    }
}
