use crate::bot::db::UserId;

/// One inbound update, already stripped of everything platform specific.
#[derive(Debug, Clone)]
pub struct ChatEvent {
    pub chat_id: i64,
    pub user: ChatUser,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// `/name arg1 arg2`, bot mention already removed from the name
    Command { name: String, args: Vec<String> },
    /// inline keyboard button press
    Callback { query_id: String, data: String },
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatUser {
    pub id: UserId,
    pub username: Option<String>,
}

impl ChatUser {
    pub fn display(&self) -> String {
        match &self.username {
            Some(name) => format!("@{name}"),
            None => self.id.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Markdown,
    Html,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub text: String,
    pub callback_data: String,
}

impl Button {
    pub fn new(text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self { text: text.into(), callback_data: callback_data.into() }
    }
}

/// Outbound message. Rows of buttons become an inline keyboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotReply {
    pub text: String,
    pub parse_mode: Option<ParseMode>,
    pub keyboard: Option<Vec<Vec<Button>>>,
}

impl BotReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), parse_mode: None, keyboard: None }
    }

    pub fn markdown(text: impl Into<String>) -> Self {
        Self { text: text.into(), parse_mode: Some(ParseMode::Markdown), keyboard: None }
    }

    pub fn html(text: impl Into<String>) -> Self {
        Self { text: text.into(), parse_mode: Some(ParseMode::Html), keyboard: None }
    }

    pub fn with_keyboard(mut self, keyboard: Vec<Vec<Button>>) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}
