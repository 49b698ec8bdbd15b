use std::{collections::{BTreeMap, HashMap}, sync::Arc};
use futures::future::BoxFuture;
use sqlx::SqlitePool;

use crate::bot::{chat_event::chat_event::ChatEvent, commands::{referral::commands::REFERRAL_COMMANDS, CommandGroup, CommandMap, CommandRegistry}, permissions::permissions::PermissionLevel, state::def::{AppState, BotError}};

pub type BotResult<T> = Result<T, BotError>;

lazy_static::lazy_static! {
    pub static ref COMMAND_GROUPS: HashMap<&'static str, Arc<CommandGroup>> = {
        let mut map = HashMap::new();
        map.insert("referral", REFERRAL_COMMANDS.clone());
        map
    };
}

pub trait CommandT: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn permission(&self) -> PermissionLevel;

    fn execute(&self, event: ChatEvent, pool: SqlitePool, state: Arc<AppState>) -> BoxFuture<'static, BotResult<()>>;
}

type CommandFn = dyn Fn(ChatEvent, SqlitePool, Arc<AppState>) -> BoxFuture<'static, BotResult<()>> + Send + Sync;

/// A command backed by a closure.
pub struct FnCommand {
    name: String,
    description: String,
    permission: PermissionLevel,
    func: Box<CommandFn>,
}

impl FnCommand {
    pub fn new<F>(name: impl Into<String>, description: impl Into<String>, permission: PermissionLevel, func: F) -> Self
    where
        F: Fn(ChatEvent, SqlitePool, Arc<AppState>) -> BoxFuture<'static, BotResult<()>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            permission,
            func: Box::new(func),
        }
    }
}

impl CommandT for FnCommand {
    fn execute(&self, event: ChatEvent, pool: SqlitePool, state: Arc<AppState>) -> BoxFuture<'static, BotResult<()>> {
        (self.func)(event, pool, state)
    }

    fn name(&self) -> &str { &self.name }
    fn description(&self) -> &str { &self.description }
    fn permission(&self) -> PermissionLevel { self.permission }
}

impl CommandRegistry {
    pub fn new() -> Self {
        let mut groups = HashMap::new();

        for (name, group) in COMMAND_GROUPS.iter() {
            groups.insert((*name).to_string(), Arc::clone(group));
        }

        Self { groups }
    }
}

/// `(name, description)` of every command open to everyone, sorted by name.
/// Aliases of the same command are listed once.
pub fn bot_command_list(commands: &CommandMap) -> Vec<(String, String)> {
    commands
        .values()
        .filter(|cmd| cmd.permission() == PermissionLevel::Everyone)
        .map(|cmd| (cmd.name().to_string(), cmd.description().to_string()))
        .collect::<BTreeMap<_, _>>()
        .into_iter()
        .collect()
}

#[macro_export]
macro_rules! cmd {
    ($command:expr, $($alias:expr),+ $(,)?) => {
        CommandRegistration {
            aliases: vec![$($alias.to_string()),+],
            command: $command,
        }
    };
}
