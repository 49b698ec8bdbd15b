use sqlx::SqlitePool;
use tracing::{debug, warn};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use crate::bot::chat_event::chat_event::BotReply;
use crate::bot::chat_event::chat_event::ChatEvent;
use crate::bot::chat_event::chat_event::EventKind;
use crate::bot::commands::CommandMap;
use crate::bot::commands::CommandRegistry;
use crate::bot::commands::commands::BotResult;
use crate::bot::commands::referral::logic::MenuAction;
use crate::bot::db::users::add_user;
use crate::bot::handler::handler::send_replies;
use crate::bot::permissions::permissions::has_permission;
use crate::bot::replies::Replies;
use crate::bot::state::def::AppState;

/// Routes an update to a command, a menu action or the text handler.
/// Only `/start` and button presses register the sender, plain chatter leaves no trace.
pub async fn dispatch_event(commands: &CommandMap, state: Arc<AppState>, event: ChatEvent, pool: SqlitePool) -> BotResult<()> {
    let client = state.chat_client.clone();

    match event.kind.clone() {
        EventKind::Command { name, .. } => {
            let Some(cmd) = commands.get(&name).cloned() else {
                debug!("Unknown command /{name} from {}", event.user.display());
                return Ok(());
            };

            if has_permission(&event.user, cmd.permission(), &state.config.admins) {
                cmd.execute(event, pool, state).await?;
            } else {
                client.send_reply(event.chat_id, &BotReply::text(Replies::not_authorized())).await?;
            }
        }
        EventKind::Callback { data, .. } => {
            add_user(&pool, event.user.id, event.user.username.as_deref()).await?;
            let Ok(action) = MenuAction::from_str(&data) else {
                warn!("Unknown callback {data:?} from {}", event.user.display());
                return Ok(());
            };

            let replies = state.handle_menu(&pool, &event.user, action).await?;
            send_replies(client.as_ref(), event.chat_id, &replies).await?;
        }
        EventKind::Text(text) => {
            let replies = state.handle_text(&pool, &event.user, &text).await?;
            send_replies(client.as_ref(), event.chat_id, &replies).await?;
        }
    }

    Ok(())
}

impl CommandRegistry {
    pub fn build_command_map(&self) -> CommandMap {
        let mut map: CommandMap = HashMap::new();

        for group in self.groups.values() {
            debug!("Loading {} commands from group {}", group.commands.len(), group.name);
            for reg in &group.commands {
                for alias in &reg.aliases {
                    map.insert(alias.to_ascii_lowercase(), reg.command.clone());
                }
            }
        }

        map
    }
}
