use std::sync::Arc;

use crate::{bot::{chat_event::chat_event::EventKind, commands::{commands::{CommandT, FnCommand}, referral::logic::admin_report, CommandGroup, CommandRegistration}, handler::handler::send_replies, permissions::permissions::PermissionLevel}, cmd};

lazy_static::lazy_static! {
    pub static ref REFERRAL_COMMANDS: Arc<CommandGroup> = Arc::new(CommandGroup {
        name: "referral".into(),
        commands: vec![
            cmd!(start_command(), "start"),
            cmd!(admin_command(), "admin"),
        ]
    });
}

pub fn start_command() -> Arc<dyn CommandT> {
    Arc::new(FnCommand::new("start", "Register and show the main menu", PermissionLevel::Everyone, |event, pool, state| {
        Box::pin(async move {
            let args = match &event.kind {
                EventKind::Command { args, .. } => args.clone(),
                _ => Vec::new(),
            };

            let replies = state.handle_start(&pool, &event.user, &args).await?;
            send_replies(state.chat_client.as_ref(), event.chat_id, &replies).await
        })
    }))
}

pub fn admin_command() -> Arc<dyn CommandT> {
    Arc::new(FnCommand::new("admin", "Top 10 users by points", PermissionLevel::Admin, |event, pool, state| {
        Box::pin(async move {
            let replies = admin_report(&pool, &state.config.admins, event.user.id).await?;
            send_replies(state.chat_client.as_ref(), event.chat_id, &replies).await
        })
    }))
}
