use std::{collections::HashMap, sync::Arc};

use sqlx::SqlitePool;
use tokio::sync::{mpsc::UnboundedReceiver, oneshot::{self, error::TryRecvError}};
use tracing::{error, info};

use crate::bot::{chat_event::chat_event::ChatEvent, commands::{commands::BotResult, CommandMap}, db::UserId, handler::handler::handle_event, state::def::AppState};

pub mod state;
pub mod chat_event;
pub mod dispatcher;
pub mod commands;
pub mod platforms;
pub mod permissions;
pub mod db;
pub mod handler;
pub mod membership;
pub mod referral;
pub mod replies;

/// Each update gets its own task. A user's updates run one after another in
/// arrival order, so a slow membership lookup only holds up that user.
pub async fn run_event_loop(pool: SqlitePool, state: Arc<AppState>, commands: Arc<CommandMap>, mut rx: UnboundedReceiver<ChatEvent>) -> BotResult<()> {
    info!("Event loop ready with {} commands", commands.len());
    // completion signal of the newest update per user
    let mut in_flight: HashMap<UserId, oneshot::Receiver<()>> = HashMap::new();

    while let Some(event) = rx.recv().await {
        in_flight.retain(|_, done| matches!(done.try_recv(), Err(TryRecvError::Empty)));

        let (finished, done) = oneshot::channel();
        let previous = in_flight.insert(event.user.id, done);
        let (pool, state, commands) = (pool.clone(), state.clone(), commands.clone());

        tokio::spawn(async move {
            if let Some(previous) = previous {
                // an error only means the earlier task died, the turn is ours either way
                let _ = previous.await;
            }
            if let Err(e) = handle_event(event, pool, state, &commands).await {
                error!("Event error: {e:?}");
            }
            let _ = finished.send(());
        });
    }

    Ok(())
}
