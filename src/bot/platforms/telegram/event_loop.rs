use teloxide::{dptree, prelude::*, types::{CallbackQuery, Message, Update}};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use crate::bot::{
    chat_event::chat_event::ChatEvent,
    platforms::telegram::telegram::{callback_event, message_event},
};

/// Polls Telegram until ctrl-c and forwards every usable update to the event loop.
/// Dropping the sender on shutdown lets the event loop finish.
pub async fn run_telegram_loop(bot: Bot, tx: UnboundedSender<ChatEvent>) {
    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(forward_message))
        .branch(Update::filter_callback_query().endpoint(forward_callback));

    info!("Telegram polling started");
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![tx])
        .default_handler(|_| async {})
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
    info!("Telegram polling stopped");
}

async fn forward_message(msg: Message, tx: UnboundedSender<ChatEvent>) -> ResponseResult<()> {
    if let Some(event) = message_event(&msg) {
        forward(&tx, event);
    }
    Ok(())
}

async fn forward_callback(query: CallbackQuery, tx: UnboundedSender<ChatEvent>) -> ResponseResult<()> {
    forward(&tx, callback_event(&query));
    Ok(())
}

fn forward(tx: &UnboundedSender<ChatEvent>, event: ChatEvent) {
    if tx.send(event).is_err() {
        warn!("Event loop closed, dropping update");
    }
}
