mod bot;

use std::sync::Arc;

use bot::{chat_event::chat_event::ChatEvent, commands::{commands::BotResult, CommandRegistry}, db::{connect, initialize_database}, platforms::telegram::{event_loop::run_telegram_loop, telegram::TelegramClient}, run_event_loop, state::def::{AppState, BotConfig, BotSecrets}};
use tokio::sync::mpsc::unbounded_channel;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        error!("refbot stopped: {e}");
        std::process::exit(1);
    }
}

async fn run() -> BotResult<()> {
    let secrets = BotSecrets::from_env()?;
    let config = BotConfig::from_env()?;

    let pool = connect(&config.database_path).await?;
    initialize_database(&pool).await?;
    info!("Database ready at {}", config.database_path);

    let client = Arc::new(TelegramClient::new(&secrets.telegram_token));
    let bot_username = client.username().await?;
    info!("Running as @{bot_username}, referral links use {} mode", config.link_policy);

    let commands = Arc::new(CommandRegistry::new().build_command_map());
    if let Err(e) = client.register_commands(&commands).await {
        warn!("Failed to publish the command list: {e}");
    }

    let state = Arc::new(AppState::new(config, bot_username, client.clone(), client.clone()));
    let (tx, rx) = unbounded_channel::<ChatEvent>();

    tokio::spawn(run_telegram_loop(client.bot(), tx));

    run_event_loop(pool, state, commands, rx).await
}
