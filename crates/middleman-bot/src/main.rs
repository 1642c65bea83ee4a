mod config;
mod discord;
mod handler;
mod render;

use std::sync::Arc;

use serenity::all::{Client, GatewayIntents, Http};
use tracing::info;

use middleman_core::{Controller, MemoryConfirmations};
use middleman_db::Database;

use crate::config::Config;
use crate::discord::SerenityPlatform;
use crate::handler::Handler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "middleman_bot=debug,middleman_core=debug,middleman_db=info,serenity=warn".into()
            }),
        )
        .init();

    // Config
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {:#}", e);
            std::process::exit(1);
        }
    };

    // Init database
    let db = Database::open(&config.db_path)?;
    info!(
        "Ticket store at {} ({} open tickets)",
        config.db_path.display(),
        db.count_tickets()?
    );

    // Shared state
    let http = Arc::new(Http::new(&config.token));
    let platform = SerenityPlatform::new(http, config.guild_id, config.banner_path.clone());
    let controller = Controller::new(
        Arc::new(platform),
        Arc::new(db),
        Arc::new(MemoryConfirmations::new()),
        config.settings(),
    );
    let handler = Handler::new(controller, config.guild_id, config.prefix.clone());

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_MEMBERS;

    let mut client = Client::builder(&config.token, intents)
        .event_handler(handler)
        .await?;

    info!("Connecting to Discord");
    client.start().await?;

    Ok(())
}
