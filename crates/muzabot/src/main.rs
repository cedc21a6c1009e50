//! Muza — Telegram bot that finds music across several sources and sends
//! the selected track back as audio.

mod bot;
mod handlers;
mod keyboard;
mod web_server;

use muzacore::core::{config, logging};
use muzacore::source::mp3wr::Mp3wrSource;
use muzacore::source::sefon::SefonSource;
use muzacore::source::youtube::YouTubeSource;
use muzacore::{Aggregator, MusicSource, SessionStore, SourceHealth, UserRegistry};
use std::sync::Arc;
use std::time::Duration;
use teloxide::dispatching::Dispatcher;
use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::update_listeners::Polling;

use handlers::HandlerDeps;

/// Assemble the engine: backends in priority order behind one aggregator.
fn build_aggregator() -> Aggregator {
    let health = Arc::new(SourceHealth::new());
    let mut sources: Vec<Arc<dyn MusicSource>> = vec![Arc::new(YouTubeSource::new())];

    match Mp3wrSource::new() {
        Ok(source) => sources.push(Arc::new(source)),
        Err(e) => log::error!("mp3wr backend unavailable: {}", e),
    }
    match SefonSource::new() {
        Ok(source) => sources.push(Arc::new(source)),
        Err(e) => log::error!("sefon backend unavailable: {}", e),
    }

    Aggregator::new(sources, health)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    logging::init_logger(&config::LOG_FILE_PATH)?;
    log::info!("🚀 Starting Muza...");
    logging::log_source_configuration();

    let aggregator = Arc::new(build_aggregator());
    let sessions = Arc::new(SessionStore::new());
    let users = Arc::new(UserRegistry::new());

    let bot = bot::create_bot()?;

    if let Err(e) = bot::setup_bot_commands(&bot).await {
        log::warn!("Failed to publish bot commands: {}", e);
    }

    // Keep-alive server for the hosting platform's pinger
    let users_for_web = Arc::clone(&users);
    tokio::spawn(async move {
        if let Err(e) = web_server::start_web_server(*config::PORT, users_for_web).await {
            log::error!("Keep-alive server failed: {}", e);
        }
    });

    // Heartbeat so an idle bot still writes something to the log
    tokio::spawn(async {
        loop {
            tokio::time::sleep(Duration::from_secs(300)).await;
            log::info!("Keep-alive ping");
        }
    });

    let deps = HandlerDeps {
        aggregator,
        sessions,
        users,
    };
    let handler = handlers::schema(deps);

    log::info!("✅ Bot is ready");

    let listener = Polling::builder(bot.clone()).drop_pending_updates().build();

    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("An error from the update listener"),
        )
        .await;

    log::info!("👋 Bot stopped");
    Ok(())
}
