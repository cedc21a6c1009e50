//! Bot instance creation and command definitions.

use muzacore::core::config;
use reqwest::ClientBuilder;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase", description = "Я умею:")]
pub enum Command {
    #[command(description = "приветствие и краткая инструкция")]
    Start,
    #[command(description = "поиск музыки")]
    Search,
    #[command(description = "отменить текущий поиск")]
    Cancel,
    #[command(description = "статистика бота (только для администратора)")]
    Stats,
    #[command(description = "проверить доступность источников (только для администратора)")]
    Sources,
}

/// Creates the Bot instance with a long-upload-friendly HTTP client.
pub fn create_bot() -> anyhow::Result<Bot> {
    let token = config::BOT_TOKEN.clone();
    if token.is_empty() {
        anyhow::bail!("BOT_TOKEN (or TELOXIDE_TOKEN) is not set");
    }

    let client = ClientBuilder::new().timeout(config::network::upload_timeout()).build()?;
    Ok(Bot::with_client(token, client))
}

/// Publishes the command list to the Telegram UI.
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    bot.set_my_commands(Command::bot_commands()).await?;
    Ok(())
}
