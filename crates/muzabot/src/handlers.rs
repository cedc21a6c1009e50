//! Dispatcher schema and handlers: commands, free-text search, and the
//! paging/download callbacks.

use std::sync::Arc;

use muzacore::core::config;
use muzacore::{Aggregator, FetchError, SearchSession, SessionStore, UserRegistry};
use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::{InputFile, MessageId, ParseMode};
use teloxide::utils::html;

use crate::bot::Command;
use crate::keyboard;

pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;
pub type HandlerResult = Result<(), HandlerError>;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct HandlerDeps {
    pub aggregator: Arc<Aggregator>,
    pub sessions: Arc<SessionStore>,
    pub users: Arc<UserRegistry>,
}

/// The complete handler tree. The same schema serves production and
/// integration tests.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_commands = deps.clone();
    let deps_messages = deps.clone();
    let deps_callbacks = deps;

    dptree::entry()
        .branch(command_handler(deps_commands))
        .branch(message_handler(deps_messages))
        .branch(callback_handler(deps_callbacks))
}

fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter_command::<Command>()
        .endpoint(move |bot: Bot, msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move { handle_command(&bot, &msg, cmd, &deps).await }
        })
}

fn message_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| {
            msg.text()
                .map(|text| !text.trim().is_empty() && !text.starts_with('/'))
                .unwrap_or(false)
        })
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move { handle_search_message(&bot, &msg, &deps).await }
        })
}

fn callback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let deps = deps.clone();
        async move { handle_callback(&bot, q, &deps).await }
    })
}

fn touch_user(deps: &HandlerDeps, msg: &Message) {
    if let Some(user) = msg.from.as_ref() {
        let user_id = i64::try_from(user.id.0).unwrap_or(0);
        let is_new = deps
            .users
            .touch(user_id, user.username.as_deref(), Some(&user.first_name));
        if is_new {
            log::info!(
                "New user: {} (@{}) - {}",
                user_id,
                user.username.as_deref().unwrap_or("-"),
                user.first_name
            );
        }
    }
}

async fn handle_command(bot: &Bot, msg: &Message, cmd: Command, deps: &HandlerDeps) -> HandlerResult {
    let chat_id = msg.chat.id;

    match cmd {
        Command::Start => {
            touch_user(deps, msg);
            bot.send_message(
                chat_id,
                "🎵 <b>Привет! Я Muza</b>\n\n\
                 💫 Я помогу тебе найти и скачать любую музыку\n\n\
                 ✨ Просто отправь мне название песни или исполнителя!",
            )
            .parse_mode(ParseMode::Html)
            .await?;
        }
        Command::Search => {
            bot.send_message(
                chat_id,
                "🔍 <b>Поиск музыки</b>\n\nОтправь название песни или исполнителя:",
            )
            .parse_mode(ParseMode::Html)
            .await?;
        }
        Command::Cancel => {
            if deps.sessions.clear(chat_id.0) {
                bot.send_message(chat_id, "✅ Операция отменена").await?;
            } else {
                bot.send_message(chat_id, "❌ Нечего отменять").await?;
            }
        }
        Command::Stats => {
            handle_stats(bot, msg, deps).await?;
        }
        Command::Sources => {
            handle_sources(bot, msg, deps).await?;
        }
    }

    Ok(())
}

/// Admin-only source availability probe. Also lifts the primary-source
/// degradation flag so the next search tries YouTube again.
async fn handle_sources(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> HandlerResult {
    let chat_id = msg.chat.id;
    let user_id = msg.from.as_ref().and_then(|u| i64::try_from(u.id.0).ok()).unwrap_or(0);

    if !config::admin::is_admin(user_id) {
        bot.send_message(chat_id, "❌ У вас нет доступа к этой команде").await?;
        return Ok(());
    }

    let probe_msg = bot.send_message(chat_id, "🔄 Проверяю источники...").await?;

    deps.aggregator.health().reset();
    let statuses = deps.aggregator.probe_sources().await;

    let mut text = "📡 <b>Статус источников</b>\n\n".to_string();
    for (kind, usable) in statuses {
        let mark = if usable { "✅" } else { "❌" };
        text.push_str(&format!("{} {} {}\n", mark, kind.emoji(), kind));
    }

    bot.edit_message_text(chat_id, probe_msg.id, text)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

/// Admin-only user statistics.
async fn handle_stats(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> HandlerResult {
    let chat_id = msg.chat.id;
    let user_id = msg.from.as_ref().and_then(|u| i64::try_from(u.id.0).ok()).unwrap_or(0);

    log::info!("Stats requested by user {}", user_id);

    if !config::admin::is_admin(user_id) {
        log::warn!("Denied /stats for user {}", user_id);
        bot.send_message(chat_id, "❌ У вас нет доступа к этой команде").await?;
        return Ok(());
    }

    let total = deps.users.count();
    let recent = deps.users.recent(10);

    let mut text = format!(
        "📊 <b>Статистика бота</b>\n\n👥 <b>Всего пользователей:</b> {}\n",
        total
    );

    if !recent.is_empty() {
        text.push_str(&format!(
            "\n📋 <b>Последние {} пользователей:</b>\n\n",
            recent.len()
        ));
        for (idx, record) in recent.iter().enumerate() {
            let username = record
                .username
                .as_deref()
                .map(|u| format!("@{}", u))
                .unwrap_or_else(|| "Нет username".to_string());
            let first_name = record.first_name.as_deref().unwrap_or("Без имени");
            text.push_str(&format!(
                "{}. <b>{}</b> ({})\n   ID: <code>{}</code>\n   Присоединился: {}\n\n",
                idx + 1,
                html::escape(first_name),
                html::escape(&username),
                record.user_id,
                record.joined.format("%d.%m.%Y"),
            ));
        }
    }

    bot.send_message(chat_id, text).parse_mode(ParseMode::Html).await?;
    Ok(())
}

/// Free-text message → search across all sources → first results page.
async fn handle_search_message(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> HandlerResult {
    let Some(query) = msg.text().map(|t| t.trim().to_string()) else {
        return Ok(());
    };
    touch_user(deps, msg);

    let chat_id = msg.chat.id;
    log::info!("Search '{}' from chat {}", query, chat_id);

    let search_msg = bot.send_message(chat_id, "🔍 Ищу музыку...").await?;

    let results = deps.aggregator.search(&query, config::search::OVERALL_LIMIT).await;

    if results.is_empty() {
        // Distinguish "nothing matched" from "the sources are down"
        let text = if results.degraded() {
            "⚠️ Источники музыки сейчас недоступны\n\nПопробуй ещё раз через пару минут"
        } else {
            "❌ Ничего не найдено\n\nПопробуй изменить запрос или используй /search для нового поиска"
        };
        bot.edit_message_text(chat_id, search_msg.id, text).await?;
        return Ok(());
    }

    let session = SearchSession::new(&query, results.tracks);
    deps.sessions.start(chat_id.0, session.clone());

    show_results_page(bot, chat_id, search_msg.id, &session).await
}

async fn show_results_page(bot: &Bot, chat_id: ChatId, message_id: MessageId, session: &SearchSession) -> HandlerResult {
    bot.edit_message_text(chat_id, message_id, keyboard::page_text(session))
        .reply_markup(keyboard::results_keyboard(session))
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

async fn handle_callback(bot: &Bot, q: CallbackQuery, deps: &HandlerDeps) -> HandlerResult {
    let Some(data) = q.data.clone() else {
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    };
    let Some((chat_id, message_id)) = q.message.as_ref().map(|m| (m.chat().id, m.id())) else {
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    };

    if data == "cancel" {
        deps.sessions.clear(chat_id.0);
        bot.answer_callback_query(q.id).await?;
        bot.edit_message_text(chat_id, message_id, "✅ Поиск отменен").await?;
    } else if data == "page:info" {
        bot.answer_callback_query(q.id)
            .text("ℹ️ Используй кнопки для навигации")
            .await?;
    } else if let Some(page) = data.strip_prefix("page:").and_then(|p| p.parse::<usize>().ok()) {
        match deps.sessions.set_page(chat_id.0, page) {
            Some(session) => {
                bot.answer_callback_query(q.id).await?;
                show_results_page(bot, chat_id, message_id, &session).await?;
            }
            None => {
                bot.answer_callback_query(q.id)
                    .text("❌ Треки не найдены")
                    .show_alert(true)
                    .await?;
            }
        }
    } else if let Some(index) = data.strip_prefix("dl:").and_then(|i| i.parse::<usize>().ok()) {
        bot.answer_callback_query(q.id).text("⏳ Скачиваю...").await?;
        handle_download(bot, chat_id, message_id, index, deps).await?;
    } else {
        log::warn!("Unknown callback data: {}", data);
        bot.answer_callback_query(q.id).await?;
    }

    Ok(())
}

/// Fetch the selected track and deliver it as an audio message.
async fn handle_download(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    index: usize,
    deps: &HandlerDeps,
) -> HandlerResult {
    let Some(track) = deps.sessions.track(chat_id.0, index) else {
        bot.edit_message_text(chat_id, message_id, "❌ Трек не найден").await?;
        deps.sessions.clear(chat_id.0);
        return Ok(());
    };

    log::info!("Downloading '{}' ({}) for chat {}", track.title, track.locator, chat_id);

    edit_progress(bot, chat_id, message_id, &track.title, &track.duration, 25, "Скачивание...").await?;

    match deps.aggregator.fetch(&track).await {
        Ok(bytes) => {
            let size = bytes.len() as u64;
            log::info!(
                "Track downloaded: '{}', {:.2} MB",
                track.title,
                size as f64 / 1024.0 / 1024.0
            );

            // Telegram refuses bot uploads above 50 MB, so tell the user
            // instead of burning the upload on a guaranteed API error.
            if size > config::validation::MAX_AUDIO_SIZE_BYTES {
                log::warn!("Track too large for Telegram: '{}' ({} bytes)", track.title, size);
                bot.edit_message_text(
                    chat_id,
                    message_id,
                    "❌ <b>Файл слишком большой!</b>\n\n\
                     📦 Размер файла превышает лимит Telegram (50 МБ)\n\n\
                     💡 <b>Попробуй:</b>\n\
                     • Выбрать другую версию трека\n\
                     • Найти короткую версию песни",
                )
                .parse_mode(ParseMode::Html)
                .await?;
                deps.sessions.clear(chat_id.0);
                return Ok(());
            }

            edit_progress(bot, chat_id, message_id, &track.title, &track.duration, 75, "Отправка...").await?;

            let audio = InputFile::memory(bytes).file_name(format!("{}.mp3", track.full_name()));
            bot.send_audio(chat_id, audio)
                .title(track.title.clone())
                .performer(track.artist.clone())
                .caption(format!(
                    "🎵 <b>{}</b>\n👤 <i>{}</i>\n⏱ {}\n\n{} Источник: {}",
                    html::escape(&track.title),
                    html::escape(&track.artist),
                    track.duration,
                    track.source.emoji(),
                    track.source,
                ))
                .parse_mode(ParseMode::Html)
                .await?;

            let _ = bot.delete_message(chat_id, message_id).await;
            deps.sessions.clear(chat_id.0);
            log::info!("Track sent to chat {}: '{}'", chat_id, track.title);
        }
        Err(error) => {
            log::error!("Failed to fetch '{}': {}", track.title, error);
            let text = match &error {
                FetchError::Unavailable(_) => {
                    "❌ <b>Трек недоступен</b>\n\n\
                     Возможно он приватный, удалён или заблокирован в твоём регионе"
                }
                FetchError::AttemptsExhausted { .. } => {
                    "❌ <b>Источник заблокировал скачивание</b>\n\n\
                     💡 <b>Попробуй:</b>\n\
                     • Выбрать другой трек из списка\n\
                     • Выполнить новый поиск\n\
                     • Попробовать позже"
                }
                _ => {
                    "❌ <b>Произошла ошибка</b>\n\n\
                     Попробуй выбрать другой трек или выполни новый поиск"
                }
            };
            bot.edit_message_text(chat_id, message_id, text)
                .parse_mode(ParseMode::Html)
                .await?;
            deps.sessions.clear(chat_id.0);
        }
    }

    Ok(())
}

/// Ten-cell progress bar like "🟦🟦⬜⬜⬜⬜⬜⬜⬜⬜".
fn progress_bar(percent: u8) -> String {
    let filled = usize::from(percent.min(100)) / 10;
    format!("{}{}", "🟦".repeat(filled), "⬜".repeat(10 - filled))
}

async fn edit_progress(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    title: &str,
    duration: &str,
    percent: u8,
    stage: &str,
) -> HandlerResult {
    bot.edit_message_text(
        chat_id,
        message_id,
        format!(
            "{} {}%\n📥 <b>{}</b>\n\n🎵 {}\n⏱ {}",
            progress_bar(percent),
            percent,
            stage,
            html::escape(title),
            duration
        ),
    )
    .parse_mode(ParseMode::Html)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_bar_fill_levels() {
        assert_eq!(progress_bar(0), "⬜⬜⬜⬜⬜⬜⬜⬜⬜⬜");
        assert_eq!(progress_bar(25), "🟦🟦⬜⬜⬜⬜⬜⬜⬜⬜");
        assert_eq!(progress_bar(75), "🟦🟦🟦🟦🟦🟦🟦⬜⬜⬜");
        assert_eq!(progress_bar(100), "🟦🟦🟦🟦🟦🟦🟦🟦🟦🟦");
    }

    #[test]
    fn test_progress_bar_clamps_over_100() {
        assert_eq!(progress_bar(250), progress_bar(100));
    }
}
