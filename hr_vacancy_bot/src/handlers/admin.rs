use hr_bot_commons::useful_methods::MessageStuff;
use teloxide::{
    prelude::*,
    types::{ParseMode, User},
};

use crate::{
    broadcast::{broadcast_text, publish_vacancy, BroadcastReport},
    dialogue::{BotDialogue, State},
    error::{Error, HandlerResult},
    keyboards,
    misc::today,
};

use super::App;

pub async fn panel(bot: &Bot, app: &App, chat: ChatId) -> HandlerResult {
    let notify = app.database.notify_new_users().await?;
    bot.send_message(chat, "🛠 <b>Админ-панель</b>")
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboards::admin_panel(notify))
        .await?;
    Ok(())
}

pub async fn stats(bot: &Bot, app: &App, chat: ChatId) -> HandlerResult {
    let stats = app.database.stats(today()).await?;
    bot.send_message(chat, stats.to_string())
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

/// Flip the new user notification setting and refresh the panel's button.
pub async fn toggle_notify(
    bot: &Bot,
    app: &App,
    chat: ChatId,
    message: Option<&Message>,
) -> Result<Option<String>, Error> {
    let enabled = app.database.toggle_notify_new_users().await?;
    if let Some(message) = message {
        bot.edit_message_reply_markup(chat, message.id)
            .reply_markup(keyboards::admin_panel(enabled))
            .await?;
    }
    Ok(Some(
        match enabled {
            true => "Уведомления о новых пользователях включены.",
            false => "Уведомления о новых пользователях выключены.",
        }
        .to_string(),
    ))
}

pub async fn start_broadcast(bot: &Bot, dialogue: &BotDialogue, chat: ChatId) -> HandlerResult {
    bot.send_message(
        chat,
        concat!(
            "📣 Отправьте текст рассылки.\n\n",
            "Он уйдёт в канал и подписчикам, чьи теги совпадут с #хэштегами ",
            "и ключевыми словами текста."
        ),
    )
    .reply_markup(keyboards::cancel())
    .await?;
    dialogue.update(State::AwaitingBroadcast).await?;
    Ok(())
}

async fn send_report(bot: &Bot, chat: ChatId, report: BroadcastReport) -> HandlerResult {
    bot.send_message(chat, report.to_string())
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

pub async fn broadcast_message(
    bot: &Bot,
    message: &Message,
    user: &User,
    dialogue: &BotDialogue,
    app: &App,
) -> HandlerResult {
    if !app.is_admin(user.id) {
        dialogue.exit().await?;
        return Ok(());
    }
    let Some(text) = message.text_full() else {
        bot.send_message(message.chat.id, "Нужен текст. Попробуйте ещё раз или /cancel.")
            .await?;
        return Ok(());
    };

    dialogue.exit().await?;
    log::info!("Admin broadcast of {} characters", text.chars().count());
    let report = broadcast_text(bot, &app.database, &app.config, text).await?;
    send_report(bot, message.chat.id, report).await
}

/// `/post <text>`, the same as the broadcast button but in one message.
pub async fn post_command(bot: &Bot, app: &App, chat: ChatId, params: &str) -> HandlerResult {
    if params.is_empty() {
        bot.send_message(chat, "Использование: <code>/post текст рассылки</code>")
            .parse_mode(ParseMode::Html)
            .await?;
        return Ok(());
    }
    let report = broadcast_text(bot, &app.database, &app.config, params).await?;
    send_report(bot, chat, report).await
}

pub async fn publish(bot: &Bot, app: &App, chat: ChatId, id: i64) -> HandlerResult {
    let Some(vacancy) = app.database.vacancy(id).await? else {
        bot.send_message(chat, "Вакансия не найдена.").await?;
        return Ok(());
    };
    log::info!("Publishing vacancy {id}");
    bot.send_message(chat, "⏳ Публикую…").await?;
    let report = publish_vacancy(bot, &app.database, &app.config, &vacancy).await?;
    send_report(bot, chat, report).await
}
