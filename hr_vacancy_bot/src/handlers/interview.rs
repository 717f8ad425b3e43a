use hr_bot_commons::useful_methods::BotStuff;
use html_escape::encode_text;
use teloxide::{prelude::*, types::User};

use crate::{
    dialogue::{BotDialogue, State},
    error::{Error, HandlerResult},
    interview::{is_final, position_title, InterviewSession, FIRST_QUESTION},
    keyboards,
    misc::user_name_prettyprint,
};

use super::App;

const UNAVAILABLE: &str = "Собеседования сейчас недоступны.";

pub async fn positions(bot: &Bot, app: &App, chat: ChatId) -> HandlerResult {
    if !app.llm.is_configured() {
        bot.send_message(chat, UNAVAILABLE).await?;
        return Ok(());
    }
    bot.send_message(chat, "🎤 На какую вакансию вы хотите пройти собеседование?")
        .reply_markup(keyboards::interview_positions())
        .await?;
    Ok(())
}

async fn start(
    bot: &Bot,
    dialogue: &BotDialogue,
    app: &App,
    chat: ChatId,
    position: String,
) -> Result<Option<String>, Error> {
    if !app.llm.is_configured() {
        return Ok(Some(UNAVAILABLE.to_string()));
    }

    bot.send_message(
        chat,
        format!(
            concat!(
                "🎤 Собеседование на вакансию «{}».\n",
                "Отвечайте на вопросы обычными сообщениями, /cancel прервёт собеседование.\n\n{}"
            ),
            position, FIRST_QUESTION
        ),
    )
    .await?;
    dialogue
        .update(State::Interview(InterviewSession::new(position)))
        .await?;
    Ok(None)
}

pub async fn start_with_position(
    bot: &Bot,
    dialogue: &BotDialogue,
    app: &App,
    chat: ChatId,
    key: &str,
) -> Result<Option<String>, Error> {
    let Some(title) = position_title(key) else {
        return Ok(Some("Вакансия не найдена.".to_string()));
    };
    start(bot, dialogue, app, chat, title.to_string()).await
}

pub async fn start_with_vacancy(
    bot: &Bot,
    dialogue: &BotDialogue,
    app: &App,
    chat: ChatId,
    id: i64,
) -> Result<Option<String>, Error> {
    let Some(vacancy) = app.database.vacancy(id).await? else {
        return Ok(Some("Вакансия не найдена.".to_string()));
    };
    start(bot, dialogue, app, chat, vacancy.title).await
}

pub async fn reply(
    bot: &Bot,
    message: &Message,
    user: &User,
    dialogue: &BotDialogue,
    app: &App,
    mut session: InterviewSession,
) -> HandlerResult {
    let chat = message.chat.id;
    let Some(text) = message.text() else {
        bot.send_message(chat, "Пожалуйста, отвечайте текстом.").await?;
        return Ok(());
    };

    // Not a big deal if this fails.
    let _ = bot.typing(chat).await;

    session.push_user(text);
    let answer = match app.llm.complete(&session.request()).await {
        Ok(answer) => answer,
        Err(e) => {
            log::warn!("Interview with {} stalled: {e}", user.id);
            session.pop_user();
            dialogue.update(State::Interview(session)).await?;
            bot.send_message(
                chat,
                "Не получилось получить ответ. Попробуйте отправить сообщение ещё раз чуть позже.",
            )
            .await?;
            return Ok(());
        }
    };
    session.push_assistant(&answer);
    bot.send_html_chunked(chat.into(), &encode_text(&answer), None)
        .await?;

    if !is_final(&answer) {
        dialogue.update(State::Interview(session)).await?;
        return Ok(());
    }

    dialogue.exit().await?;
    log::info!("Interview with {} finished", user.id);
    let summary = format!(
        "🎤 <b>Итог собеседования</b>\nКандидат: {}\nВакансия: {}\n\n{}",
        user_name_prettyprint(user, true),
        encode_text(&session.position),
        encode_text(&answer)
    );
    if let Err(e) = bot
        .send_html_chunked(app.config.admin_id.into(), &summary, None)
        .await
    {
        log::error!("Failed to send interview summary to the admin: {e}");
    }
    bot.send_message(chat, "Спасибо! Мы свяжемся с вами.")
        .reply_markup(keyboards::main_menu(app.is_admin(user.id), true))
        .await?;
    Ok(())
}
