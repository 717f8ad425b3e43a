use chrono::Utc;
use hr_bot_commons::useful_methods::{BotStuff, MessageStuff};
use html_escape::encode_text;
use teloxide::{
    prelude::*,
    types::{FileId, InputFile, ParseMode, User},
};

use crate::{
    dialogue::{BotDialogue, State},
    error::HandlerResult,
    keyboards,
    tags::hashtags_line,
    wizard::{Advance, Input, Mode, Wizard},
};

use super::App;

/// How many vacancies the list shows.
const LIST_LIMIT: u32 = 50;

pub async fn show_list(bot: &Bot, app: &App, chat: ChatId, is_admin: bool) -> HandlerResult {
    let vacancies = app.database.vacancy_titles(LIST_LIMIT).await?;
    let text = if vacancies.is_empty() {
        "Пока вакансий нет. Подпишитесь на теги, чтобы не пропустить новые."
    } else {
        "📋 <b>Вакансии</b>"
    };
    bot.send_message(chat, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboards::vacancy_list(&vacancies, is_admin))
        .await?;
    Ok(())
}

/// Send the vacancy card, with its photo if it has one.
/// Returns a notice if the vacancy is gone.
pub async fn show(
    bot: &Bot,
    app: &App,
    chat: ChatId,
    id: i64,
    is_admin: bool,
) -> Result<Option<String>, crate::error::Error> {
    let Some(vacancy) = app.database.vacancy(id).await? else {
        return Ok(Some("Вакансия не найдена.".to_string()));
    };
    let keyboard = keyboards::vacancy_actions(id, is_admin, app.llm.is_configured());

    let caption = vacancy.caption_html("");
    match (&vacancy.image_id, caption) {
        (Some(image), Some(caption)) => {
            bot.send_photo(chat, InputFile::file_id(FileId(image.clone())))
                .caption(caption)
                .parse_mode(ParseMode::Html)
                .reply_markup(keyboard)
                .await?;
        }
        (image, _) => {
            if let Some(image) = image {
                bot.send_photo(chat, InputFile::file_id(FileId(image.clone())))
                    .await?;
            }
            bot.send_html_chunked(chat.into(), &vacancy.card_html(), Some(keyboard))
                .await?;
        }
    }
    Ok(None)
}

pub async fn start_wizard(
    bot: &Bot,
    dialogue: &BotDialogue,
    chat: ChatId,
    mode: Mode,
) -> HandlerResult {
    let wizard = Wizard::new(mode);
    bot.send_message(chat, wizard.prompt())
        .reply_markup(keyboards::cancel())
        .await?;
    dialogue.update(State::Wizard(wizard)).await?;
    Ok(())
}

pub async fn wizard_step(
    bot: &Bot,
    message: &Message,
    user: &User,
    dialogue: &BotDialogue,
    app: &App,
    wizard: Wizard,
) -> HandlerResult {
    let chat = message.chat.id;
    if !app.is_admin(user.id) {
        dialogue.exit().await?;
        return Ok(());
    }

    let input = if let Some(photo) = message.find_biggest_photo() {
        Input::Photo(&photo.file.id.0)
    } else if let Some(text) = message.text() {
        Input::Text(text)
    } else {
        Input::Other
    };

    let (mode, draft) = match wizard.advance(input) {
        Advance::Next(wizard) => {
            bot.send_message(chat, wizard.prompt())
                .reply_markup(keyboards::cancel())
                .await?;
            dialogue.update(State::Wizard(wizard)).await?;
            return Ok(());
        }
        Advance::Retry(wizard, problem) => {
            bot.send_message(chat, format!("{problem}\n\n{}", wizard.prompt()))
                .reply_markup(keyboards::cancel())
                .await?;
            dialogue.update(State::Wizard(wizard)).await?;
            return Ok(());
        }
        Advance::Done(mode, draft) => (mode, draft),
    };

    dialogue.exit().await?;
    let tags = draft.tags();
    let tags_line = if tags.is_empty() {
        "Теги не найдены, вакансию увидят только в канале.".to_string()
    } else {
        format!("Теги: {}", encode_text(&hashtags_line(&tags)))
    };

    let (id, text) = match mode {
        Mode::Add => {
            let id = app.database.add_vacancy(&draft, &tags, Utc::now()).await?;
            log::info!("Admin added vacancy {id}");
            (id, format!("✅ Вакансия сохранена.\n{tags_line}"))
        }
        Mode::Edit(id) => {
            if !app.database.update_vacancy(id, &draft, &tags).await? {
                bot.send_message(chat, "Эту вакансию уже удалили.").await?;
                return Ok(());
            }
            log::info!("Admin edited vacancy {id}");
            (id, format!("✏️ Вакансия обновлена.\n{tags_line}"))
        }
    };

    bot.send_message(chat, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboards::publish_prompt(id))
        .await?;
    Ok(())
}

pub async fn ask_delete(
    bot: &Bot,
    app: &App,
    chat: ChatId,
    id: i64,
) -> Result<Option<String>, crate::error::Error> {
    let Some(vacancy) = app.database.vacancy(id).await? else {
        return Ok(Some("Вакансия не найдена.".to_string()));
    };
    bot.send_message(
        chat,
        format!("🗑 Удалить вакансию «{}»?", encode_text(&vacancy.title)),
    )
    .parse_mode(ParseMode::Html)
    .reply_markup(keyboards::confirm_delete(id))
    .await?;
    Ok(None)
}

pub async fn delete(
    bot: &Bot,
    app: &App,
    chat: ChatId,
    id: i64,
) -> Result<Option<String>, crate::error::Error> {
    let notice = if app.database.delete_vacancy(id).await? {
        log::info!("Admin deleted vacancy {id}");
        "Вакансия удалена."
    } else {
        "Вакансия уже удалена."
    };
    show_list(bot, app, chat, true).await?;
    Ok(Some(notice.to_string()))
}
