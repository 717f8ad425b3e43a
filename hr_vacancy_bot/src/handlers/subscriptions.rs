use hr_bot_commons::is_member_of;
use html_escape::encode_text;
use teloxide::prelude::*;

use crate::{
    catalog::{self, FORM},
    error::{Error, HandlerResult},
    keyboards,
    tags::{hashtags_line, Tag},
};

use super::{replace_or_send, send_main_menu, App};

/// Whether the user has joined the channel. If Telegram won't say (the bot
/// isn't an admin there, say), they haven't.
pub async fn is_subscribed(bot: &Bot, app: &App, user: UserId) -> bool {
    match is_member_of(bot, user, app.config.channel.clone()).await {
        Ok(present) => present,
        Err(e) => {
            log::error!("Can't check channel membership of {user}: {e}");
            false
        }
    }
}

/// Whether `user` has to join the channel before using the bot.
/// Admins never do.
pub async fn must_subscribe(bot: &Bot, app: &App, user: UserId) -> bool {
    app.config.require_subscription
        && !app.is_admin(user)
        && !is_subscribed(bot, app, user).await
}

pub async fn send_gate(bot: &Bot, app: &App, chat: ChatId) -> HandlerResult {
    bot.send_message(
        chat,
        "📢 Чтобы пользоваться ботом, подпишитесь на наш канал с вакансиями.",
    )
    .reply_markup(keyboards::channel(app.config.channel_url.as_ref(), true))
    .await?;
    Ok(())
}

pub async fn check_subscription(
    bot: &Bot,
    app: &App,
    chat: ChatId,
    user: UserId,
) -> Result<Option<String>, Error> {
    if !is_subscribed(bot, app, user).await {
        return Ok(Some("Подписка пока не найдена.".to_string()));
    }
    send_main_menu(bot, app, chat, user).await?;
    Ok(Some("Спасибо за подписку!".to_string()))
}

pub async fn categories(bot: &Bot, chat: ChatId, message: Option<&Message>) -> HandlerResult {
    replace_or_send(
        bot,
        chat,
        message,
        "🏷 Выберите категорию. Новые вакансии с отмеченными тегами будут приходить сюда."
            .to_string(),
        keyboards::categories(),
    )
    .await
}

pub async fn category(
    bot: &Bot,
    app: &App,
    chat: ChatId,
    user: UserId,
    message: Option<&Message>,
    key: &str,
) -> Result<Option<String>, Error> {
    let Some(category) = catalog::category(key) else {
        return Ok(Some("Категория не найдена.".to_string()));
    };
    let tags = app.database.user_tags(user).await?;
    replace_or_send(
        bot,
        chat,
        message,
        format!("{}\n\nНажмите на тег, чтобы подписаться или отписаться.", category.title),
        keyboards::category_tags(category, &tags),
    )
    .await?;
    Ok(None)
}

pub async fn toggle_tag(
    bot: &Bot,
    app: &App,
    chat: ChatId,
    user: UserId,
    message: Option<&Message>,
    tag: &str,
) -> Result<Option<String>, Error> {
    let (Some(category), Some(tag)) = (catalog::category_of(tag), Tag::new(tag)) else {
        return Ok(Some("Такого тега нет.".to_string()));
    };

    let added = app.database.toggle_user_tag(user, &tag).await?;
    log::debug!("User {user} toggled #{tag}: {added}");

    if let Some(message) = message {
        let tags = app.database.user_tags(user).await?;
        bot.edit_message_reply_markup(chat, message.id)
            .reply_markup(keyboards::category_tags(category, &tags))
            .await?;
    }

    Ok(Some(match added {
        true => format!("✅ Подписка на #{tag}"),
        false => format!("❌ Отписка от #{tag}"),
    }))
}

pub async fn my_tags(
    bot: &Bot,
    app: &App,
    chat: ChatId,
    user: UserId,
    message: Option<&Message>,
) -> HandlerResult {
    let tags = app.database.user_tags(user).await?;
    let text = if tags.is_empty() {
        "У вас пока нет тегов. Выберите их, чтобы получать подходящие вакансии.".to_string()
    } else {
        format!(
            "⭐ <b>Ваши теги</b>\n\n{}",
            encode_text(&hashtags_line(&tags))
        )
    };
    replace_or_send(bot, chat, message, text, keyboards::my_tags(!tags.is_empty())).await
}

pub async fn clear_tags(
    bot: &Bot,
    app: &App,
    chat: ChatId,
    user: UserId,
    message: Option<&Message>,
) -> Result<Option<String>, Error> {
    let cleared = app.database.clear_user_tags(user).await?;
    log::debug!("User {user} cleared {cleared} tags");
    my_tags(bot, app, chat, user, message).await?;
    Ok(Some("Теги очищены.".to_string()))
}

pub async fn start_form(bot: &Bot, chat: ChatId) -> HandlerResult {
    let Some(keyboard) = keyboards::form_step(0) else {
        return Ok(());
    };
    bot.send_message(chat, FORM[0].question)
        .reply_markup(keyboard)
        .await?;
    Ok(())
}

pub async fn form_answer(
    bot: &Bot,
    app: &App,
    chat: ChatId,
    user: UserId,
    message: Option<&Message>,
    step: usize,
    option: &str,
) -> Result<Option<String>, Error> {
    let Some(option) = catalog::form_option(step, option) else {
        return Ok(Some("Эта кнопка устарела.".to_string()));
    };
    if let Some(tag) = option.tag.and_then(Tag::new) {
        app.database.add_user_tag(user, &tag).await?;
    }

    let next = step + 1;
    if let Some(keyboard) = keyboards::form_step(next) {
        replace_or_send(bot, chat, message, FORM[next].question.to_string(), keyboard).await?;
        return Ok(None);
    }

    let tags = app.database.user_tags(user).await?;
    let text = format!(
        concat!(
            "🎉 <b>Готово!</b>\n\nВаши теги: {}\n\n",
            "Подходящие вакансии будут приходить сюда, а все вакансии публикуются в канале."
        ),
        encode_text(&hashtags_line(&tags))
    );
    replace_or_send(
        bot,
        chat,
        message,
        text,
        keyboards::channel(app.config.channel_url.as_ref(), false),
    )
    .await?;
    Ok(None)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{json, Value};

    use super::*;
    use crate::{
        config::Config,
        database::Database,
        llm::ChatClient,
        testing::{error, fake_bot, ok},
    };

    async fn app(require_subscription: bool) -> App {
        let config = Config::from_sources(
            Some(&format!(
                "bot_token = \"t\"\nadmin_id = 100\nchannel = \"@jobs\"\nrequire_subscription = {require_subscription}\n"
            )),
            |_| None,
            None,
        )
        .unwrap();
        App {
            database: Arc::new(Database::new_in_memory().await.unwrap()),
            llm: ChatClient::new(config.llm.clone()),
            config,
        }
    }

    fn member(id: &Value, status: &str) -> Value {
        ok(json!({
            "user": {"id": id, "is_bot": false, "first_name": "Тест"},
            "status": status,
        }))
    }

    #[tokio::test]
    async fn gate_lets_members_through_and_fails_closed() {
        let (bot, seen) = fake_bot(|_, body| match body["user_id"].as_u64() {
            Some(1) => member(&body["user_id"], "member"),
            Some(2) => member(&body["user_id"], "left"),
            _ => error(400, "Bad Request: member list is inaccessible"),
        })
        .await;
        let gated = app(true).await;

        assert!(!must_subscribe(&bot, &gated, UserId(1)).await);
        assert!(must_subscribe(&bot, &gated, UserId(2)).await);
        assert!(must_subscribe(&bot, &gated, UserId(3)).await);
        assert_eq!(seen.lock().unwrap().len(), 3);

        // Neither of these asks Telegram.
        assert!(!must_subscribe(&bot, &gated, UserId(100)).await);
        assert!(!must_subscribe(&bot, &app(false).await, UserId(3)).await);
        assert_eq!(seen.lock().unwrap().len(), 3);
    }
}
