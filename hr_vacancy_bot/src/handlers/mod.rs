use std::sync::Arc;

use teloxide::{
    dispatching::{dialogue::InMemStorage, HandlerExt, UpdateFilterExt, UpdateHandler},
    prelude::*,
    types::{InlineKeyboardMarkup, Me, ParseMode, User},
};

use crate::{
    config::Config,
    database::Database,
    dialogue::{BotDialogue, State},
    error::{Error, HandlerResult},
    keyboards::{self, CallbackData},
    llm::ChatClient,
    misc::{today, user_name_prettyprint},
    wizard::Mode,
};

use self::commands::{generate_help, parse_command};
pub use self::commands::generate_bot_commands;

pub mod admin;
pub mod commands;
pub mod interview;
pub mod subscriptions;
pub mod vacancies;

/// Everything handlers need besides the bot and the update.
pub struct App {
    pub database: Arc<Database>,
    pub config: Config,
    pub llm: ChatClient,
}

impl App {
    pub fn is_admin(&self, user: UserId) -> bool {
        self.config.is_admin(user)
    }
}

pub fn schema() -> UpdateHandler<Error> {
    dptree::entry()
        .branch(
            Update::filter_message()
                .enter_dialogue::<Message, InMemStorage<State>, State>()
                .endpoint(handle_message),
        )
        .branch(
            Update::filter_callback_query()
                .enter_dialogue::<CallbackQuery, InMemStorage<State>, State>()
                .endpoint(handle_callback_query),
        )
}

/// Edit `message` in place if it's a text message, otherwise send a new one.
/// Photo messages can't be edited into text ones.
pub(crate) async fn replace_or_send(
    bot: &Bot,
    chat: ChatId,
    message: Option<&Message>,
    text: String,
    keyboard: InlineKeyboardMarkup,
) -> HandlerResult {
    if let Some(message) = message.filter(|m| m.text().is_some()) {
        bot.edit_message_text(chat, message.id, text)
            .parse_mode(ParseMode::Html)
            .reply_markup(keyboard)
            .await?;
    } else {
        bot.send_message(chat, text)
            .parse_mode(ParseMode::Html)
            .reply_markup(keyboard)
            .await?;
    }
    Ok(())
}

pub(crate) async fn send_main_menu(
    bot: &Bot,
    app: &App,
    chat: ChatId,
    user: UserId,
) -> HandlerResult {
    bot.send_message(
        chat,
        concat!(
            "👋 Здесь публикуются вакансии.\n\n",
            "Смотрите список, подписывайтесь на теги или пройдите короткий подбор, ",
            "и новые подходящие вакансии будут приходить сюда."
        ),
    )
    .reply_markup(keyboards::main_menu(app.is_admin(user), app.llm.is_configured()))
    .await?;
    Ok(())
}

async fn start(bot: &Bot, user: &User, dialogue: &BotDialogue, app: &App) -> HandlerResult {
    dialogue.exit().await?;
    let chat = ChatId::from(user.id);
    let is_admin = app.is_admin(user.id);

    let is_new = app.database.register_user(user.id, today()).await?;
    if is_new && !is_admin && app.database.notify_new_users().await? {
        log::debug!("New user {}", user.id);
        // Not worth failing the greeting over.
        if let Err(e) = bot
            .send_message(
                app.config.admin_id,
                format!("👤 Новый пользователь: {}", user_name_prettyprint(user, true)),
            )
            .parse_mode(ParseMode::Html)
            .await
        {
            log::warn!("Failed to tell the admin about a new user: {e}");
        }
    }

    if subscriptions::must_subscribe(bot, app, user.id).await {
        return subscriptions::send_gate(bot, app, chat).await;
    }

    send_main_menu(bot, app, chat, user.id).await
}

async fn cancel(
    bot: &Bot,
    chat: ChatId,
    user: UserId,
    dialogue: &BotDialogue,
    app: &App,
) -> HandlerResult {
    let was_busy = !matches!(dialogue.get().await?, None | Some(State::Idle));
    dialogue.exit().await?;
    if was_busy {
        bot.send_message(chat, "❌ Отменено.").await?;
    }
    send_main_menu(bot, app, chat, user).await
}

async fn handle_command(
    bot: &Bot,
    user: &User,
    dialogue: &BotDialogue,
    app: &App,
    command: &str,
    params: &str,
) -> HandlerResult {
    let chat = ChatId::from(user.id);
    let is_admin = app.is_admin(user.id);

    match (command, is_admin) {
        ("/start", _) => start(bot, user, dialogue, app).await?,
        ("/cancel", _) => cancel(bot, chat, user.id, dialogue, app).await?,
        ("/vacancies", _) => vacancies::show_list(bot, app, chat, is_admin).await?,
        ("/tags", _) => subscriptions::my_tags(bot, app, chat, user.id, None).await?,
        ("/interview", _) => interview::positions(bot, app, chat).await?,
        ("/admin", true) => admin::panel(bot, app, chat).await?,
        ("/stats", true) => admin::stats(bot, app, chat).await?,
        ("/post", true) => admin::post_command(bot, app, chat, params).await?,
        // "/help" and anything unknown.
        _ => {
            bot.send_message(chat, generate_help(is_admin))
                .parse_mode(ParseMode::Html)
                .await?;
        }
    }
    Ok(())
}

pub async fn handle_message(
    bot: Bot,
    me: Me,
    message: Message,
    dialogue: BotDialogue,
    app: Arc<App>,
) -> HandlerResult {
    // Everything happens in DMs, the channel is only posted to.
    if !message.chat.is_private() {
        return Ok(());
    }
    let Some(user) = message.from.clone() else {
        return Ok(());
    };

    let command = message
        .text()
        .and_then(|text| parse_command(text, me.username()));

    // /start registers the user first and gates on its own.
    if !matches!(&command, Some((name, _)) if name == "/start")
        && subscriptions::must_subscribe(&bot, &app, user.id).await
    {
        return subscriptions::send_gate(&bot, &app, message.chat.id).await;
    }

    if let Some((command, params)) = command {
        log::debug!("Command {command} from {}", user.id);
        return handle_command(&bot, &user, &dialogue, &app, &command, params).await;
    }

    match dialogue.get().await?.unwrap_or_default() {
        State::Idle => send_main_menu(&bot, &app, message.chat.id, user.id).await,
        State::Wizard(wizard) => {
            vacancies::wizard_step(&bot, &message, &user, &dialogue, &app, wizard).await
        }
        State::AwaitingBroadcast => {
            admin::broadcast_message(&bot, &message, &user, &dialogue, &app).await
        }
        State::Interview(session) => {
            interview::reply(&bot, &message, &user, &dialogue, &app, session).await
        }
    }
}

pub async fn handle_callback_query(
    bot: Bot,
    query: CallbackQuery,
    dialogue: BotDialogue,
    app: Arc<App>,
) -> HandlerResult {
    let user = &query.from;
    let chat = ChatId::from(user.id);
    let message = query.message.as_ref().and_then(|m| m.regular_message());
    let is_admin = app.is_admin(user.id);

    let Some(data) = query
        .data
        .as_deref()
        .and_then(|data| data.parse::<CallbackData>().ok())
    else {
        log::debug!("Unknown callback data: {:?}", query.data);
        bot.answer_callback_query(query.id.clone()).await?;
        return Ok(());
    };

    if data.is_admin_only() && !is_admin {
        log::warn!("User {} pressed an admin button: {data}", user.id);
        bot.answer_callback_query(query.id.clone())
            .text("Это только для администратора.")
            .await?;
        return Ok(());
    }

    if data != CallbackData::CheckSubscription
        && subscriptions::must_subscribe(&bot, &app, user.id).await
    {
        bot.answer_callback_query(query.id.clone())
            .text("Сначала подпишитесь на канал.")
            .await?;
        return subscriptions::send_gate(&bot, &app, chat).await;
    }

    // Some buttons answer with a short popup notice.
    let notice: Option<String> = match data {
        CallbackData::Menu => {
            send_main_menu(&bot, &app, chat, user.id).await?;
            None
        }
        CallbackData::Cancel => {
            cancel(&bot, chat, user.id, &dialogue, &app).await?;
            None
        }
        CallbackData::Vacancies => {
            vacancies::show_list(&bot, &app, chat, is_admin).await?;
            None
        }
        CallbackData::Vacancy(id) => vacancies::show(&bot, &app, chat, id, is_admin).await?,
        CallbackData::AddVacancy => {
            vacancies::start_wizard(&bot, &dialogue, chat, Mode::Add).await?;
            None
        }
        CallbackData::EditVacancy(id) => {
            if app.database.vacancy(id).await?.is_some() {
                vacancies::start_wizard(&bot, &dialogue, chat, Mode::Edit(id)).await?;
                None
            } else {
                Some("Вакансия не найдена.".to_string())
            }
        }
        CallbackData::DeleteVacancy(id) => vacancies::ask_delete(&bot, &app, chat, id).await?,
        CallbackData::ConfirmDelete(id) => vacancies::delete(&bot, &app, chat, id).await?,
        CallbackData::Publish(id) => {
            // Broadcasts take a while, don't leave the button spinning.
            bot.answer_callback_query(query.id.clone()).await?;
            return admin::publish(&bot, &app, chat, id).await;
        }
        CallbackData::AdminPanel => {
            admin::panel(&bot, &app, chat).await?;
            None
        }
        CallbackData::Stats => {
            admin::stats(&bot, &app, chat).await?;
            None
        }
        CallbackData::ToggleNotify => admin::toggle_notify(&bot, &app, chat, message).await?,
        CallbackData::Broadcast => {
            admin::start_broadcast(&bot, &dialogue, chat).await?;
            None
        }
        CallbackData::Categories => {
            subscriptions::categories(&bot, chat, message).await?;
            None
        }
        CallbackData::Category(key) => {
            subscriptions::category(&bot, &app, chat, user.id, message, &key).await?
        }
        CallbackData::ToggleTag(tag) => {
            subscriptions::toggle_tag(&bot, &app, chat, user.id, message, &tag).await?
        }
        CallbackData::MyTags => {
            subscriptions::my_tags(&bot, &app, chat, user.id, message).await?;
            None
        }
        CallbackData::ClearTags => {
            subscriptions::clear_tags(&bot, &app, chat, user.id, message).await?
        }
        CallbackData::StartForm => {
            subscriptions::start_form(&bot, chat).await?;
            None
        }
        CallbackData::FormAnswer { step, option } => {
            subscriptions::form_answer(&bot, &app, chat, user.id, message, step, &option).await?
        }
        CallbackData::CheckSubscription => {
            subscriptions::check_subscription(&bot, &app, chat, user.id).await?
        }
        CallbackData::Interviews => {
            interview::positions(&bot, &app, chat).await?;
            None
        }
        CallbackData::InterviewPosition(key) => {
            interview::start_with_position(&bot, &dialogue, &app, chat, &key).await?
        }
        CallbackData::InterviewVacancy(id) => {
            interview::start_with_vacancy(&bot, &dialogue, &app, chat, id).await?
        }
    };

    let mut answer = bot.answer_callback_query(query.id.clone());
    if let Some(notice) = notice {
        answer = answer.text(notice);
    }
    answer.await?;
    Ok(())
}
