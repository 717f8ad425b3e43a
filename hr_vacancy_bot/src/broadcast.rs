//! Getting vacancies out: the channel post plus personal notifications to
//! subscribers whose tags match, within their daily limit.

use std::{fmt::Display, sync::Weak, time::Duration};

use chrono::NaiveDate;
use hr_bot_commons::{teloxide_retry, useful_methods::BotStuff};
use html_escape::encode_text;
use teloxide::{
    prelude::*,
    types::{FileId, InputFile, ParseMode, Recipient},
    ApiError, RequestError,
};

use crate::{
    config::Config,
    database::{self, Database, Vacancy},
    matcher::{common_tags, match_subscribers},
    misc::today,
    tags::{extract_vacancy_tags, hashtags_line, Tag},
};

/// Pause between personal messages. Telegram allows about 30 a second.
const SEND_INTERVAL: Duration = Duration::from_millis(50);

/// A user who gets a personal copy, and which of their tags matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub user: UserId,
    pub matched: Vec<Tag>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastPlan {
    /// Users with a delivery reserved for `day`.
    pub deliveries: Vec<Delivery>,
    /// Matched, but already at the daily limit.
    pub throttled: Vec<UserId>,
}

/// Figure out who gets a personal copy of a post with these tags, and
/// reserve one delivery for each of them on `day`.
///
/// `exclude` is left out entirely, which is how the admin doesn't get
/// notified about their own posts.
pub async fn plan_broadcast(
    database: &Database,
    tags: &[Tag],
    day: NaiveDate,
    daily_limit: u32,
    exclude: Option<UserId>,
) -> Result<BroadcastPlan, database::Error> {
    let subscriptions = database.subscriptions().await?;
    let mut plan = BroadcastPlan::default();

    for user in match_subscribers(tags, &subscriptions) {
        if Some(user) == exclude {
            continue;
        }
        let reserved = match database.try_reserve_delivery(user, day, daily_limit).await {
            Ok(reserved) => reserved,
            Err(e) => {
                for delivery in &plan.deliveries {
                    release(database, delivery.user, day).await;
                }
                return Err(e);
            }
        };
        if !reserved {
            plan.throttled.push(user);
            continue;
        }
        let matched = subscriptions
            .iter()
            .filter(|sub| sub.user == user)
            .flat_map(|sub| common_tags(tags, &sub.tags))
            .fold(Vec::new(), |mut acc: Vec<Tag>, tag| {
                if !acc.contains(tag) {
                    acc.push(tag.clone());
                }
                acc
            });
        plan.deliveries.push(Delivery { user, matched });
    }

    Ok(plan)
}

/// How a broadcast went, for the admin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub channel_posted: bool,
    pub delivered: usize,
    pub throttled: usize,
    /// Users who blocked the bot. They're marked inactive.
    pub blocked: usize,
    pub failed: usize,
}

impl Display for BroadcastReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "📣 <b>Рассылка завершена</b>")?;
        match self.channel_posted {
            true => writeln!(f, "Канал: опубликовано")?,
            false => writeln!(f, "Канал: <b>не удалось опубликовать</b>")?,
        }
        writeln!(f, "Доставлено лично: {}", self.delivered)?;
        writeln!(f, "Пропущено из-за лимита: {}", self.throttled)?;
        writeln!(f, "Заблокировали бота: {}", self.blocked)?;
        write!(f, "Ошибок: {}", self.failed)
    }
}

/// Something that can be posted to the channel and sent to subscribers.
#[derive(Clone, Copy)]
enum Post<'a> {
    Vacancy(&'a Vacancy),
    /// Admin's free-form announcement, sent as plain text.
    Text(&'a str),
}

impl Post<'_> {
    async fn send(
        self,
        bot: &Bot,
        to: Recipient,
        matched: Option<&[Tag]>,
    ) -> Result<(), RequestError> {
        match self {
            Post::Vacancy(vacancy) => {
                let header = match matched {
                    Some(tags) => format!(
                        "🔔 Новая вакансия по вашим тегам: {}\n\n",
                        encode_text(&hashtags_line(tags))
                    ),
                    None => String::new(),
                };
                match (&vacancy.image_id, vacancy.caption_html(&header)) {
                    (Some(image), Some(caption)) => {
                        teloxide_retry!(
                            bot.send_photo(to.clone(), InputFile::file_id(FileId(image.clone())))
                                .caption(caption.clone())
                                .parse_mode(ParseMode::Html)
                                .await
                        )?;
                    }
                    // Doesn't fit in a caption, the photo goes first on its own.
                    (image, _) => {
                        if let Some(image) = image {
                            teloxide_retry!(
                                bot.send_photo(
                                    to.clone(),
                                    InputFile::file_id(FileId(image.clone()))
                                )
                                .await
                            )?;
                        }
                        let text = format!("{header}{}", vacancy.card_html());
                        bot.send_html_chunked(to, &text, None).await?;
                    }
                }
            }
            Post::Text(text) => {
                let header = match matched {
                    Some(tags) => format!(
                        "🔔 По вашим тегам {}:\n\n",
                        encode_text(&hashtags_line(tags))
                    ),
                    None => String::new(),
                };
                let text = format!("{header}{}", encode_text(text));
                bot.send_html_chunked(to, &text, None).await?;
            }
        }
        Ok(())
    }

    fn tags(self) -> Vec<Tag> {
        match self {
            Post::Vacancy(vacancy) => vacancy.tags.clone(),
            Post::Text(text) => extract_vacancy_tags(text),
        }
    }
}

/// Post a stored vacancy to the channel and notify matching subscribers.
pub async fn publish_vacancy(
    bot: &Bot,
    database: &Database,
    config: &Config,
    vacancy: &Vacancy,
) -> Result<BroadcastReport, database::Error> {
    run(bot, database, config, Post::Vacancy(vacancy)).await
}

/// Post free text from the admin the same way. Tags are taken from the text.
pub async fn broadcast_text(
    bot: &Bot,
    database: &Database,
    config: &Config,
    text: &str,
) -> Result<BroadcastReport, database::Error> {
    run(bot, database, config, Post::Text(text)).await
}

async fn run(
    bot: &Bot,
    database: &Database,
    config: &Config,
    post: Post<'_>,
) -> Result<BroadcastReport, database::Error> {
    let mut report = BroadcastReport::default();

    // A failed channel post doesn't stop the personal notifications.
    match post.send(bot, config.channel.clone(), None).await {
        Ok(()) => report.channel_posted = true,
        Err(e) => log::error!("Failed to post to the channel: {e}"),
    }

    let day = today();
    let tags = post.tags();
    let plan = plan_broadcast(
        database,
        &tags,
        day,
        config.daily_limit,
        Some(config.admin_id),
    )
    .await?;
    report.throttled = plan.throttled.len();
    log::info!(
        "Broadcasting to {} users, {} throttled, tags: {}",
        plan.deliveries.len(),
        report.throttled,
        hashtags_line(&tags)
    );

    for delivery in plan.deliveries {
        let result = post
            .send(bot, delivery.user.into(), Some(delivery.matched.as_slice()))
            .await;
        match result {
            Ok(()) => report.delivered += 1,
            Err(RequestError::Api(
                ApiError::BotBlocked | ApiError::UserDeactivated | ApiError::ChatNotFound,
            )) => {
                log::debug!("User {} is gone, marking inactive", delivery.user);
                report.blocked += 1;
                // The rest of the recipients still have quota reserved, keep going.
                if let Err(e) = database.set_user_active(delivery.user, false).await {
                    log::error!("Failed to mark user {} inactive: {e}", delivery.user);
                }
                release(database, delivery.user, day).await;
            }
            Err(e) => {
                log::warn!("Failed to notify user {}: {e}", delivery.user);
                report.failed += 1;
                release(database, delivery.user, day).await;
            }
        }
        tokio::time::sleep(SEND_INTERVAL).await;
    }

    Ok(report)
}

/// Give back a reserved delivery, logging if the database won't have it.
async fn release(database: &Database, user: UserId, day: NaiveDate) {
    if let Err(e) = database.release_delivery(user, day).await {
        log::error!("Failed to release a delivery of user {user}: {e}");
    }
}

/// Once a day, drop delivery counters of days that are over.
pub async fn prune_deliveries_spinloop(database: Weak<Database>) {
    loop {
        let Some(db) = database.upgrade() else {
            // Bot shut down.
            return;
        };

        match db.prune_deliveries(today()).await {
            Ok(0) => (),
            Ok(pruned) => log::debug!("Pruned {pruned} old delivery counters"),
            Err(e) => {
                log::error!("Database error! {e:?}");
                return;
            }
        }

        drop(db);
        tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
    }
}
