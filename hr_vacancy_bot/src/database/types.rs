use std::fmt::Display;

use chrono::{DateTime, NaiveDate, Utc};
use html_escape::encode_text;
use hr_bot_commons::useful_methods::{truncate_chars, TELEGRAM_CAPTION_LIMIT};
use teloxide::types::UserId;

use crate::{
    tags::{extract_vacancy_tags, hashtags_line, Tag},
    wizard::TITLE_LIMIT,
};

/// A vacancy as stored in the database.
#[derive(Debug, Clone, PartialEq)]
pub struct Vacancy {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub link: String,
    /// Telegram file ID of the attached photo.
    pub image_id: Option<String>,
    pub tags: Vec<Tag>,
    pub created_at: DateTime<Utc>,
}

impl Vacancy {
    /// HTML text of the vacancy post.
    pub fn card_html(&self) -> String {
        self.render(&self.title, &self.description)
    }

    /// [`Self::card_html`] prefixed with `header`, cut down to fit in a photo
    /// caption. The description gets cut first, an overlong title second.
    /// [`None`] if even that doesn't fit, for example with a huge link.
    pub fn caption_html(&self, header: &str) -> Option<String> {
        let title = truncate_chars(&self.title, TITLE_LIMIT);
        let overhead = header.chars().count() + self.render(&title, "").chars().count();
        let description = match TELEGRAM_CAPTION_LIMIT.checked_sub(overhead)? {
            0 => String::new(),
            budget => truncate_chars(&self.description, budget),
        };
        Some(format!("{header}{}", self.render(&title, &description)))
    }

    fn render(&self, title: &str, description: &str) -> String {
        let mut text = format!(
            "<b>{}</b>\n\n{}\n\n{}",
            encode_text(title),
            encode_text(description),
            encode_text(&self.link)
        );
        if !self.tags.is_empty() {
            text.push_str("\n\n");
            text.push_str(&encode_text(&hashtags_line(&self.tags)));
        }
        text
    }
}

/// What the add and edit wizards collect before anything hits the database.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VacancyDraft {
    pub title: String,
    pub description: String,
    pub link: String,
    /// For edits, [`None`] keeps the old photo.
    pub image_id: Option<String>,
}

impl VacancyDraft {
    /// Tags for this vacancy, taken from the title and description.
    pub fn tags(&self) -> Vec<Tag> {
        extract_vacancy_tags(&format!("{}\n{}", self.title, self.description))
    }
}

/// User counters for the admin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserStats {
    pub joined_today: i64,
    pub joined_week: i64,
    pub joined_month: i64,
    pub total: i64,
    pub active: i64,
    /// Users with at least one tag.
    pub subscribers: i64,
    pub vacancies: i64,
}

impl Display for UserStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "📊 <b>Статистика</b>")?;
        writeln!(f, "Сегодня: {}", self.joined_today)?;
        writeln!(f, "7 дней: {}", self.joined_week)?;
        writeln!(f, "30 дней: {}", self.joined_month)?;
        writeln!(f, "Всего: {}", self.total)?;
        writeln!(f, "Активных: {}", self.active)?;
        writeln!(f, "С подпиской: {}", self.subscribers)?;
        write!(f, "Вакансий: {}", self.vacancies)
    }
}

/// One row of the dashboard's user table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserOverview {
    pub user: UserId,
    pub joined: NaiveDate,
    /// False once the user blocked the bot.
    pub active: bool,
    pub tags: Vec<Tag>,
}
