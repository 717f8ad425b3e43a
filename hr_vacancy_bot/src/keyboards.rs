use std::{fmt::Display, str::FromStr};

use hr_bot_commons::useful_methods::truncate_chars;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use url::Url;

use crate::{
    catalog::{Category, CATEGORIES, FORM},
    interview::POSITIONS,
    tags::Tag,
};

/// Everything an inline button can ask the bot to do.
///
/// Telegram allows 64 bytes of callback data, so keys are short.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackData {
    Menu,
    Vacancies,
    Vacancy(i64),
    AddVacancy,
    EditVacancy(i64),
    DeleteVacancy(i64),
    ConfirmDelete(i64),
    Publish(i64),
    AdminPanel,
    Stats,
    ToggleNotify,
    Broadcast,
    Cancel,
    Categories,
    Category(String),
    ToggleTag(String),
    MyTags,
    ClearTags,
    StartForm,
    FormAnswer { step: usize, option: String },
    CheckSubscription,
    Interviews,
    InterviewPosition(String),
    InterviewVacancy(i64),
}

impl CallbackData {
    /// Buttons only the admin ever gets.
    pub fn is_admin_only(&self) -> bool {
        use CallbackData as C;
        matches!(
            self,
            C::AddVacancy
                | C::EditVacancy(_)
                | C::DeleteVacancy(_)
                | C::ConfirmDelete(_)
                | C::Publish(_)
                | C::AdminPanel
                | C::Stats
                | C::ToggleNotify
                | C::Broadcast
        )
    }
}

impl Display for CallbackData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use CallbackData as C;
        match self {
            C::Menu => write!(f, "menu"),
            C::Vacancies => write!(f, "vacs"),
            C::Vacancy(id) => write!(f, "vac:{id}"),
            C::AddVacancy => write!(f, "add"),
            C::EditVacancy(id) => write!(f, "edit:{id}"),
            C::DeleteVacancy(id) => write!(f, "del:{id}"),
            C::ConfirmDelete(id) => write!(f, "delok:{id}"),
            C::Publish(id) => write!(f, "pub:{id}"),
            C::AdminPanel => write!(f, "admin"),
            C::Stats => write!(f, "stats"),
            C::ToggleNotify => write!(f, "notify"),
            C::Broadcast => write!(f, "bcast"),
            C::Cancel => write!(f, "cancel"),
            C::Categories => write!(f, "cats"),
            C::Category(key) => write!(f, "cat:{key}"),
            C::ToggleTag(tag) => write!(f, "tag:{tag}"),
            C::MyTags => write!(f, "mytags"),
            C::ClearTags => write!(f, "clear"),
            C::StartForm => write!(f, "form"),
            C::FormAnswer { step, option } => write!(f, "form:{step}:{option}"),
            C::CheckSubscription => write!(f, "checksub"),
            C::Interviews => write!(f, "iv"),
            C::InterviewPosition(key) => write!(f, "iv:{key}"),
            C::InterviewVacancy(id) => write!(f, "ivv:{id}"),
        }
    }
}

impl FromStr for CallbackData {
    type Err = ();

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        use CallbackData as C;

        let (kind, arg) = match data.split_once(':') {
            Some((kind, arg)) => (kind, Some(arg)),
            None => (data, None),
        };
        let id = || arg.and_then(|x| x.parse::<i64>().ok()).ok_or(());
        let text = || arg.filter(|x| !x.is_empty()).map(str::to_string).ok_or(());

        Ok(match (kind, arg) {
            ("menu", None) => C::Menu,
            ("vacs", None) => C::Vacancies,
            ("vac", Some(_)) => C::Vacancy(id()?),
            ("add", None) => C::AddVacancy,
            ("edit", Some(_)) => C::EditVacancy(id()?),
            ("del", Some(_)) => C::DeleteVacancy(id()?),
            ("delok", Some(_)) => C::ConfirmDelete(id()?),
            ("pub", Some(_)) => C::Publish(id()?),
            ("admin", None) => C::AdminPanel,
            ("stats", None) => C::Stats,
            ("notify", None) => C::ToggleNotify,
            ("bcast", None) => C::Broadcast,
            ("cancel", None) => C::Cancel,
            ("cats", None) => C::Categories,
            ("cat", Some(_)) => C::Category(text()?),
            ("tag", Some(_)) => C::ToggleTag(text()?),
            ("mytags", None) => C::MyTags,
            ("clear", None) => C::ClearTags,
            ("form", None) => C::StartForm,
            ("form", Some(rest)) => {
                let (step, option) = rest.split_once(':').ok_or(())?;
                if option.is_empty() {
                    return Err(());
                }
                C::FormAnswer {
                    step: step.parse().map_err(|_| ())?,
                    option: option.to_string(),
                }
            }
            ("checksub", None) => C::CheckSubscription,
            ("iv", None) => C::Interviews,
            ("iv", Some(_)) => C::InterviewPosition(text()?),
            ("ivv", Some(_)) => C::InterviewVacancy(id()?),
            _ => return Err(()),
        })
    }
}

fn button(text: impl Into<String>, data: CallbackData) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text, data.to_string())
}

fn back_to_menu() -> Vec<InlineKeyboardButton> {
    vec![button("⬅️ В меню", CallbackData::Menu)]
}

pub fn main_menu(is_admin: bool, interviews: bool) -> InlineKeyboardMarkup {
    let mut rows = vec![
        vec![button("📋 Вакансии", CallbackData::Vacancies)],
        vec![
            button("🏷 Подписки", CallbackData::Categories),
            button("📝 Подобрать работу", CallbackData::StartForm),
        ],
        vec![button("⭐ Мои теги", CallbackData::MyTags)],
    ];
    if interviews {
        rows.push(vec![button("🎤 Собеседование", CallbackData::Interviews)]);
    }
    if is_admin {
        rows.push(vec![button("🛠 Админ-панель", CallbackData::AdminPanel)]);
    }
    InlineKeyboardMarkup::new(rows)
}

pub fn admin_panel(notify_new_users: bool) -> InlineKeyboardMarkup {
    let notify = if notify_new_users {
        "🔔 Уведомления о новых: вкл"
    } else {
        "🔕 Уведомления о новых: выкл"
    };
    InlineKeyboardMarkup::new([
        vec![button("➕ Добавить вакансию", CallbackData::AddVacancy)],
        vec![button("📋 Вакансии", CallbackData::Vacancies)],
        vec![
            button("📊 Статистика", CallbackData::Stats),
            button("📣 Рассылка", CallbackData::Broadcast),
        ],
        vec![button(notify, CallbackData::ToggleNotify)],
        back_to_menu(),
    ])
}

pub fn cancel() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([[button("❌ Отмена", CallbackData::Cancel)]])
}

/// One button per vacancy, newest first.
pub fn vacancy_list(vacancies: &[(i64, String)], is_admin: bool) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = vacancies
        .iter()
        .map(|(id, title)| vec![button(truncate_chars(title, 40), CallbackData::Vacancy(*id))])
        .collect();
    if is_admin {
        rows.push(vec![button("➕ Добавить", CallbackData::AddVacancy)]);
    }
    rows.push(back_to_menu());
    InlineKeyboardMarkup::new(rows)
}

pub fn vacancy_actions(id: i64, is_admin: bool, interviews: bool) -> InlineKeyboardMarkup {
    let mut rows = Vec::new();
    if interviews {
        rows.push(vec![button(
            "🎤 Пройти собеседование",
            CallbackData::InterviewVacancy(id),
        )]);
    }
    if is_admin {
        rows.push(vec![
            button("✏️ Изменить", CallbackData::EditVacancy(id)),
            button("🗑 Удалить", CallbackData::DeleteVacancy(id)),
        ]);
        rows.push(vec![button("📣 Опубликовать", CallbackData::Publish(id))]);
    }
    rows.push(vec![button("⬅️ К списку", CallbackData::Vacancies)]);
    InlineKeyboardMarkup::new(rows)
}

pub fn confirm_delete(id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([[
        button("🗑 Да, удалить", CallbackData::ConfirmDelete(id)),
        button("↩️ Нет", CallbackData::Vacancy(id)),
    ]])
}

/// Offered right after the wizard saves a vacancy.
pub fn publish_prompt(id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([
        vec![button("📣 Опубликовать и разослать", CallbackData::Publish(id))],
        vec![button("👀 Посмотреть", CallbackData::Vacancy(id))],
        back_to_menu(),
    ])
}

pub fn categories() -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = CATEGORIES
        .iter()
        .map(|c| vec![button(c.title, CallbackData::Category(c.key.to_string()))])
        .collect();
    rows.push(vec![button("⭐ Мои теги", CallbackData::MyTags)]);
    rows.push(back_to_menu());
    InlineKeyboardMarkup::new(rows)
}

/// Tags of a category, with a checkmark on those the user already has.
pub fn category_tags(category: &Category, user_tags: &[Tag]) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = category
        .choices
        .iter()
        .map(|choice| {
            let picked = user_tags.iter().any(|t| t.as_str() == choice.tag);
            let label = if picked {
                format!("✅ {}", choice.label)
            } else {
                choice.label.to_string()
            };
            vec![button(label, CallbackData::ToggleTag(choice.tag.to_string()))]
        })
        .collect();
    rows.push(vec![button("⬅️ К категориям", CallbackData::Categories)]);
    InlineKeyboardMarkup::new(rows)
}

pub fn my_tags(has_tags: bool) -> InlineKeyboardMarkup {
    let mut rows = Vec::new();
    if has_tags {
        rows.push(vec![button("🧹 Очистить", CallbackData::ClearTags)]);
    }
    rows.push(vec![button("🏷 Выбрать теги", CallbackData::Categories)]);
    rows.push(back_to_menu());
    InlineKeyboardMarkup::new(rows)
}

/// Options of the selection form's question number `step`, two per row.
pub fn form_step(step: usize) -> Option<InlineKeyboardMarkup> {
    let question = FORM.get(step)?;
    let rows = question.options.chunks(2).map(|pair| {
        pair.iter()
            .map(|option| {
                button(
                    option.label,
                    CallbackData::FormAnswer {
                        step,
                        option: option.key.to_string(),
                    },
                )
            })
            .collect::<Vec<_>>()
    });
    Some(InlineKeyboardMarkup::new(rows))
}

/// Shown at the end of the form and to users who haven't joined the channel.
pub fn channel(channel_url: Option<&Url>, check_subscription: bool) -> InlineKeyboardMarkup {
    let mut rows = Vec::new();
    if let Some(url) = channel_url {
        rows.push(vec![InlineKeyboardButton::url("📢 Перейти в канал", url.clone())]);
    }
    if check_subscription {
        rows.push(vec![button("✅ Я подписался", CallbackData::CheckSubscription)]);
    } else {
        rows.push(back_to_menu());
    }
    InlineKeyboardMarkup::new(rows)
}

pub fn interview_positions() -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = POSITIONS
        .iter()
        .map(|(key, title)| vec![button(*title, CallbackData::InterviewPosition(key.to_string()))])
        .collect();
    rows.push(back_to_menu());
    InlineKeyboardMarkup::new(rows)
}
