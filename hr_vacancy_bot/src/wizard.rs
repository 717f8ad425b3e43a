//! Step by step vacancy input for the admin.

use crate::database::VacancyDraft;

/// Longest title accepted, in characters. Titles go into photo captions,
/// which Telegram caps at 1024.
pub const TITLE_LIMIT: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Add,
    /// Editing the vacancy with this ID.
    Edit(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Photo,
    Title,
    Description,
    Link,
}

/// What the admin sent at the current step.
#[derive(Debug, Clone, Copy)]
pub enum Input<'a> {
    Text(&'a str),
    /// File ID of the biggest photo size.
    Photo(&'a str),
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wizard {
    pub mode: Mode,
    pub step: Step,
    pub draft: VacancyDraft,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Moved on, ask the next question.
    Next(Wizard),
    /// All fields collected.
    Done(Mode, VacancyDraft),
    /// Input didn't fit the step, ask again.
    Retry(Wizard, &'static str),
}

impl Wizard {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            step: Step::Photo,
            draft: VacancyDraft::default(),
        }
    }

    /// Question for the current step.
    pub fn prompt(&self) -> &'static str {
        match (self.mode, self.step) {
            (Mode::Add, Step::Photo) => "📷 Пришлите фото для вакансии или «-», если без фото.",
            (Mode::Edit(_), Step::Photo) => "📷 Пришлите новое фото или «-», чтобы оставить старое.",
            (Mode::Add, Step::Title) => "✏️ Введите название вакансии.",
            (Mode::Edit(_), Step::Title) => "✏️ Введите новое название.",
            (Mode::Add, Step::Description) => "📝 Введите описание вакансии.",
            (Mode::Edit(_), Step::Description) => "📝 Введите новое описание.",
            (Mode::Add, Step::Link) => "🔗 Введите ссылку для отклика.",
            (Mode::Edit(_), Step::Link) => "🔗 Введите новую ссылку.",
        }
    }

    pub fn advance(mut self, input: Input) -> Advance {
        let text = match input {
            Input::Text(text) => Some(text.trim()).filter(|t| !t.is_empty()),
            _ => None,
        };

        match self.step {
            Step::Photo => {
                match input {
                    Input::Photo(id) => self.draft.image_id = Some(id.to_string()),
                    Input::Text(text) if text.trim() == "-" => self.draft.image_id = None,
                    _ => return Advance::Retry(self, "Нужна фотография или «-»."),
                }
                self.step = Step::Title;
            }
            Step::Title => {
                let Some(text) = text else {
                    return Advance::Retry(self, "Название должно быть текстом.");
                };
                if text.chars().count() > TITLE_LIMIT {
                    return Advance::Retry(self, "Название слишком длинное, до 200 символов.");
                }
                self.draft.title = text.to_string();
                self.step = Step::Description;
            }
            Step::Description => {
                let Some(text) = text else {
                    return Advance::Retry(self, "Описание должно быть текстом.");
                };
                self.draft.description = text.to_string();
                self.step = Step::Link;
            }
            Step::Link => {
                let Some(text) = text else {
                    return Advance::Retry(self, "Ссылка должна быть текстом.");
                };
                self.draft.link = text.to_string();
                return Advance::Done(self.mode, self.draft);
            }
        }
        Advance::Next(self)
    }
}
