//! Screening interviews run by the chat model.

use crate::llm::{ChatMessage, Role};

/// The model starts its closing summary with this line.
pub const SUMMARY_MARKER: &str = "КАНДИДАТ:";

/// Only this many latest messages are sent along with the system prompt.
pub const HISTORY_LIMIT: usize = 20;

/// The first question, asked by the bot itself before the model takes over.
pub const FIRST_QUESTION: &str = "Как вас зовут?";

const SYSTEM_PROMPT: &str = "\
Ты HR-ассистент и проводишь короткое первичное собеседование в Telegram.
Задавай по одному вопросу за раз, коротко и дружелюбно, на русском языке.
Выясни: имя, город, опыт работы, желаемый график, когда готов выйти и ожидания по зарплате.
Не обещай трудоустройство и не придумывай условия вакансии.
Когда информации достаточно, поблагодари кандидата и закончи ответ итогом, \
который начинается со строки «КАНДИДАТ:», затем по пунктам всё, что удалось узнать.";

/// Fixed positions offered when the user starts an interview from the menu.
pub static POSITIONS: &[(&str, &str)] = &[
    ("sales", "Менеджер по продажам"),
    ("marketing", "Маркетолог"),
    ("operator", "Оператор колл-центра"),
    ("courier", "Курьер"),
];

pub fn position_title(key: &str) -> Option<&'static str> {
    POSITIONS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, title)| *title)
}

/// One user's interview in progress. Lives in the dialogue state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterviewSession {
    pub position: String,
    pub history: Vec<ChatMessage>,
}

impl InterviewSession {
    pub fn new(position: impl Into<String>) -> Self {
        let position = position.into();
        let history = vec![
            ChatMessage::new(
                Role::User,
                format!("Здравствуйте, я откликаюсь на вакансию «{position}»."),
            ),
            ChatMessage::new(Role::Assistant, FIRST_QUESTION),
        ];
        Self { position, history }
    }

    pub fn push_user(&mut self, text: &str) {
        self.push(ChatMessage::new(Role::User, text));
    }

    pub fn push_assistant(&mut self, text: &str) {
        self.push(ChatMessage::new(Role::Assistant, text));
    }

    /// Older messages are forgotten so the state stays small.
    fn push(&mut self, message: ChatMessage) {
        self.history.push(message);
        let excess = self.history.len().saturating_sub(HISTORY_LIMIT);
        self.history.drain(..excess);
    }

    /// Undo the last user message, for when the model couldn't be reached.
    pub fn pop_user(&mut self) {
        if self
            .history
            .last()
            .is_some_and(|message| message.role == Role::User)
        {
            self.history.pop();
        }
    }

    /// System prompt plus the conversation so far.
    pub fn request(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.history.len() + 1);
        messages.push(ChatMessage::new(
            Role::System,
            format!("{SYSTEM_PROMPT}\n\nВакансия: {}", self.position),
        ));
        messages.extend(self.history.iter().cloned());
        messages
    }
}

/// Whether the model wrapped up the interview.
pub fn is_final(answer: &str) -> bool {
    answer.contains(SUMMARY_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_has_greeting_and_first_question() {
        let session = InterviewSession::new("Курьер");
        assert_eq!(session.history.len(), 2);
        assert!(session.history[0].content.contains("«Курьер»"));
        assert_eq!(session.history[1].content, FIRST_QUESTION);

        let request = session.request();
        assert_eq!(request[0].role, Role::System);
        assert!(request[0].content.ends_with("Вакансия: Курьер"));
        assert_eq!(request.len(), 3);
    }

    #[test]
    fn request_keeps_only_latest_history() {
        let mut session = InterviewSession::new("Маркетолог");
        for i in 0..30 {
            session.push_user(&format!("ответ {i}"));
            session.push_assistant(&format!("вопрос {i}"));
        }
        let request = session.request();
        assert_eq!(request.len(), HISTORY_LIMIT + 1);
        assert_eq!(request[0].role, Role::System);
        assert_eq!(request.last().unwrap().content, "вопрос 29");
        assert_eq!(request[1].content, "ответ 20");
    }

    #[test]
    fn stored_history_stays_capped() {
        let mut session = InterviewSession::new("Курьер");
        for i in 0..100 {
            session.push_user(&format!("ответ {i}"));
            session.push_assistant(&format!("вопрос {i}"));
        }
        assert_eq!(session.history.len(), HISTORY_LIMIT);
        assert_eq!(session.history[0].content, "ответ 90");
        assert_eq!(session.history.last().unwrap().content, "вопрос 99");
    }

    #[test]
    fn pop_user_only_pops_user() {
        let mut session = InterviewSession::new("x");
        session.pop_user();
        assert_eq!(session.history.len(), 2);
        session.push_user("Иван");
        session.pop_user();
        assert_eq!(session.history.len(), 2);
    }

    #[test]
    fn summary_marker() {
        assert!(is_final("Спасибо!\n\nКАНДИДАТ:\n- Иван"));
        assert!(!is_final("Сколько вам лет?"));
    }

    #[test]
    fn positions() {
        assert_eq!(position_title("sales"), Some("Менеджер по продажам"));
        assert_eq!(position_title("astronaut"), None);
    }
}
