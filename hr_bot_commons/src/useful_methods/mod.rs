mod chunking;
pub use chunking::*;

use std::future::Future;

use teloxide::{
    payloads::SendMessageSetters,
    requests::Requester,
    types::{ChatAction, ChatId, InlineKeyboardMarkup, Message, ParseMode, PhotoSize, Recipient},
    Bot, RequestError,
};

pub trait MessageStuff {
    /// Text of the message, or its caption if it's a media message.
    fn text_full(&self) -> Option<&str>;
    /// The largest of the sizes Telegram sent for a photo message.
    fn find_biggest_photo(&self) -> Option<&PhotoSize>;
}

impl MessageStuff for Message {
    fn text_full(&self) -> Option<&str> {
        self.text().or_else(|| self.caption())
    }
    fn find_biggest_photo(&self) -> Option<&PhotoSize> {
        self.photo()?
            .iter()
            .max_by_key(|x| u64::from(x.width) * u64::from(x.height))
    }
}

pub trait BotStuff {
    fn typing(&self, to_where: ChatId) -> impl Future<Output = Result<(), RequestError>> + Send;

    /// Opinionated method to send a message with HTML markup, split into
    /// several if it's over Telegram's length limit, retrying on flood waits.
    /// The keyboard, if any, goes on the last piece.
    fn send_html_chunked(
        &self,
        to_where: Recipient,
        text: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> impl Future<Output = Result<Vec<Message>, RequestError>> + Send;
}

impl BotStuff for Bot {
    async fn typing(&self, to_where: ChatId) -> Result<(), RequestError> {
        self.send_chat_action(to_where, ChatAction::Typing).await?;
        Ok(())
    }

    async fn send_html_chunked(
        &self,
        to_where: Recipient,
        text: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<Vec<Message>, RequestError> {
        let chunks = split_for_telegram(text, TELEGRAM_MESSAGE_LIMIT);
        let last = chunks.len().saturating_sub(1);
        let mut sent = Vec::with_capacity(chunks.len());

        for (index, chunk) in chunks.into_iter().enumerate() {
            let message = crate::teloxide_retry!({
                let mut request = self
                    .send_message(to_where.clone(), chunk)
                    .parse_mode(ParseMode::Html);
                if index == last {
                    if let Some(keyboard) = &keyboard {
                        request = request.reply_markup(keyboard.clone());
                    }
                }
                request.await
            })?;
            sent.push(message);
        }

        Ok(sent)
    }
}
