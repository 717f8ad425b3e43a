use teloxide::{dispatching::dialogue::InMemStorageError, RequestError};

/// Everything that can go wrong while handling an update.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Telegram request failed: {0}")]
    Request(#[from] RequestError),
    #[error("database error: {0}")]
    Database(#[from] crate::database::Error),
    #[error("dialogue storage error: {0}")]
    Dialogue(#[from] InMemStorageError),
    #[error("chat completion failed: {0}")]
    Llm(#[from] crate::llm::Error),
}

pub type HandlerResult = Result<(), Error>;
