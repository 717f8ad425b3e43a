//! Boilerplate shared by the HR bots: startup, logging, and the
//! handful of Telegram helpers every bot ends up needing.

use std::future::Future;

use teloxide::{prelude::*, types::Recipient};

pub mod useful_methods;

/// Run a Telegram request expression, running it again if Telegram asks
/// to wait or the network drops out. Gives up after the third try and
/// returns whatever the last attempt returned.
///
/// The expression is evaluated anew for every attempt, so it should
/// build the request itself, like `teloxide_retry!(bot.send_message(..).await)`.
#[macro_export]
macro_rules! teloxide_retry {
    ($request:expr) => {{
        let mut attempts: u8 = 0;
        loop {
            attempts += 1;
            match $request {
                Err(::teloxide::RequestError::RetryAfter(wait)) if attempts < 3 => {
                    ::log::debug!("Flood wait for {:?}", wait.duration());
                    ::tokio::time::sleep(wait.duration()).await;
                }
                Err(::teloxide::RequestError::Network(e)) if attempts < 3 => {
                    ::log::warn!("Network error, retrying: {e}");
                    ::tokio::time::sleep(::std::time::Duration::from_secs(1)).await;
                }
                result => break result,
            }
        }
    }};
}

/// Load `.env`, initialize logging and run `closure` in a multithreaded
/// async runtime until it finishes.
///
/// Logging is enabled on level `info` unless overridden by the environment
/// variable `RUST_LOG`. This uses the crate [pretty_env_logger][] internally,
/// see its documentation for more details.
///
/// # Panics
///
/// Panics if the tokio runtime can't be built, which only happens when the
/// OS refuses to give us threads.
///
/// [pretty_env_logger]: https://docs.rs/pretty_env_logger
pub fn start_everything(closure: impl Future<Output = ()>) {
    // Missing .env is the normal case in production.
    let dotenv_result = dotenvy::dotenv();

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| String::from("info"));

    // journald already stamps every line.
    let running_as_systemd_service = std::env::var_os("JOURNAL_STREAM").is_some();

    let mut builder = match running_as_systemd_service {
        true => pretty_env_logger::formatted_builder(),
        false => pretty_env_logger::formatted_timed_builder(),
    };

    builder.parse_filters(&log_level);

    if builder.try_init().is_err() {
        log::error!("Tried to init logger twice!");
    }

    if let Ok(path) = dotenv_result {
        log::debug!("Loaded environment from {}", path.display());
    }

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to build the tokio runtime")
        .block_on(closure);
}

/// Find out if a user of this ID is currently present in the specified
/// chat or channel, as in a member, an admin or the owner.
///
/// Telegram refuses to answer this for chats the bot can't see into,
/// which comes back as an error.
pub async fn is_member_of(
    bot: &Bot,
    user: UserId,
    chat: impl Into<Recipient>,
) -> Result<bool, teloxide::RequestError> {
    Ok(bot.get_chat_member(chat, user).await?.is_present())
}

/// Parse a chat reference the way people write them in configs:
/// `@channel_username` or a numeric ID like `-1001652876751`.
pub fn parse_recipient(value: &str) -> Option<Recipient> {
    let value = value.trim();
    if let Some(username) = value.strip_prefix('@') {
        if username.is_empty() {
            return None;
        }
        return Some(Recipient::ChannelUsername(value.to_string()));
    }
    value.parse::<i64>().ok().map(|id| Recipient::Id(ChatId(id)))
}
