//! Source code for the HR vacancy bot: a vacancy board on Telegram that
//! posts to a channel and notifies subscribers by tag.

/// Runtime configuration.
mod config;

/// The database.
mod database;

/// Tags and the vacancy text classifier.
mod tags;

/// Picking which subscribers get a vacancy.
mod matcher;

/// Channel posts and subscriber notifications.
mod broadcast;

/// Static tag menus and the selection form.
mod catalog;

/// Inline keyboards and their callback data.
mod keyboards;

/// Conversation state.
mod dialogue;
mod wizard;
mod interview;

/// Chat completion API client.
mod llm;

/// Handler error type.
mod error;

/// Miscellaneous functions.
mod misc;

/// Functions that handle events from Telegram.
mod handlers;

/// HTML dashboard for the admin.
mod dashboard;

#[cfg(test)]
mod testing;

/// Entry function that starts the bot.
mod entry;
pub use entry::*;
