use teloxide::{dispatching::dialogue::InMemStorage, prelude::Dialogue};

use crate::{interview::InterviewSession, wizard::Wizard};

/// Per-chat conversation state. Kept in memory only, so a restart drops
/// any wizard or interview in progress.
#[derive(Debug, Clone, Default)]
pub enum State {
    #[default]
    Idle,
    /// Admin is adding or editing a vacancy.
    Wizard(Wizard),
    /// Admin's next message goes out as a broadcast.
    AwaitingBroadcast,
    Interview(InterviewSession),
}

pub type BotDialogue = Dialogue<State, InMemStorage<State>>;
