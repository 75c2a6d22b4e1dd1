//! Dispatcher schema wiring commands, messages and callbacks to their handlers

use std::sync::Arc;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::dispatching::{HandlerExt, UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use tracing::error;

use super::callback_handler::callback_handler;
use super::dialogue_manager::user_dialogue;
use super::message_handler::{command_handler, message_handler, Command};
use crate::wizard::{WizardDialogue, WizardState};

async fn load_state(dialogue: WizardDialogue) -> Option<WizardState> {
    match dialogue.get_or_default().await {
        Ok(state) => Some(state),
        Err(e) => {
            error!(session = %dialogue.chat_id(), error = ?e, "Failed to load wizard state");
            None
        }
    }
}

/// Build the update handler tree.
///
/// Expects `Arc<Store>`, `Arc<SubscriptionGate>` and
/// `Arc<InMemStorage<WizardState>>` among the dispatcher dependencies.
/// Wizard sessions are keyed by the sending user.
pub fn schema() -> UpdateHandler<anyhow::Error> {
    let messages = Update::filter_message()
        .filter_map(|msg: Message, storage: Arc<InMemStorage<WizardState>>| {
            msg.from.as_ref().map(|user| user_dialogue(storage, user.id))
        })
        .filter_map_async(load_state)
        .branch(dptree::entry().filter_command::<Command>().endpoint(command_handler))
        .branch(dptree::endpoint(message_handler));

    let callbacks = Update::filter_callback_query()
        .map(|q: CallbackQuery, storage: Arc<InMemStorage<WizardState>>| user_dialogue(storage, q.from.id))
        .filter_map_async(load_state)
        .endpoint(callback_handler);

    dptree::entry().branch(messages).branch(callbacks)
}
