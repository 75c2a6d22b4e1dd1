//! Dialogue Manager module for applying wizard transitions to the store

use anyhow::Result;
use std::sync::Arc;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::types::{ChatId, UserId};
use tracing::{info, warn};

use super::render::Reply;
use super::ui_builder::{
    create_admin_keyboard, create_back_keyboard, create_cancel_keyboard, format_admin_panel,
    format_content_added, format_content_deleted, format_delete_not_found, format_input_error,
    format_nothing_to_delete, format_prompt, format_setting_updated,
};
use crate::errors::StoreError;
use crate::store::Store;
use crate::wizard::{transition, Effect, InputError, WizardDialogue, WizardEvent, WizardState};

/// Outcome of one wizard step: the state to keep and what to tell the admin
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    pub state: WizardState,
    pub reply: Option<Reply>,
}

/// Run one wizard step: compute the transition, then carry out its effect
pub fn run_wizard(
    store: &Store,
    state: WizardState,
    event: WizardEvent,
    language_code: Option<&str>,
) -> Result<Applied, StoreError> {
    let (next, effect) = transition(state, event, store);
    apply_effect(store, next, effect, language_code)
}

/// Carry out a transition effect against the store and build the reply
pub fn apply_effect(
    store: &Store,
    next: WizardState,
    effect: Effect,
    language_code: Option<&str>,
) -> Result<Applied, StoreError> {
    let reply = match effect {
        Effect::Prompt(prompt) => Some(
            Reply::text(format_prompt(&prompt, &store.settings(), language_code))
                .with_keyboard(create_cancel_keyboard(language_code)),
        ),
        Effect::Reprompt(error) => Some(Reply::text(format_input_error(error, language_code))),
        Effect::AddContent {
            code,
            photo_id,
            description,
        } => match store.add_content(&code, &photo_id, &description) {
            Ok(()) => Some(
                Reply::text(format_content_added(&code, language_code))
                    .with_keyboard(create_admin_keyboard(language_code)),
            ),
            Err(StoreError::AlreadyExists(_)) => {
                // Another admin took the code between the guard and the write
                warn!(code = %code, "Code claimed concurrently, asking for another one");
                return Ok(Applied {
                    state: WizardState::AwaitingCode {
                        photo_id,
                        description,
                    },
                    reply: Some(Reply::text(format_input_error(
                        InputError::DuplicateCode,
                        language_code,
                    ))),
                });
            }
            Err(e) => return Err(e),
        },
        Effect::DeleteContent { code } => {
            if store.delete_content(&code)? {
                Some(
                    Reply::text(format_content_deleted(&code, language_code))
                        .with_keyboard(create_admin_keyboard(language_code)),
                )
            } else {
                Some(
                    Reply::text(format_delete_not_found(&code, language_code))
                        .with_keyboard(create_back_keyboard(language_code)),
                )
            }
        }
        Effect::UpdateSetting(update) => {
            let text = format_setting_updated(&update, language_code);
            store.update_setting(update)?;
            Some(Reply::text(text).with_keyboard(create_admin_keyboard(language_code)))
        }
        Effect::NothingToDelete => Some(
            Reply::text(format_nothing_to_delete(language_code))
                .with_keyboard(create_back_keyboard(language_code)),
        ),
        Effect::Cancelled => Some(
            Reply::text(format_admin_panel(language_code))
                .with_keyboard(create_admin_keyboard(language_code)),
        ),
        Effect::Ignored => None,
    };

    Ok(Applied { state: next, reply })
}

/// Wizard session of one user, keyed by the sender's id rather than the chat
pub fn user_dialogue(storage: Arc<InMemStorage<WizardState>>, user_id: UserId) -> WizardDialogue {
    WizardDialogue::new(storage, ChatId::from(user_id))
}

/// Save the wizard state for the session; `Idle` ends the dialogue
async fn save_state(dialogue: &WizardDialogue, state: WizardState) -> Result<()> {
    if state.is_idle() {
        dialogue.exit().await?;
    } else {
        info!(session = %dialogue.chat_id(), state = ?state, "Wizard state updated");
        dialogue.update(state).await?;
    }
    Ok(())
}

/// Run one wizard step and save the resulting state.
///
/// The state is stored before the reply is returned for delivery.
pub async fn step_wizard(
    store: &Store,
    dialogue: &WizardDialogue,
    state: WizardState,
    event: WizardEvent,
    language_code: Option<&str>,
) -> Result<Option<Reply>> {
    let applied = run_wizard(store, state, event, language_code)?;
    save_state(dialogue, applied.state).await?;
    Ok(applied.reply)
}
