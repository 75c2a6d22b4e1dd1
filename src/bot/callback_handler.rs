//! Callback Handler module for processing inline keyboard callback queries

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::{debug, error, warn};

// Import localization
use crate::localization::t_lang;

use crate::gate::SubscriptionGate;
use crate::store::Store;
use crate::wizard::{WizardDialogue, WizardState};

use super::dialogue_manager::step_wizard;
use super::render::{edit_reply, send_reply, Reply};
use super::router::{has_access, welcome_reply, CallbackAction, Role};
use super::ui_builder::{
    create_back_keyboard, create_channel_settings_keyboard, create_welcome_settings_keyboard,
    format_channel_settings, format_stats, format_welcome_settings,
};
use super::CatalogBot;

/// Handle callback queries from inline keyboards
pub async fn callback_handler(
    bot: CatalogBot,
    q: CallbackQuery,
    dialogue: WizardDialogue,
    state: WizardState,
    store: Arc<Store>,
    gate: Arc<SubscriptionGate>,
) -> Result<()> {
    let user_id = q.from.id.0;
    let language_code = q.from.language_code.as_deref();
    debug!(user_id, data = ?q.data, "Received callback query from user");

    let action = q.data.as_deref().and_then(CallbackAction::parse);
    let (Some(action), Some(message)) = (action, q.message.as_ref()) else {
        // Unknown data or a message too old to act on
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };
    let chat_id = message.chat().id;
    let message_id = message.id();

    if !Role::of(&store, user_id).permits(action.requires_admin()) {
        warn!(user_id, action = action.as_str(), "Admin action requested by non-admin");
        bot.answer_callback_query(q.id.clone())
            .text(t_lang("admin-action-denied-alert", language_code))
            .show_alert(true)
            .await?;
        return Ok(());
    }

    let mut alert = None;
    let result = async {
        match action {
            CallbackAction::CheckSubscription => {
                if has_access(&store, &gate, user_id).await {
                    if let Err(e) = bot.delete_message(chat_id, message_id).await {
                        debug!(user_id, error = %e, "Could not delete subscription prompt");
                    }
                    send_reply(&bot, chat_id, welcome_reply(&store.settings(), true, language_code)).await?;
                } else {
                    alert = Some(t_lang("subscription-not-subscribed-alert", language_code));
                }
            }
            CallbackAction::AdminStats => {
                let reply = Reply::text(format_stats(&store.list_codes(), language_code))
                    .with_keyboard(create_back_keyboard(language_code));
                edit_reply(&bot, chat_id, message_id, reply).await?;
            }
            CallbackAction::AdminChannel => {
                let reply = Reply::text(format_channel_settings(&store.settings(), language_code))
                    .with_keyboard(create_channel_settings_keyboard(language_code));
                edit_reply(&bot, chat_id, message_id, reply).await?;
            }
            CallbackAction::AdminWelcome => {
                let reply = Reply::text(format_welcome_settings(language_code))
                    .with_keyboard(create_welcome_settings_keyboard(language_code));
                edit_reply(&bot, chat_id, message_id, reply).await?;
            }
            wizard_action => {
                if let Some(event) = wizard_action.wizard_event() {
                    if let Some(reply) = step_wizard(&store, &dialogue, state, event, language_code).await? {
                        edit_reply(&bot, chat_id, message_id, reply).await?;
                    }
                }
            }
        }
        anyhow::Ok(())
    }
    .await;

    if let Err(e) = &result {
        error!(user_id, action = action.as_str(), error = %e, "Callback handling failed");
        alert = Some(t_lang("error-internal", language_code));
    }

    // Answer the callback query to remove the loading state
    let mut answer = bot.answer_callback_query(q.id.clone());
    if let Some(text) = alert {
        answer = answer.text(text).show_alert(true);
    }
    answer.await?;

    result
}
