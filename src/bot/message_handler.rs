//! Message Handler module for processing incoming Telegram messages

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{debug, error, info, warn};

// Import localization
use crate::localization::t_lang;

use crate::gate::SubscriptionGate;
use crate::store::Store;
use crate::wizard::{WizardDialogue, WizardState};

use super::dialogue_manager::step_wizard;
use super::render::{send_reply, Reply};
use super::router::{
    has_access, lookup, route_message, subscription_prompt, welcome_reply, Payload, Role, Route,
};
use super::ui_builder::{create_admin_keyboard, format_admin_panel};
use super::CatalogBot;

/// Commands understood by the bot
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    #[command(description = "show the welcome message")]
    Start,
    #[command(description = "open the admin panel")]
    Admin,
}

impl Command {
    pub fn requires_admin(&self) -> bool {
        matches!(self, Command::Admin)
    }
}

fn language_code(msg: &Message) -> Option<&str> {
    msg.from
        .as_ref()
        .and_then(|user| user.language_code.as_deref())
}

pub async fn command_handler(
    bot: CatalogBot,
    msg: Message,
    cmd: Command,
    dialogue: WizardDialogue,
    store: Arc<Store>,
    gate: Arc<SubscriptionGate>,
) -> Result<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let user_id = user.id.0;
    let language_code = language_code(&msg);

    if !Role::of(&store, user_id).permits(cmd.requires_admin()) {
        warn!(user_id, command = ?cmd, "Admin command requested by non-admin");
        send_reply(&bot, msg.chat.id, Reply::text(t_lang("admin-denied", language_code))).await?;
        return Ok(());
    }

    match cmd {
        Command::Start => {
            debug!(user_id, "Received /start");
            let reply = if has_access(&store, &gate, user_id).await {
                welcome_reply(&store.settings(), false, language_code)
            } else {
                subscription_prompt(&store.settings(), language_code)
            };
            send_reply(&bot, msg.chat.id, reply).await?;
        }
        Command::Admin => {
            info!(user_id, "Admin panel opened");
            dialogue.exit().await?;
            let panel = Reply::text(format_admin_panel(language_code))
                .with_keyboard(create_admin_keyboard(language_code));
            send_reply(&bot, msg.chat.id, panel).await?;
        }
    }

    Ok(())
}

pub async fn message_handler(
    bot: CatalogBot,
    msg: Message,
    dialogue: WizardDialogue,
    state: WizardState,
    store: Arc<Store>,
    gate: Arc<SubscriptionGate>,
) -> Result<()> {
    let Some(user) = msg.from.as_ref() else {
        debug!(chat_id = %msg.chat.id, "Ignoring message without sender");
        return Ok(());
    };
    let user_id = user.id.0;
    let language_code = language_code(&msg);

    let role = Role::of(&store, user_id);
    if role == Role::User && !state.is_idle() {
        // Admin rights were withdrawn mid-session
        warn!(user_id, "Dropping wizard session of non-admin");
        dialogue.exit().await?;
    }

    match route_message(&state, Payload::from_message(&msg), role) {
        Route::Lookup(text) => {
            let outcome = lookup(&store, &gate, user_id, &text).await;
            let reply = outcome.into_reply(&store.settings(), language_code);
            send_reply(&bot, msg.chat.id, reply).await?;
        }
        Route::Wizard(event) => match step_wizard(&store, &dialogue, state, event, language_code).await {
            Ok(Some(reply)) => send_reply(&bot, msg.chat.id, reply).await?,
            Ok(None) => {}
            Err(e) => {
                error!(user_id, error = %e, "Failed to apply wizard step");
                send_reply(&bot, msg.chat.id, Reply::text(t_lang("error-internal", language_code))).await?;
                return Err(e);
            }
        },
        Route::Ignore => {
            debug!(user_id, "Ignoring message with no handler for this state");
        }
    }

    Ok(())
}
