//! UI Builder module for creating keyboards and formatting messages

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use teloxide::utils::html::escape;
use tracing::warn;

// Import localization
use crate::localization::{t_args_lang, t_lang};

use super::router::CallbackAction;
use crate::store::{ContentRecord, SettingKey, SettingUpdate, Settings};
use crate::wizard::{InputError, Prompt};

/// Number of codes shown in the statistics view
pub const STATS_CODE_LIMIT: usize = 10;

fn callback_button(key: &str, action: CallbackAction, language_code: Option<&str>) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(t_lang(key, language_code), action.as_str())
}

/// Keyboard under the subscription prompt: channel link and re-check button
pub fn create_subscription_keyboard(channel_url: &str, language_code: Option<&str>) -> InlineKeyboardMarkup {
    let mut rows = Vec::new();

    match reqwest::Url::parse(channel_url) {
        Ok(url) => rows.push(vec![InlineKeyboardButton::url(
            t_lang("subscription-subscribe-button", language_code),
            url,
        )]),
        Err(e) => warn!(channel_url = %channel_url, error = %e, "Channel url is not a valid URL, omitting subscribe button"),
    }

    rows.push(vec![callback_button(
        "subscription-check-button",
        CallbackAction::CheckSubscription,
        language_code,
    )]);

    InlineKeyboardMarkup::new(rows)
}

/// Main admin panel keyboard
pub fn create_admin_keyboard(language_code: Option<&str>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![callback_button("admin-button-add", CallbackAction::AdminAdd, language_code)],
        vec![callback_button("admin-button-delete", CallbackAction::AdminDelete, language_code)],
        vec![callback_button("admin-button-channel", CallbackAction::AdminChannel, language_code)],
        vec![callback_button("admin-button-welcome", CallbackAction::AdminWelcome, language_code)],
        vec![callback_button("admin-button-stats", CallbackAction::AdminStats, language_code)],
    ])
}

pub fn create_back_keyboard(language_code: Option<&str>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![callback_button(
        "admin-button-back",
        CallbackAction::AdminMenu,
        language_code,
    )]])
}

pub fn create_cancel_keyboard(language_code: Option<&str>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![callback_button(
        "admin-button-cancel",
        CallbackAction::AdminMenu,
        language_code,
    )]])
}

pub fn create_channel_settings_keyboard(language_code: Option<&str>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![callback_button(
            "admin-button-change-channel-id",
            CallbackAction::ChangeChannelId,
            language_code,
        )],
        vec![callback_button(
            "admin-button-change-channel-url",
            CallbackAction::ChangeChannelUrl,
            language_code,
        )],
        vec![callback_button("admin-button-back", CallbackAction::AdminMenu, language_code)],
    ])
}

pub fn create_welcome_settings_keyboard(language_code: Option<&str>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![callback_button(
            "admin-button-change-welcome-text",
            CallbackAction::ChangeWelcomeText,
            language_code,
        )],
        vec![callback_button(
            "admin-button-change-welcome-photo",
            CallbackAction::ChangeWelcomePhoto,
            language_code,
        )],
        vec![callback_button("admin-button-back", CallbackAction::AdminMenu, language_code)],
    ])
}

fn code_line(code: &str, language_code: Option<&str>) -> String {
    t_args_lang("lookup-code-line", &[("code", &escape(code))], language_code)
}

pub fn format_subscription_prompt(language_code: Option<&str>) -> String {
    format!(
        "{}\n\n{}",
        t_lang("subscription-required", language_code),
        t_lang("subscription-press-button", language_code)
    )
}

/// Welcome text, optionally prefixed with the subscription thank-you line
pub fn format_welcome(welcome_text: &str, thanks: bool, language_code: Option<&str>) -> String {
    if thanks {
        format!("{}\n\n{}", t_lang("subscription-thanks", language_code), welcome_text)
    } else {
        welcome_text.to_string()
    }
}

pub fn format_admin_panel(language_code: Option<&str>) -> String {
    format!(
        "{}\n\n{}",
        t_lang("admin-panel-title", language_code),
        t_lang("admin-panel-choose", language_code)
    )
}

/// Statistics: total count and the first codes in insertion order
pub fn format_stats(codes: &[String], language_code: Option<&str>) -> String {
    let listed = if codes.is_empty() {
        t_lang("stats-no-codes", language_code)
    } else {
        codes
            .iter()
            .take(STATS_CODE_LIMIT)
            .map(|code| escape(code))
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut text = format!(
        "{}\n\n{}\n{}",
        t_lang("stats-title", language_code),
        t_args_lang("stats-total", &[("count", &codes.len().to_string())], language_code),
        t_args_lang("stats-codes", &[("codes", &listed)], language_code)
    );

    if codes.len() > STATS_CODE_LIMIT {
        text.push('\n');
        text.push_str(&t_lang("stats-more", language_code));
    }

    text
}

pub fn format_channel_settings(settings: &Settings, language_code: Option<&str>) -> String {
    format!(
        "{}\n\n{}\n{}",
        t_lang("channel-settings-title", language_code),
        t_args_lang(
            "channel-settings-id",
            &[("channel_id", &escape(&settings.channel_id))],
            language_code
        ),
        t_args_lang(
            "channel-settings-url",
            &[("channel_url", &escape(&settings.channel_url))],
            language_code
        )
    )
}

pub fn format_welcome_settings(language_code: Option<&str>) -> String {
    format!(
        "{}\n\n{}",
        t_lang("welcome-settings-title", language_code),
        t_lang("welcome-settings-choose", language_code)
    )
}

/// Caption of a found record when the photo is delivered
pub fn format_found_caption(code: &str, record: &ContentRecord, language_code: Option<&str>) -> String {
    format!(
        "{}\n\n{}\n\n{}",
        t_lang("lookup-found-title", language_code),
        record.description,
        code_line(code, language_code)
    )
}

/// Text-only rendering of a found record when the photo cannot be delivered
pub fn format_found_fallback(code: &str, record: &ContentRecord, language_code: Option<&str>) -> String {
    format!(
        "{}\n\n{}\n\n{}\n\n{}",
        t_lang("lookup-found-fallback-title", language_code),
        record.description,
        code_line(code, language_code),
        t_lang("lookup-photo-failed", language_code)
    )
}

pub fn format_not_found(code: &str, language_code: Option<&str>) -> String {
    format!(
        "{}\n\n{}",
        t_lang("lookup-not-found-title", language_code),
        t_args_lang("lookup-not-found-detail", &[("code", &escape(code))], language_code)
    )
}

pub fn format_invalid_format(language_code: Option<&str>) -> String {
    format!(
        "{}\n\n{}\n{}",
        t_lang("lookup-invalid-format-title", language_code),
        t_lang("lookup-invalid-format-hint", language_code),
        t_lang("lookup-invalid-format-example", language_code)
    )
}

/// Prompt shown when the wizard enters a waiting state
pub fn format_prompt(prompt: &Prompt, settings: &Settings, language_code: Option<&str>) -> String {
    match prompt {
        Prompt::Photo => format!(
            "{}\n\n{}",
            t_lang("add-photo-title", language_code),
            t_lang("add-photo-prompt", language_code)
        ),
        Prompt::Description => format!(
            "{}\n\n{}\n{}\n\n{}\n{}\n{}",
            t_lang("add-description-title", language_code),
            t_lang("add-description-prompt", language_code),
            t_lang("add-description-hint", language_code),
            t_lang("add-description-html", language_code),
            t_lang("add-description-html-bold", language_code),
            t_lang("add-description-html-italic", language_code)
        ),
        Prompt::Code => format!(
            "{}\n\n{}\n{}",
            t_lang("add-code-title", language_code),
            t_lang("add-code-prompt", language_code),
            t_lang("add-code-hint", language_code)
        ),
        Prompt::DeleteCode { codes } => {
            let listed = codes.iter().map(|code| escape(code)).collect::<Vec<_>>().join(", ");
            format!(
                "{}\n\n{}\n\n{}",
                t_lang("delete-prompt-title", language_code),
                t_args_lang("delete-available-codes", &[("codes", &listed)], language_code),
                t_lang("delete-prompt", language_code)
            )
        }
        Prompt::Setting(SettingKey::ChannelId) => format!(
            "{}\n\n{}\n{}",
            t_lang("channel-id-prompt-title", language_code),
            t_lang("channel-id-prompt", language_code),
            t_lang("channel-id-hint", language_code)
        ),
        Prompt::Setting(SettingKey::ChannelUrl) => format!(
            "{}\n\n{}\n{}",
            t_lang("channel-url-prompt-title", language_code),
            t_lang("channel-url-prompt", language_code),
            t_lang("channel-url-hint", language_code)
        ),
        Prompt::Setting(SettingKey::WelcomeText) => format!(
            "{}\n\n{}\n{}\n\n{}",
            t_lang("welcome-text-prompt-title", language_code),
            t_lang("welcome-text-current", language_code),
            settings.welcome_text,
            t_lang("welcome-text-prompt", language_code)
        ),
        Prompt::Setting(SettingKey::WelcomePhoto) => format!(
            "{}\n\n{}",
            t_lang("welcome-photo-prompt-title", language_code),
            t_lang("welcome-photo-prompt", language_code)
        ),
    }
}

pub fn format_input_error(error: InputError, language_code: Option<&str>) -> String {
    let key = match error {
        InputError::ExpectedPhoto => "input-expected-photo",
        InputError::ExpectedText => "input-expected-text",
        InputError::ExpectedPhotoOrRemoval => "input-expected-photo-or-remove",
        InputError::InvalidCode => "input-invalid-code",
        InputError::DuplicateCode => "input-duplicate-code",
    };
    t_lang(key, language_code)
}

pub fn format_content_added(code: &str, language_code: Option<&str>) -> String {
    format!(
        "{}\n\n{}",
        t_lang("add-success-title", language_code),
        code_line(code, language_code)
    )
}

pub fn format_content_deleted(code: &str, language_code: Option<&str>) -> String {
    format!(
        "{}\n\n{}",
        t_lang("delete-success-title", language_code),
        code_line(code, language_code)
    )
}

pub fn format_delete_not_found(code: &str, language_code: Option<&str>) -> String {
    format!(
        "{}\n\n{}",
        t_lang("delete-not-found-title", language_code),
        t_args_lang("delete-not-found-detail", &[("code", &escape(code))], language_code)
    )
}

pub fn format_nothing_to_delete(language_code: Option<&str>) -> String {
    format!(
        "{}\n\n{}",
        t_lang("delete-empty-title", language_code),
        t_lang("delete-empty-detail", language_code)
    )
}

/// Confirmation after a setting has been written
pub fn format_setting_updated(update: &SettingUpdate, language_code: Option<&str>) -> String {
    match update {
        SettingUpdate::ChannelId(channel_id) => format!(
            "{}\n\n{}",
            t_lang("channel-id-updated", language_code),
            t_args_lang("channel-id-new", &[("channel_id", &escape(channel_id))], language_code)
        ),
        SettingUpdate::ChannelUrl(channel_url) => format!(
            "{}\n\n{}",
            t_lang("channel-url-updated", language_code),
            t_args_lang("channel-url-new", &[("channel_url", &escape(channel_url))], language_code)
        ),
        SettingUpdate::WelcomeText(_) => t_lang("welcome-text-updated", language_code),
        SettingUpdate::WelcomePhoto(Some(_)) => t_lang("welcome-photo-updated", language_code),
        SettingUpdate::WelcomePhoto(None) => t_lang("welcome-photo-removed", language_code),
    }
}
