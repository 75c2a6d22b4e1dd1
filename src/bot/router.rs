//! Request Router module: classifies inbound updates and resolves content lookups
//!
//! Everything here is independent of the Telegram transport so the routing
//! decisions can be exercised directly in tests.

use teloxide::types::Message;
use tracing::{debug, info};

use super::render::Reply;
use super::ui_builder::{
    create_subscription_keyboard, format_found_caption, format_found_fallback, format_invalid_format,
    format_not_found, format_subscription_prompt, format_welcome,
};
use crate::gate::SubscriptionGate;
use crate::store::{ContentRecord, SettingKey, Settings, Store};
use crate::wizard::{is_valid_code, Flow, WizardEvent, WizardState};

/// Named actions carried in inline keyboard callback data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    CheckSubscription,
    AdminMenu,
    AdminAdd,
    AdminDelete,
    AdminChannel,
    AdminWelcome,
    AdminStats,
    ChangeChannelId,
    ChangeChannelUrl,
    ChangeWelcomeText,
    ChangeWelcomePhoto,
}

impl CallbackAction {
    pub const ALL: [CallbackAction; 11] = [
        CallbackAction::CheckSubscription,
        CallbackAction::AdminMenu,
        CallbackAction::AdminAdd,
        CallbackAction::AdminDelete,
        CallbackAction::AdminChannel,
        CallbackAction::AdminWelcome,
        CallbackAction::AdminStats,
        CallbackAction::ChangeChannelId,
        CallbackAction::ChangeChannelUrl,
        CallbackAction::ChangeWelcomeText,
        CallbackAction::ChangeWelcomePhoto,
    ];

    /// Callback data string
    pub fn as_str(self) -> &'static str {
        match self {
            CallbackAction::CheckSubscription => "check_subscription",
            CallbackAction::AdminMenu => "admin_menu",
            CallbackAction::AdminAdd => "admin_add",
            CallbackAction::AdminDelete => "admin_delete",
            CallbackAction::AdminChannel => "admin_channel",
            CallbackAction::AdminWelcome => "admin_welcome",
            CallbackAction::AdminStats => "admin_stats",
            CallbackAction::ChangeChannelId => "change_channel_id",
            CallbackAction::ChangeChannelUrl => "change_channel_url",
            CallbackAction::ChangeWelcomeText => "change_welcome_text",
            CallbackAction::ChangeWelcomePhoto => "change_welcome_photo",
        }
    }

    pub fn parse(data: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.as_str() == data)
    }

    pub fn requires_admin(self) -> bool {
        self != CallbackAction::CheckSubscription
    }

    /// Wizard event triggered by this action, if it drives the wizard
    pub fn wizard_event(self) -> Option<WizardEvent> {
        let flow = match self {
            CallbackAction::AdminMenu => return Some(WizardEvent::Cancel),
            CallbackAction::AdminAdd => Flow::AddContent,
            CallbackAction::AdminDelete => Flow::DeleteContent,
            CallbackAction::ChangeChannelId => Flow::EditSetting(SettingKey::ChannelId),
            CallbackAction::ChangeChannelUrl => Flow::EditSetting(SettingKey::ChannelUrl),
            CallbackAction::ChangeWelcomeText => Flow::EditSetting(SettingKey::WelcomeText),
            CallbackAction::ChangeWelcomePhoto => Flow::EditSetting(SettingKey::WelcomePhoto),
            CallbackAction::CheckSubscription
            | CallbackAction::AdminChannel
            | CallbackAction::AdminWelcome
            | CallbackAction::AdminStats => return None,
        };
        Some(WizardEvent::Start(flow))
    }
}

/// Shape of an inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// File id of the largest photo size
    Photo(String),
    Text(String),
    Other,
}

impl Payload {
    pub fn from_message(msg: &Message) -> Self {
        if let Some(largest_photo) = msg.photo().and_then(|photos| photos.last()) {
            return Payload::Photo(largest_photo.file.id.0.clone());
        }
        match msg.text() {
            Some(text) => Payload::Text(text.to_string()),
            None => Payload::Other,
        }
    }
}

/// Where a non-command message goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Lookup(String),
    Wizard(WizardEvent),
    Ignore,
}

/// Sender's standing against the admin allow-list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn of(store: &Store, user_id: u64) -> Self {
        if store.is_admin(user_id) {
            Role::Admin
        } else {
            Role::User
        }
    }

    /// Whether this role may run an operation with the given requirement
    pub fn permits(self, requires_admin: bool) -> bool {
        !requires_admin || self == Role::Admin
    }
}

/// Route a message by the sender's role, wizard state and the payload shape.
///
/// Only admins reach the wizard; anyone else is treated as idle.
pub fn route_message(state: &WizardState, payload: Payload, role: Role) -> Route {
    let in_wizard = !state.is_idle() && role.permits(true);
    match (in_wizard, payload) {
        (false, Payload::Text(text)) => Route::Lookup(text),
        (false, _) => Route::Ignore,
        (true, Payload::Photo(photo_id)) => Route::Wizard(WizardEvent::Photo(photo_id)),
        (true, Payload::Text(text)) => Route::Wizard(WizardEvent::Text(text)),
        (true, Payload::Other) => Route::Ignore,
    }
}

/// Result of a content lookup request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    NotSubscribed,
    InvalidFormat,
    NotFound { code: String },
    Found { code: String, record: ContentRecord },
}

/// Whether `user_id` passes the subscription gate for the configured channel
pub async fn has_access(store: &Store, gate: &SubscriptionGate, user_id: u64) -> bool {
    // Read the channel before awaiting so no store lock spans the network call
    let channel_id = store.settings().channel_id;
    gate.is_subscribed(&channel_id, user_id).await
}

/// Resolve a code sent by a user
pub async fn lookup(store: &Store, gate: &SubscriptionGate, user_id: u64, text: &str) -> LookupOutcome {
    if !has_access(store, gate, user_id).await {
        info!(user_id, "Lookup refused, user is not subscribed");
        return LookupOutcome::NotSubscribed;
    }

    let code = text.trim();
    if !is_valid_code(code) {
        debug!(user_id, "Lookup text is not a numeric code");
        return LookupOutcome::InvalidFormat;
    }

    match store.get_content(code) {
        Some(record) => {
            info!(user_id, code = %code, "Content found");
            LookupOutcome::Found {
                code: code.to_string(),
                record,
            }
        }
        None => {
            info!(user_id, code = %code, "Content not found");
            LookupOutcome::NotFound {
                code: code.to_string(),
            }
        }
    }
}

/// Subscription prompt with the channel link and re-check buttons
pub fn subscription_prompt(settings: &Settings, language_code: Option<&str>) -> Reply {
    Reply::text(format_subscription_prompt(language_code))
        .with_keyboard(create_subscription_keyboard(&settings.channel_url, language_code))
}

/// Welcome message, as a photo when one is configured
pub fn welcome_reply(settings: &Settings, thanks: bool, language_code: Option<&str>) -> Reply {
    let text = format_welcome(&settings.welcome_text, thanks, language_code);
    match &settings.welcome_photo {
        Some(photo_id) => Reply::Photo {
            photo_id: photo_id.clone(),
            caption: text.clone(),
            fallback: text,
            keyboard: None,
        },
        None => Reply::text(text),
    }
}

impl LookupOutcome {
    pub fn into_reply(self, settings: &Settings, language_code: Option<&str>) -> Reply {
        match self {
            LookupOutcome::NotSubscribed => subscription_prompt(settings, language_code),
            LookupOutcome::InvalidFormat => Reply::text(format_invalid_format(language_code)),
            LookupOutcome::NotFound { code } => Reply::text(format_not_found(&code, language_code)),
            LookupOutcome::Found { code, record } => Reply::Photo {
                photo_id: record.photo_id.clone(),
                caption: format_found_caption(&code, &record, language_code),
                fallback: format_found_fallback(&code, &record, language_code),
                keyboard: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_data_round_trip() {
        for action in CallbackAction::ALL {
            assert_eq!(CallbackAction::parse(action.as_str()), Some(action));
        }
        assert_eq!(CallbackAction::parse("admin_unknown"), None);
    }

    #[test]
    fn test_only_subscription_check_is_public() {
        let public: Vec<_> = CallbackAction::ALL
            .into_iter()
            .filter(|action| !action.requires_admin())
            .collect();
        assert_eq!(public, vec![CallbackAction::CheckSubscription]);
    }

    #[test]
    fn test_routing_by_state_and_payload() {
        let idle = WizardState::Idle;
        assert_eq!(
            route_message(&idle, Payload::Text("123".into()), Role::Admin),
            Route::Lookup("123".into())
        );
        assert_eq!(route_message(&idle, Payload::Photo("p".into()), Role::Admin), Route::Ignore);

        let awaiting = WizardState::AwaitingPhoto;
        assert_eq!(
            route_message(&awaiting, Payload::Photo("p".into()), Role::Admin),
            Route::Wizard(WizardEvent::Photo("p".into()))
        );
        assert_eq!(
            route_message(&awaiting, Payload::Text("hi".into()), Role::Admin),
            Route::Wizard(WizardEvent::Text("hi".into()))
        );
        assert_eq!(route_message(&awaiting, Payload::Other, Role::Admin), Route::Ignore);
    }

    #[test]
    fn test_users_never_reach_the_wizard() {
        let awaiting = WizardState::AwaitingCode {
            photo_id: "P".into(),
            description: "D".into(),
        };
        assert_eq!(
            route_message(&awaiting, Payload::Text("555".into()), Role::User),
            Route::Lookup("555".into())
        );
        assert_eq!(route_message(&awaiting, Payload::Photo("p".into()), Role::User), Route::Ignore);
    }

    #[test]
    fn test_role_permissions() {
        assert!(Role::Admin.permits(true));
        assert!(Role::Admin.permits(false));
        assert!(Role::User.permits(false));
        assert!(!Role::User.permits(true));
    }

    #[test]
    fn test_welcome_reply_shape() {
        let mut settings = Settings::default();
        assert!(matches!(welcome_reply(&settings, false, None), Reply::Text { .. }));

        settings.welcome_photo = Some("photo".to_string());
        match welcome_reply(&settings, true, Some("en")) {
            Reply::Photo { caption, fallback, .. } => {
                assert!(caption.starts_with("✅"));
                assert_eq!(caption, fallback);
            }
            other => panic!("Unexpected reply: {other:?}"),
        }
    }
}
