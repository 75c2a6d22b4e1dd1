//! Admin wizard: per-user conversation state and its transition function.

use serde::{Deserialize, Serialize};
use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};

use crate::store::{SettingKey, SettingUpdate, Store};

/// Maximum number of codes listed in the delete prompt
pub const DELETE_PROMPT_CODE_LIMIT: usize = 20;

/// Texts accepted at the welcome photo step to remove the photo
pub const REMOVE_KEYWORDS: &[&str] = &["удалить", "remove"];

/// Conversation state of one admin; pending input travels inside the variant
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WizardState {
    #[default]
    Idle,
    AwaitingPhoto,
    AwaitingDescription {
        photo_id: String,
    },
    AwaitingCode {
        photo_id: String,
        description: String,
    },
    AwaitingDeleteCode,
    AwaitingChannelId,
    AwaitingChannelUrl,
    AwaitingWelcomeText,
    AwaitingWelcomePhoto,
}

impl WizardState {
    pub fn is_idle(&self) -> bool {
        matches!(self, WizardState::Idle)
    }

    fn awaiting_setting(key: SettingKey) -> Self {
        match key {
            SettingKey::ChannelId => WizardState::AwaitingChannelId,
            SettingKey::ChannelUrl => WizardState::AwaitingChannelUrl,
            SettingKey::WelcomeText => WizardState::AwaitingWelcomeText,
            SettingKey::WelcomePhoto => WizardState::AwaitingWelcomePhoto,
        }
    }
}

/// Type alias for the wizard dialogue
pub type WizardDialogue = Dialogue<WizardState, InMemStorage<WizardState>>;

/// Multi-step flows an admin can start from the panel
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    AddContent,
    DeleteContent,
    EditSetting(SettingKey),
}

/// Input delivered to the wizard
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WizardEvent {
    Start(Flow),
    Photo(String),
    Text(String),
    Cancel,
}

/// Recoverable input problems; the wizard re-prompts and keeps its state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputError {
    ExpectedPhoto,
    ExpectedText,
    ExpectedPhotoOrRemoval,
    InvalidCode,
    DuplicateCode,
}

/// Prompt shown when entering a waiting state
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Prompt {
    Photo,
    Description,
    Code,
    DeleteCode { codes: Vec<String> },
    Setting(SettingKey),
}

/// What has to happen as a result of a transition
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    Prompt(Prompt),
    Reprompt(InputError),
    AddContent {
        code: String,
        photo_id: String,
        description: String,
    },
    DeleteContent {
        code: String,
    },
    UpdateSetting(SettingUpdate),
    NothingToDelete,
    Cancelled,
    Ignored,
}

/// Read access to the catalog needed by transition guards
pub trait CatalogView {
    fn contains_code(&self, code: &str) -> bool;
    fn codes(&self) -> Vec<String>;
}

impl CatalogView for Store {
    fn contains_code(&self, code: &str) -> bool {
        self.get_content(code).is_some()
    }

    fn codes(&self) -> Vec<String> {
        self.list_codes()
    }
}

/// Validates a content code: non-empty, ASCII digits only
pub fn is_valid_code(code: &str) -> bool {
    !code.is_empty() && code.chars().all(|c| c.is_ascii_digit())
}

fn is_remove_keyword(text: &str) -> bool {
    let normalized = text.trim().to_lowercase();
    REMOVE_KEYWORDS.iter().any(|keyword| *keyword == normalized)
}

fn start(flow: Flow, catalog: &impl CatalogView) -> (WizardState, Effect) {
    match flow {
        Flow::AddContent => (WizardState::AwaitingPhoto, Effect::Prompt(Prompt::Photo)),
        Flow::DeleteContent => {
            let mut codes = catalog.codes();
            if codes.is_empty() {
                return (WizardState::Idle, Effect::NothingToDelete);
            }
            codes.truncate(DELETE_PROMPT_CODE_LIMIT);
            (
                WizardState::AwaitingDeleteCode,
                Effect::Prompt(Prompt::DeleteCode { codes }),
            )
        }
        Flow::EditSetting(key) => (
            WizardState::awaiting_setting(key),
            Effect::Prompt(Prompt::Setting(key)),
        ),
    }
}

/// Compute the next state and the effect for one event.
///
/// Guards only read the catalog; applying the effect is left to the caller.
pub fn transition(state: WizardState, event: WizardEvent, catalog: &impl CatalogView) -> (WizardState, Effect) {
    use WizardEvent::{Cancel, Photo, Start, Text};
    use WizardState::*;

    match (state, event) {
        (_, Cancel) => (Idle, Effect::Cancelled),
        (_, Start(flow)) => start(flow, catalog),

        (Idle, _) => (Idle, Effect::Ignored),

        (AwaitingPhoto, Photo(photo_id)) => (
            AwaitingDescription { photo_id },
            Effect::Prompt(Prompt::Description),
        ),
        (AwaitingPhoto, Text(_)) => (AwaitingPhoto, Effect::Reprompt(InputError::ExpectedPhoto)),

        (AwaitingDescription { photo_id }, Text(description)) => (
            AwaitingCode {
                photo_id,
                description,
            },
            Effect::Prompt(Prompt::Code),
        ),

        (
            AwaitingCode {
                photo_id,
                description,
            },
            Text(input),
        ) => {
            let code = input.trim();
            if !is_valid_code(code) {
                (
                    AwaitingCode {
                        photo_id,
                        description,
                    },
                    Effect::Reprompt(InputError::InvalidCode),
                )
            } else if catalog.contains_code(code) {
                (
                    AwaitingCode {
                        photo_id,
                        description,
                    },
                    Effect::Reprompt(InputError::DuplicateCode),
                )
            } else {
                (
                    Idle,
                    Effect::AddContent {
                        code: code.to_string(),
                        photo_id,
                        description,
                    },
                )
            }
        }

        (AwaitingDeleteCode, Text(input)) => (
            Idle,
            Effect::DeleteContent {
                code: input.trim().to_string(),
            },
        ),

        (AwaitingChannelId, Text(input)) => (
            Idle,
            Effect::UpdateSetting(SettingUpdate::ChannelId(input.trim().to_string())),
        ),
        (AwaitingChannelUrl, Text(input)) => (
            Idle,
            Effect::UpdateSetting(SettingUpdate::ChannelUrl(input.trim().to_string())),
        ),
        (AwaitingWelcomeText, Text(input)) => (
            Idle,
            Effect::UpdateSetting(SettingUpdate::WelcomeText(input)),
        ),

        (AwaitingWelcomePhoto, Photo(photo_id)) => (
            Idle,
            Effect::UpdateSetting(SettingUpdate::WelcomePhoto(Some(photo_id))),
        ),
        (AwaitingWelcomePhoto, Text(input)) if is_remove_keyword(&input) => (
            Idle,
            Effect::UpdateSetting(SettingUpdate::WelcomePhoto(None)),
        ),
        (AwaitingWelcomePhoto, Text(_)) => (
            AwaitingWelcomePhoto,
            Effect::Reprompt(InputError::ExpectedPhotoOrRemoval),
        ),

        // Photos sent to steps that expect text
        (state, Photo(_)) => (state, Effect::Reprompt(InputError::ExpectedText)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Codes(Vec<String>);

    impl CatalogView for Codes {
        fn contains_code(&self, code: &str) -> bool {
            self.0.iter().any(|existing| existing == code)
        }

        fn codes(&self) -> Vec<String> {
            self.0.clone()
        }
    }

    #[test]
    fn test_code_validation() {
        assert!(is_valid_code("777"));
        assert!(is_valid_code("0012345"));

        assert!(!is_valid_code(""));
        assert!(!is_valid_code("12a"));
        assert!(!is_valid_code("-5"));
        assert!(!is_valid_code("١٢٣"));
    }

    #[test]
    fn test_remove_keyword() {
        assert!(is_remove_keyword("удалить"));
        assert!(is_remove_keyword("  УДАЛИТЬ "));
        assert!(is_remove_keyword("Remove"));
        assert!(!is_remove_keyword("keep"));
    }

    #[test]
    fn test_delete_prompt_truncates_codes() {
        let catalog = Codes((0..30).map(|i| i.to_string()).collect());

        let (state, effect) = transition(WizardState::Idle, WizardEvent::Start(Flow::DeleteContent), &catalog);
        assert_eq!(state, WizardState::AwaitingDeleteCode);
        match effect {
            Effect::Prompt(Prompt::DeleteCode { codes }) => {
                assert_eq!(codes.len(), DELETE_PROMPT_CODE_LIMIT);
                assert_eq!(codes[0], "0");
            }
            other => panic!("Unexpected effect: {other:?}"),
        }
    }

    #[test]
    fn test_idle_ignores_payloads() {
        let catalog = Codes(Vec::new());
        let (state, effect) = transition(WizardState::Idle, WizardEvent::Text("hi".into()), &catalog);
        assert_eq!(state, WizardState::Idle);
        assert_eq!(effect, Effect::Ignored);
    }

    #[test]
    fn test_start_discards_pending_input() {
        let catalog = Codes(Vec::new());
        let pending = WizardState::AwaitingCode {
            photo_id: "p".into(),
            description: "d".into(),
        };
        let (state, _) = transition(
            pending,
            WizardEvent::Start(Flow::EditSetting(SettingKey::ChannelUrl)),
            &catalog,
        );
        assert_eq!(state, WizardState::AwaitingChannelUrl);
    }
}
