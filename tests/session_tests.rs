//! # Session Tests
//!
//! Wizard sessions and admin checks: sessions belong to the sending user,
//! only admins reach the wizard, and a finished step is saved before any
//! reply goes out.

use anyhow::Result;
use catalog_gate_bot::bot::{
    route_message, step_wizard, user_dialogue, CallbackAction, Command, Payload, Role, Route,
};
use catalog_gate_bot::store::Store;
use catalog_gate_bot::wizard::{WizardEvent, WizardState};
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::types::UserId;
use tempfile::TempDir;

const ADMIN: u64 = 1;
const MEMBER: u64 = 999;

fn setup_store(dir: &TempDir) -> Result<Store> {
    Ok(Store::load(dir.path().join("database.json"), &[ADMIN])?)
}

fn awaiting_code() -> WizardState {
    WizardState::AwaitingCode {
        photo_id: "P".to_string(),
        description: "D".to_string(),
    }
}

#[tokio::test]
async fn test_sessions_are_per_user() -> Result<()> {
    let storage = InMemStorage::<WizardState>::new();
    let admin = user_dialogue(storage.clone(), UserId(ADMIN));
    let member = user_dialogue(storage.clone(), UserId(MEMBER));

    admin.update(awaiting_code()).await?;

    assert_eq!(admin.get().await?, Some(awaiting_code()));
    assert_eq!(member.get_or_default().await?, WizardState::Idle);
    Ok(())
}

#[tokio::test]
async fn test_member_cannot_finish_admin_wizard() -> Result<()> {
    let dir = TempDir::new()?;
    let store = setup_store(&dir)?;
    let storage = InMemStorage::<WizardState>::new();
    user_dialogue(storage.clone(), UserId(ADMIN))
        .update(awaiting_code())
        .await?;

    // A group member writes while the admin's add flow is open
    let member = user_dialogue(storage.clone(), UserId(MEMBER));
    let state = member.get_or_default().await?;
    let route = route_message(&state, Payload::Text("555".to_string()), Role::of(&store, MEMBER));

    assert_eq!(route, Route::Lookup("555".to_string()));
    assert_eq!(store.get_content("555"), None);
    Ok(())
}

#[tokio::test]
async fn test_pending_state_of_non_admin_is_not_wizard_input() -> Result<()> {
    let dir = TempDir::new()?;
    let store = setup_store(&dir)?;

    for payload in [
        Payload::Text("555".to_string()),
        Payload::Photo("X".to_string()),
        Payload::Other,
    ] {
        let route = route_message(&awaiting_code(), payload, Role::of(&store, MEMBER));
        assert!(!matches!(route, Route::Wizard(_)));
    }

    let route = route_message(
        &awaiting_code(),
        Payload::Text("555".to_string()),
        Role::of(&store, ADMIN),
    );
    assert_eq!(route, Route::Wizard(WizardEvent::Text("555".to_string())));
    Ok(())
}

#[test]
fn test_admin_command_requires_admin() -> Result<()> {
    let dir = TempDir::new()?;
    let store = setup_store(&dir)?;

    assert_eq!(Role::of(&store, ADMIN), Role::Admin);
    assert_eq!(Role::of(&store, MEMBER), Role::User);

    assert!(Role::of(&store, MEMBER).permits(Command::Start.requires_admin()));
    assert!(!Role::of(&store, MEMBER).permits(Command::Admin.requires_admin()));
    assert!(Role::of(&store, ADMIN).permits(Command::Admin.requires_admin()));
    Ok(())
}

#[test]
fn test_admin_callbacks_refused_for_members() -> Result<()> {
    let dir = TempDir::new()?;
    let store = setup_store(&dir)?;
    let member = Role::of(&store, MEMBER);
    let admin = Role::of(&store, ADMIN);

    for action in CallbackAction::ALL {
        assert!(admin.permits(action.requires_admin()), "{action:?}");
        let expected = action == CallbackAction::CheckSubscription;
        assert_eq!(member.permits(action.requires_admin()), expected, "{action:?}");
    }
    Ok(())
}

#[tokio::test]
async fn test_completed_step_is_saved_before_reply() -> Result<()> {
    let dir = TempDir::new()?;
    let store = setup_store(&dir)?;
    let storage = InMemStorage::<WizardState>::new();
    let dialogue = user_dialogue(storage, UserId(ADMIN));
    dialogue.update(awaiting_code()).await?;

    let reply = step_wizard(
        &store,
        &dialogue,
        awaiting_code(),
        WizardEvent::Text("777".to_string()),
        Some("en"),
    )
    .await?;

    // Session is closed even though the reply has not been delivered yet
    assert_eq!(dialogue.get().await?, None);
    assert!(store.get_content("777").is_some());
    assert!(reply.is_some_and(|reply| reply.body().contains("777")));
    Ok(())
}

#[tokio::test]
async fn test_reprompt_keeps_session() -> Result<()> {
    let dir = TempDir::new()?;
    let store = setup_store(&dir)?;
    let dialogue = user_dialogue(InMemStorage::<WizardState>::new(), UserId(ADMIN));

    step_wizard(
        &store,
        &dialogue,
        awaiting_code(),
        WizardEvent::Text("12a".to_string()),
        None,
    )
    .await?;

    assert_eq!(dialogue.get().await?, Some(awaiting_code()));
    Ok(())
}
