//! # Router Tests
//!
//! Exercises content lookup end to end with a scripted membership oracle in
//! place of the Telegram API.

use anyhow::Result;
use async_trait::async_trait;
use catalog_gate_bot::bot::{lookup, run_wizard, LookupOutcome, Reply};
use catalog_gate_bot::config::FailurePolicy;
use catalog_gate_bot::errors::GateError;
use catalog_gate_bot::gate::{MemberStatus, MembershipOracle, SubscriptionGate};
use catalog_gate_bot::store::Store;
use catalog_gate_bot::wizard::{Flow, WizardEvent, WizardState};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// Oracle answering every query with the same status, or failing
struct FixedOracle {
    status: Option<MemberStatus>,
    calls: AtomicUsize,
}

impl FixedOracle {
    fn new(status: Option<MemberStatus>) -> Arc<Self> {
        Arc::new(Self {
            status,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl MembershipOracle for FixedOracle {
    async fn member_status(&self, channel_id: &str, _user_id: u64) -> Result<MemberStatus, GateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.status
            .ok_or_else(|| GateError::InvalidChannel(channel_id.to_string()))
    }
}

fn gate(status: Option<MemberStatus>, policy: FailurePolicy) -> SubscriptionGate {
    SubscriptionGate::new(FixedOracle::new(status), policy)
}

fn setup_store(dir: &TempDir) -> Result<Store> {
    Ok(Store::load(dir.path().join("database.json"), &[1])?)
}

#[tokio::test]
async fn test_unsubscribed_user_gets_subscription_prompt() -> Result<()> {
    let dir = TempDir::new()?;
    let store = setup_store(&dir)?;
    store.add_content("777", "p", "d")?;
    let gate = gate(Some(MemberStatus::Left), FailurePolicy::Closed);

    for text in ["777", "12345", "hello", ""] {
        let outcome = lookup(&store, &gate, 5, text).await;
        assert_eq!(outcome, LookupOutcome::NotSubscribed);
    }

    let reply = lookup(&store, &gate, 5, "777")
        .await
        .into_reply(&store.settings(), Some("en"));
    assert!(reply.body().contains("subscribe"));
    assert!(reply.keyboard().is_some());
    Ok(())
}

#[tokio::test]
async fn test_kicked_user_is_refused() -> Result<()> {
    let dir = TempDir::new()?;
    let store = setup_store(&dir)?;
    let gate = gate(Some(MemberStatus::Kicked), FailurePolicy::Open);

    assert_eq!(lookup(&store, &gate, 5, "1").await, LookupOutcome::NotSubscribed);
    Ok(())
}

#[tokio::test]
async fn test_invalid_format() -> Result<()> {
    let dir = TempDir::new()?;
    let store = setup_store(&dir)?;
    let gate = gate(Some(MemberStatus::Member), FailurePolicy::Closed);

    for text in ["hello", "12a", "-5", "1 2"] {
        assert_eq!(lookup(&store, &gate, 5, text).await, LookupOutcome::InvalidFormat);
    }
    Ok(())
}

#[tokio::test]
async fn test_not_found_mentions_code() -> Result<()> {
    let dir = TempDir::new()?;
    let store = setup_store(&dir)?;
    let gate = gate(Some(MemberStatus::Member), FailurePolicy::Closed);

    let outcome = lookup(&store, &gate, 5, "12345").await;
    assert_eq!(
        outcome,
        LookupOutcome::NotFound {
            code: "12345".to_string()
        }
    );

    let reply = outcome.into_reply(&store.settings(), Some("en"));
    assert!(matches!(reply, Reply::Text { .. }));
    assert!(reply.body().contains("12345"));
    Ok(())
}

#[tokio::test]
async fn test_added_content_is_found() -> Result<()> {
    let dir = TempDir::new()?;
    let store = setup_store(&dir)?;
    let gate = gate(Some(MemberStatus::Administrator), FailurePolicy::Closed);

    let mut state = WizardState::Idle;
    for event in [
        WizardEvent::Start(Flow::AddContent),
        WizardEvent::Photo("P".to_string()),
        WizardEvent::Text("<b>Film</b>".to_string()),
        WizardEvent::Text("777".to_string()),
    ] {
        state = run_wizard(&store, state, event, None)?.state;
    }
    assert_eq!(state, WizardState::Idle);

    let outcome = lookup(&store, &gate, 5, " 777 ").await;
    let LookupOutcome::Found { code, record } = outcome.clone() else {
        panic!("Expected content to be found, got {outcome:?}");
    };
    assert_eq!(code, "777");
    assert_eq!(record.photo_id, "P");

    match outcome.into_reply(&store.settings(), Some("en")) {
        Reply::Photo {
            photo_id,
            caption,
            fallback,
            ..
        } => {
            assert_eq!(photo_id, "P");
            assert!(caption.contains("<b>Film</b>"));
            assert!(caption.contains("777"));
            assert!(fallback.contains("<b>Film</b>"));
        }
        other => panic!("Expected a photo reply, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_failure_policy() -> Result<()> {
    let dir = TempDir::new()?;
    let store = setup_store(&dir)?;

    let closed = gate(None, FailurePolicy::Closed);
    assert_eq!(lookup(&store, &closed, 5, "1").await, LookupOutcome::NotSubscribed);

    let open = gate(None, FailurePolicy::Open);
    assert_eq!(
        lookup(&store, &open, 5, "1").await,
        LookupOutcome::NotFound {
            code: "1".to_string()
        }
    );
    Ok(())
}

#[tokio::test]
async fn test_gate_queries_oracle_on_every_check() -> Result<()> {
    let oracle = FixedOracle::new(Some(MemberStatus::Creator));
    let gate = SubscriptionGate::new(oracle.clone(), FailurePolicy::Closed);

    assert!(gate.is_subscribed("@films", 5).await);
    assert!(gate.is_subscribed("@films", 6).await);
    assert_eq!(oracle.calls.load(Ordering::SeqCst), 2);
    Ok(())
}
