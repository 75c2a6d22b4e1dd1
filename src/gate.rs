//! # Subscription Gate Module
//!
//! Decides whether a user may look up content by asking the messaging
//! transport whether they belong to the configured channel.

use std::sync::Arc;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatMemberKind, Recipient};
use tracing::{debug, warn};

use crate::config::FailurePolicy;
use crate::errors::GateError;

/// Membership status of a user in a chat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberStatus {
    Creator,
    Administrator,
    Member,
    Restricted,
    Left,
    Kicked,
}

impl MemberStatus {
    /// Whether this status counts as subscribed
    pub fn grants_access(self) -> bool {
        matches!(
            self,
            MemberStatus::Creator | MemberStatus::Administrator | MemberStatus::Member
        )
    }
}

impl From<&ChatMemberKind> for MemberStatus {
    fn from(kind: &ChatMemberKind) -> Self {
        if kind.is_owner() {
            MemberStatus::Creator
        } else if kind.is_administrator() {
            MemberStatus::Administrator
        } else if kind.is_member() {
            MemberStatus::Member
        } else if kind.is_restricted() {
            MemberStatus::Restricted
        } else if kind.is_left() {
            MemberStatus::Left
        } else {
            MemberStatus::Kicked
        }
    }
}

/// Source of truth for channel membership
#[async_trait]
pub trait MembershipOracle: Send + Sync {
    async fn member_status(&self, channel_id: &str, user_id: u64) -> Result<MemberStatus, GateError>;
}

/// Membership oracle backed by the Telegram `getChatMember` method
#[derive(Clone)]
pub struct TelegramOracle {
    bot: Bot,
}

impl TelegramOracle {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

/// Interpret a configured channel identifier: `@name` or a numeric chat id
pub fn parse_channel(channel_id: &str) -> Result<Recipient, GateError> {
    let trimmed = channel_id.trim();
    if trimmed.is_empty() {
        return Err(GateError::InvalidChannel(channel_id.to_string()));
    }

    match trimmed.parse::<i64>() {
        Ok(id) => Ok(Recipient::Id(ChatId(id))),
        Err(_) if trimmed.starts_with('@') => Ok(Recipient::ChannelUsername(trimmed.to_string())),
        Err(_) => Ok(Recipient::ChannelUsername(format!("@{trimmed}"))),
    }
}

#[async_trait]
impl MembershipOracle for TelegramOracle {
    async fn member_status(&self, channel_id: &str, user_id: u64) -> Result<MemberStatus, GateError> {
        let recipient = parse_channel(channel_id)?;
        let member = self.bot.get_chat_member(recipient, UserId(user_id)).await?;
        Ok(MemberStatus::from(&member.kind))
    }
}

/// Channel subscription check in front of content lookup
#[derive(Clone)]
pub struct SubscriptionGate {
    oracle: Arc<dyn MembershipOracle>,
    policy: FailurePolicy,
}

impl SubscriptionGate {
    pub fn new(oracle: Arc<dyn MembershipOracle>, policy: FailurePolicy) -> Self {
        Self { oracle, policy }
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Whether `user_id` is subscribed to `channel_id`.
    ///
    /// Oracle failures are logged and resolved by the failure policy; they
    /// never reach the caller.
    pub async fn is_subscribed(&self, channel_id: &str, user_id: u64) -> bool {
        match self.oracle.member_status(channel_id, user_id).await {
            Ok(status) => {
                debug!(user_id, channel_id = %channel_id, status = ?status, "Membership checked");
                status.grants_access()
            }
            Err(e) => {
                let allowed = self.policy == FailurePolicy::Open;
                warn!(
                    user_id,
                    channel_id = %channel_id,
                    error = %e,
                    allowed,
                    "Subscription check failed, applying failure policy"
                );
                allowed
            }
        }
    }
}
