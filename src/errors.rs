//! # Error Types Module
//!
//! This module defines the error types shared by the store, the subscription
//! gate and configuration loading. Wizard input errors live next to the
//! wizard itself because they are never propagated, only re-prompted.

use thiserror::Error;

/// Errors raised by the content store
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record with this code is already in the catalog
    #[error("content with code {0} already exists")]
    AlreadyExists(String),
    /// Reading or rewriting the backing file failed
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The backing document could not be encoded or decoded
    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised while asking the messaging transport about channel membership
#[derive(Debug, Error)]
pub enum GateError {
    /// The membership query itself failed (network, unknown chat, bot not in channel)
    #[error("membership query failed: {0}")]
    Request(#[from] teloxide::RequestError),
    /// The configured channel identifier is empty
    #[error("invalid channel identifier: {0:?}")]
    InvalidChannel(String),
}

/// Failure of the rich rendering tier (photo delivery)
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(#[from] teloxide::RequestError),
}

/// Errors raised while reading process configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid admin id in ADMIN_IDS: {0:?}")]
    InvalidAdminId(String),
    #[error("invalid subscription failure policy: {0:?} (expected \"closed\" or \"open\")")]
    InvalidPolicy(String),
}
