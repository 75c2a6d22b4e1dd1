//! # Catalog Gate Bot
//!
//! A Telegram bot that hands out catalog entries (a photo and a description)
//! by numeric code to users subscribed to a configured channel, with an
//! admin wizard for managing the catalog and the bot's settings.

pub mod bot;
pub mod config;
pub mod errors;
pub mod gate;
pub mod localization;
pub mod store;
pub mod wizard;
