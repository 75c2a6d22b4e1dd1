//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules for better organization:
//! - `schema`: Wires updates to handlers and the per-chat wizard dialogue
//! - `message_handler`: Handles commands, code lookups and wizard input
//! - `callback_handler`: Handles inline keyboard callback queries
//! - `router`: Classifies updates and resolves lookups, transport independent
//! - `dialogue_manager`: Applies wizard transitions to the store
//! - `ui_builder`: Creates keyboards and formats messages
//! - `render`: Delivers replies with a text fallback for photos

pub mod callback_handler;
pub mod dialogue_manager;
pub mod message_handler;
pub mod render;
pub mod router;
pub mod schema;
pub mod ui_builder;

use teloxide::adaptors::DefaultParseMode;
use teloxide::Bot;

/// Bot handle used by all handlers; messages are sent with HTML parse mode
pub type CatalogBot = DefaultParseMode<Bot>;

// Re-export main handler functions for use in main.rs
pub use callback_handler::callback_handler;
pub use message_handler::{command_handler, message_handler, Command};
pub use schema::schema;

// Re-export the transport independent pieces used by tests
pub use dialogue_manager::{run_wizard, step_wizard, user_dialogue, Applied};
pub use render::Reply;
pub use router::{lookup, route_message, CallbackAction, LookupOutcome, Payload, Role, Route};
