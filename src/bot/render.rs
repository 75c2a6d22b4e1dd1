//! Reply rendering: rich photo replies with a plain-text fallback tier

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{FileId, InlineKeyboardMarkup, InputFile, MessageId};
use teloxide::{ApiError, RequestError};
use tracing::{debug, warn};

use super::CatalogBot;
use crate::errors::RenderError;

/// A response to deliver to a chat
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Text {
        text: String,
        keyboard: Option<InlineKeyboardMarkup>,
    },
    /// Photo with caption; `fallback` is sent as text if the photo cannot be delivered
    Photo {
        photo_id: String,
        caption: String,
        fallback: String,
        keyboard: Option<InlineKeyboardMarkup>,
    },
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply::Text {
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn with_keyboard(self, markup: InlineKeyboardMarkup) -> Self {
        match self {
            Reply::Text { text, .. } => Reply::Text {
                text,
                keyboard: Some(markup),
            },
            Reply::Photo {
                photo_id,
                caption,
                fallback,
                ..
            } => Reply::Photo {
                photo_id,
                caption,
                fallback,
                keyboard: Some(markup),
            },
        }
    }

    /// The text a user reads: message text, or the caption of a photo
    pub fn body(&self) -> &str {
        match self {
            Reply::Text { text, .. } => text,
            Reply::Photo { caption, .. } => caption,
        }
    }

    pub fn keyboard(&self) -> Option<&InlineKeyboardMarkup> {
        match self {
            Reply::Text { keyboard, .. } | Reply::Photo { keyboard, .. } => keyboard.as_ref(),
        }
    }
}

async fn send_text(
    bot: &CatalogBot,
    chat_id: ChatId,
    text: String,
    keyboard: Option<InlineKeyboardMarkup>,
) -> Result<()> {
    let mut request = bot.send_message(chat_id, text);
    if let Some(markup) = keyboard {
        request = request.reply_markup(markup);
    }
    request.await?;
    Ok(())
}

async fn send_photo(
    bot: &CatalogBot,
    chat_id: ChatId,
    photo_id: String,
    caption: String,
    keyboard: Option<InlineKeyboardMarkup>,
) -> Result<(), RenderError> {
    let mut request = bot
        .send_photo(chat_id, InputFile::file_id(FileId(photo_id)))
        .caption(caption);
    if let Some(markup) = keyboard {
        request = request.reply_markup(markup);
    }
    request.await?;
    Ok(())
}

/// Send a reply as a new message.
///
/// Photo replies are attempted first; an upstream failure substitutes the
/// text fallback.
pub async fn send_reply(bot: &CatalogBot, chat_id: ChatId, reply: Reply) -> Result<()> {
    match reply {
        Reply::Text { text, keyboard } => send_text(bot, chat_id, text, keyboard).await,
        Reply::Photo {
            photo_id,
            caption,
            fallback,
            keyboard,
        } => match send_photo(bot, chat_id, photo_id, caption, keyboard.clone()).await {
            Ok(()) => Ok(()),
            Err(RenderError::UpstreamUnavailable(e)) => {
                warn!(chat_id = %chat_id, error = %e, "Photo delivery failed, sending text fallback");
                send_text(bot, chat_id, fallback, keyboard).await
            }
        },
    }
}

/// Replace the text of an existing message, sending a new one if the edit is rejected
pub async fn edit_reply(bot: &CatalogBot, chat_id: ChatId, message_id: MessageId, reply: Reply) -> Result<()> {
    let (text, keyboard) = match reply {
        Reply::Text { text, keyboard } => (text, keyboard),
        photo => return send_reply(bot, chat_id, photo).await,
    };

    let mut request = bot.edit_message_text(chat_id, message_id, text.clone());
    if let Some(markup) = keyboard.clone() {
        request = request.reply_markup(markup);
    }

    match request.await {
        Ok(_) => Ok(()),
        Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(()),
        Err(e) => {
            debug!(chat_id = %chat_id, error = %e, "Message edit rejected, sending a new message");
            send_text(bot, chat_id, text, keyboard).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_keyboard_keeps_content() {
        let reply = Reply::Photo {
            photo_id: "p".to_string(),
            caption: "caption".to_string(),
            fallback: "fallback".to_string(),
            keyboard: None,
        }
        .with_keyboard(InlineKeyboardMarkup::default());

        assert_eq!(reply.body(), "caption");
        assert!(reply.keyboard().is_some());
    }
}
