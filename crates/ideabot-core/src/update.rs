//! Inbound wire types for the Bot API update stream.
//!
//! Parsing is deliberately lenient: only the fields the pipeline inspects are
//! typed, media payloads are kept as raw JSON, and everything optional
//! defaults so one odd update cannot poison a whole batch.

use serde::{Deserialize, Serialize};

use crate::domain::{ChatId, MessageId, UpdateId, UserId};

/// One fetched batch plus the cursor value for the next fetch.
///
/// `next_offset` is one past the highest `update_id` seen, or `None` when the
/// batch was empty (the caller keeps its previous cursor).
#[derive(Clone, Debug, Default)]
pub struct UpdateBatch {
    pub updates: Vec<Update>,
    pub next_offset: Option<UpdateId>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Update {
    pub update_id: UpdateId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub message_id: MessageId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<User>,
    pub chat: Chat,
    /// Unix timestamp assigned by the platform.
    #[serde(default)]
    pub date: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sticker: Option<serde_json::Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    /// `private`, `group`, `supergroup`, `channel`, ...
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

/// Content classification of a message, first matching key wins.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentKind {
    Text,
    Photo,
    Document,
    Voice,
    Video,
    Sticker,
    Other,
}

impl ContentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Text => "text",
            ContentKind::Photo => "photo",
            ContentKind::Document => "document",
            ContentKind::Voice => "voice",
            ContentKind::Video => "video",
            ContentKind::Sticker => "sticker",
            ContentKind::Other => "other",
        }
    }
}

impl Message {
    pub fn content_kind(&self) -> ContentKind {
        if self.text.is_some() {
            ContentKind::Text
        } else if self.photo.is_some() {
            ContentKind::Photo
        } else if self.document.is_some() {
            ContentKind::Document
        } else if self.voice.is_some() {
            ContentKind::Voice
        } else if self.video.is_some() {
            ContentKind::Video
        } else if self.sticker.is_some() {
            ContentKind::Sticker
        } else {
            ContentKind::Other
        }
    }

    pub fn is_private(&self) -> bool {
        self.chat.kind == "private"
    }

    pub fn sender_id(&self) -> Option<UserId> {
        self.from.as_ref().map(|u| u.id)
    }

    /// Display name for logs and issue titles: username, else first + last
    /// name, else `unknown`.
    pub fn sender_name(&self) -> String {
        let Some(user) = &self.from else {
            return "unknown".to_string();
        };
        if let Some(username) = user.username.as_deref() {
            if !username.trim().is_empty() {
                return username.to_string();
            }
        }
        let full = match user.last_name.as_deref() {
            Some(last) if !last.trim().is_empty() => {
                format!("{} {}", user.first_name.trim(), last.trim())
            }
            _ => user.first_name.trim().to_string(),
        };
        let full = full.trim().to_string();
        if full.is_empty() {
            "unknown".to_string()
        } else {
            full
        }
    }

    pub fn text_or_caption(&self) -> Option<&str> {
        self.text.as_deref().or(self.caption.as_deref())
    }
}
