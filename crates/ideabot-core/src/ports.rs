use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageId, UpdateId},
    update::UpdateBatch,
    Result,
};

/// Outbound side of the Bot API as used by the dispatcher and the bridge.
///
/// Kept as a port so both can be exercised against fakes.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    /// Plain-text message, link previews disabled.
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()>;

    /// HTML-formatted message, link previews disabled.
    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<()>;

    /// Forward an existing message into another chat.
    async fn forward_message(&self, to: ChatId, from: ChatId, message_id: MessageId)
        -> Result<()>;
}

/// Inbound side: a cursor-gated source of update batches.
///
/// Implementations decide whether `fetch` long-polls (the relay) or returns
/// immediately (the issue bridge).
#[async_trait]
pub trait UpdateSource: Send + Sync {
    async fn fetch(&self, offset: Option<UpdateId>) -> Result<UpdateBatch>;
}
