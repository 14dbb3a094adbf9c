//! Per-update handling: classify, flood-gate, welcome + forward.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    domain::ChatId,
    flood::{FloodControl, Verdict},
    ports::MessagingPort,
    update::Update,
};

/// Welcome sent to every accepted idea, HTML parse mode.
const WELCOME_HTML: &str = "👋 <b>Добро пожаловать!</b>\n\n\
Спасибо, что написали боту идей. Отправьте свою идею в одном сообщении — \
<b>краткий заголовок</b> и несколько предложений. 📝\n\
Можно приложить фото или файл. 📸\n\n\
После отправки <b>админ получит уведомление</b> и ответит при необходимости. ✅";

/// What one `dispatch` call did, with per-call results kept visible instead
/// of being swallowed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// No message, non-private chat, or no sender id: nothing to do.
    Ignored,
    /// Flood-limited; the sender was (best-effort) warned.
    Denied,
    /// Welcome + forward were attempted; the flags record which succeeded.
    Relayed { welcomed: bool, forwarded: bool },
}

/// Applies the flood limiter and triggers the welcome/forward side effects.
///
/// All outbound failures are contained here: each call is attempted
/// independently and a failure is logged, never propagated, so one flaky
/// send can not stall the update stream.
pub struct Dispatcher {
    admin_chat: ChatId,
    messenger: Arc<dyn MessagingPort>,
    flood: Mutex<FloodControl>,
}

impl Dispatcher {
    pub fn new(admin_chat: ChatId, messenger: Arc<dyn MessagingPort>, flood: FloodControl) -> Self {
        Self {
            admin_chat,
            messenger,
            flood: Mutex::new(flood),
        }
    }

    pub async fn dispatch(&self, update: &Update) -> Outcome {
        let Some(msg) = &update.message else {
            return Outcome::Ignored;
        };
        if !msg.is_private() {
            return Outcome::Ignored;
        }
        let Some(sender) = msg.sender_id() else {
            return Outcome::Ignored;
        };

        let chat_id = msg.chat.id;
        println!(
            "[update] user_id={} @{} chat_id={} message_id={} type={}",
            sender.0,
            msg.sender_name(),
            chat_id.0,
            msg.message_id.0,
            msg.content_kind().as_str()
        );

        let verdict = { self.flood.lock().await.check(sender) };
        if let Verdict::Denied(reason) = verdict {
            if let Err(e) = self.messenger.send_text(chat_id, reason.user_text()).await {
                eprintln!("[flood] warn failed: {e}");
            }
            return Outcome::Denied;
        }

        let welcomed = match self.messenger.send_html(chat_id, WELCOME_HTML).await {
            Ok(()) => {
                println!("[welcome] sent");
                true
            }
            Err(e) => {
                eprintln!("[welcome] error: {e}");
                false
            }
        };

        let forwarded = match self
            .messenger
            .forward_message(self.admin_chat, chat_id, msg.message_id)
            .await
        {
            Ok(()) => {
                println!("[forward] OK -> admin");
                true
            }
            Err(e) => {
                eprintln!("[forward] error: {e}");
                false
            }
        };

        Outcome::Relayed {
            welcomed,
            forwarded,
        }
    }

    /// Evict idle flood entries; called by the poll loop between batches.
    pub async fn sweep_idle(&self) {
        self.flood.lock().await.sweep();
    }
}
