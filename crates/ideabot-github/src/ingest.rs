//! One-shot ingest run: fetch a page of updates past the persisted cursor,
//! file one issue per idea, confirm back to the sender.

use async_trait::async_trait;

use ideabot_core::{
    domain::UpdateId,
    ports::{MessagingPort, UpdateSource},
    update::{Message, UpdateBatch},
    Result,
};
use ideabot_telegram::TelegramApi;

use crate::{client::IssueTracker, cursor::CursorStore};

const NON_TEXT_PLACEHOLDER: &str = "<non-text message>";
const SNIPPET_MAX_CHARS: usize = 60;

/// `UpdateSource` over the non-blocking, paged `getUpdates` variant.
pub struct PagedSource {
    api: TelegramApi,
    limit: u32,
}

impl PagedSource {
    pub fn new(api: TelegramApi, limit: u32) -> Self {
        Self { api, limit }
    }
}

#[async_trait]
impl UpdateSource for PagedSource {
    async fn fetch(&self, offset: Option<UpdateId>) -> Result<UpdateBatch> {
        self.api.get_updates_page(offset, self.limit).await
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BridgeReport {
    pub created: usize,
    pub skipped: usize,
    pub cursor: Option<UpdateId>,
}

/// Drain one page of updates into the tracker.
///
/// The cursor advances over every fetched update, including skipped ones and
/// failed issue creations; a rerun therefore never files the same idea
/// twice, at the cost of dropping an idea whose creation failed. With an
/// unset cursor this is an initialization run: the backlog is acknowledged
/// without creating issues for it.
pub async fn run_once(
    source: &dyn UpdateSource,
    messenger: &dyn MessagingPort,
    tracker: &dyn IssueTracker,
    store: &CursorStore,
    label: &str,
) -> Result<BridgeReport> {
    let Some(cursor) = store.load()? else {
        println!("[bridge] no cursor found, acknowledging backlog without creating issues...");
        let batch = source.fetch(None).await?;
        let next = batch.next_offset.unwrap_or(UpdateId(1));
        store.save(next)?;
        println!("[bridge] initialized cursor -> {}", next.0);
        return Ok(BridgeReport {
            created: 0,
            skipped: 0,
            cursor: Some(next),
        });
    };

    println!("[bridge] fetching updates with offset={}", cursor.0);
    let batch = source.fetch(Some(cursor)).await?;
    if batch.updates.is_empty() {
        println!("[bridge] no new updates");
        return Ok(BridgeReport {
            created: 0,
            skipped: 0,
            cursor: Some(cursor),
        });
    }

    let mut created = 0usize;
    let mut skipped = 0usize;
    for update in &batch.updates {
        let Some(msg) = &update.message else {
            skipped += 1;
            continue;
        };

        let title = issue_title(msg);
        let body = issue_body(msg);
        match tracker.create_issue(&title, &body, &[label]).await {
            Ok(issue) => {
                created += 1;
                println!(
                    "[bridge] created issue #{} for update {}",
                    issue.number, update.update_id.0
                );
                let reply = format!(
                    "Спасибо! Ваша идея сохранена как issue #{}. Мы её рассмотрим.",
                    issue.number
                );
                if let Err(e) = messenger.send_text(msg.chat.id, &reply).await {
                    eprintln!("[bridge] reply to chat {} failed: {e}", msg.chat.id.0);
                }
            }
            Err(e) => {
                eprintln!(
                    "[bridge] creating issue for update {} failed: {e}",
                    update.update_id.0
                );
            }
        }
    }

    let next = batch.next_offset.unwrap_or(cursor);
    store.save(next)?;
    println!("[bridge] cursor -> {}", next.0);

    Ok(BridgeReport {
        created,
        skipped,
        cursor: Some(next),
    })
}

/// First line of the idea, capped for the issue title.
fn snippet(text: &str) -> String {
    let first_line = text.trim().split('\n').next().unwrap_or("");
    first_line.chars().take(SNIPPET_MAX_CHARS).collect()
}

fn issue_title(msg: &Message) -> String {
    let text = msg.text_or_caption().unwrap_or(NON_TEXT_PLACEHOLDER);
    let snippet = snippet(text);
    let snippet = if snippet.is_empty() {
        "(без текста)".to_string()
    } else {
        snippet
    };
    format!("Идея от {}: {snippet}", msg.sender_name())
}

fn issue_body(msg: &Message) -> String {
    let text = msg.text_or_caption().unwrap_or(NON_TEXT_PLACEHOLDER);
    let ts = chrono::DateTime::from_timestamp(msg.date, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_default();

    format!(
        "**Отправитель:** {}\n\
         **Чат id:** {} (type: {})\n\
         **Время (UTC):** {ts}\n\n\
         **Текст:**\n\n```\n{text}\n```\n\n\
         ---\nДобавлено автоматически из Telegram бот-предложения.",
        msg.sender_name(),
        msg.chat.id.0,
        msg.chat.kind,
    )
}
