//! The long-poll driver: fetch a batch, dispatch it, advance the cursor.

use std::{sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;

use crate::{
    dispatch::{Dispatcher, Outcome},
    domain::UpdateId,
    ports::UpdateSource,
};

#[derive(Clone, Copy, Debug)]
pub struct PollConfig {
    /// Pause after a failed fetch before trying again.
    pub error_sleep: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            error_sleep: Duration::from_secs(2),
        }
    }
}

/// Owns the update cursor and runs until cancelled.
///
/// The cursor only advances after a successful fetch of a non-empty batch,
/// so a crash mid-batch redelivers the whole batch on restart. Fetch
/// failures (already retried inside the client) trigger a fixed sleep and
/// another attempt, forever; a single update can never take the loop down.
pub struct Poller {
    source: Arc<dyn UpdateSource>,
    dispatcher: Dispatcher,
    cfg: PollConfig,
}

impl Poller {
    pub fn new(source: Arc<dyn UpdateSource>, dispatcher: Dispatcher, cfg: PollConfig) -> Self {
        Self {
            source,
            dispatcher,
            cfg,
        }
    }

    pub async fn run(&self, cancel: CancellationToken) {
        let mut offset: Option<UpdateId> = None;
        println!("[poll] starting long polling...");

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let fetched = tokio::select! {
              _ = cancel.cancelled() => break,
              res = self.source.fetch(offset) => res,
            };

            match fetched {
                Ok(batch) => {
                    for update in &batch.updates {
                        if let Outcome::Relayed {
                            welcomed,
                            forwarded,
                        } = self.dispatcher.dispatch(update).await
                        {
                            if !welcomed || !forwarded {
                                eprintln!(
                                    "[poll] partial relay for update {}: welcomed={welcomed} forwarded={forwarded}",
                                    update.update_id.0
                                );
                            }
                        }
                    }
                    if let Some(next) = batch.next_offset {
                        offset = Some(next);
                    }
                    self.dispatcher.sweep_idle().await;
                }
                Err(e) => {
                    eprintln!("[poll] fetch error: {e}");
                    tokio::select! {
                      _ = cancel.cancelled() => break,
                      _ = tokio::time::sleep(self.cfg.error_sleep) => {}
                    }
                }
            }
        }

        println!("[poll] stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::tests::{private_update, FakeMessenger, Sent};
    use crate::domain::{ChatId, MessageId};
    use crate::errors::Error;
    use crate::flood::{FloodConfig, FloodControl};
    use crate::update::UpdateBatch;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    /// Replays scripted fetch results and cancels the loop when it runs dry.
    struct ScriptedSource {
        script: StdMutex<VecDeque<crate::Result<UpdateBatch>>>,
        offsets_seen: StdMutex<Vec<Option<UpdateId>>>,
        cancel: CancellationToken,
    }

    impl ScriptedSource {
        fn new(script: Vec<crate::Result<UpdateBatch>>, cancel: CancellationToken) -> Self {
            Self {
                script: StdMutex::new(script.into()),
                offsets_seen: StdMutex::new(Vec::new()),
                cancel,
            }
        }

        fn offsets(&self) -> Vec<Option<UpdateId>> {
            self.offsets_seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl UpdateSource for ScriptedSource {
        async fn fetch(&self, offset: Option<UpdateId>) -> crate::Result<UpdateBatch> {
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(res) => {
                    self.offsets_seen.lock().unwrap().push(offset);
                    res
                }
                None => {
                    self.cancel.cancel();
                    Ok(UpdateBatch::default())
                }
            }
        }
    }

    fn batch(ids: &[i64]) -> UpdateBatch {
        let updates: Vec<_> = ids.iter().map(|&id| private_update(id, id, id)).collect();
        let next_offset = ids.iter().max().map(|&m| UpdateId(m + 1));
        UpdateBatch {
            updates,
            next_offset,
        }
    }

    fn poller(
        source: Arc<ScriptedSource>,
        messenger: Arc<FakeMessenger>,
    ) -> Poller {
        let dispatcher = Dispatcher::new(
            ChatId(-1000),
            messenger,
            FloodControl::new(FloodConfig::default()),
        );
        Poller::new(
            source,
            dispatcher,
            PollConfig {
                error_sleep: Duration::from_millis(0),
            },
        )
    }

    #[tokio::test]
    async fn cursor_advances_on_full_batches_and_survives_empty_ones() {
        let cancel = CancellationToken::new();
        let source = Arc::new(ScriptedSource::new(
            vec![
                Ok(batch(&[1, 2, 3])),
                Ok(UpdateBatch::default()),
                Ok(batch(&[7])),
            ],
            cancel.clone(),
        ));
        let messenger = Arc::new(FakeMessenger::default());
        let p = poller(source.clone(), messenger.clone());

        p.run(cancel).await;

        // The empty batch must not rewind or clear the cursor.
        assert_eq!(
            source.offsets(),
            vec![None, Some(UpdateId(4)), Some(UpdateId(4))]
        );

        // All four updates were relayed, in order.
        let forwarded: Vec<i64> = messenger
            .log()
            .iter()
            .filter_map(|s| match s {
                Sent::Forward { message_id, .. } => Some(message_id.0),
                _ => None,
            })
            .collect();
        assert_eq!(forwarded, vec![1, 2, 3, 7]);
    }

    #[tokio::test]
    async fn fetch_errors_are_retried_not_fatal() {
        let cancel = CancellationToken::new();
        let source = Arc::new(ScriptedSource::new(
            vec![
                Err(Error::api("getUpdates", "HTTP 500")),
                Err(Error::api("getUpdates", "HTTP 502")),
                Ok(batch(&[10])),
            ],
            cancel.clone(),
        ));
        let messenger = Arc::new(FakeMessenger::default());
        let p = poller(source.clone(), messenger.clone());

        p.run(cancel).await;

        // Both failures were absorbed and the batch after them still landed.
        assert_eq!(source.offsets().len(), 3);
        assert!(messenger.log().iter().any(|s| matches!(
            s,
            Sent::Forward {
                message_id: MessageId(10),
                ..
            }
        )));
    }

    #[tokio::test]
    async fn one_bad_update_does_not_stall_the_batch() {
        let cancel = CancellationToken::new();
        let source = Arc::new(ScriptedSource::new(
            vec![Ok(batch(&[20, 21, 22]))],
            cancel.clone(),
        ));
        // Every call for update 21's chat fails.
        let messenger = Arc::new(FakeMessenger {
            failing_chat: Some(ChatId(21)),
            ..FakeMessenger::default()
        });
        let p = poller(source.clone(), messenger.clone());

        p.run(cancel).await;

        let forwarded: Vec<i64> = messenger
            .log()
            .iter()
            .filter_map(|s| match s {
                Sent::Forward { message_id, .. } => Some(message_id.0),
                _ => None,
            })
            .collect();
        assert_eq!(forwarded, vec![20, 22]);
        // The cursor still covered the failing update.
        assert_eq!(source.offsets(), vec![None]);
    }
}
