// src/services/broadcaster.rs

//! Bounded concurrent fan-out of one message to many chats.
//!
//! Every recipient gets its own task. A semaphore caps the number of tasks
//! with a request in flight. The first error lands in a set-once cell and
//! cancels the run: tasks that have not started sending give up, tasks
//! already sending finish. External shutdown aborts everything.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, Result};
use crate::models::ChatId;

/// Delivers a message to a single chat.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Send `text` to `chat_id`, aborting when `cancel` fires.
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<()>;
}

/// Classification of a failed delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    Transport,
    Decode,
    Rejected { code: i64, description: String },
    Cancelled,
    Other,
}

impl FailureKind {
    fn of(error: &AppError) -> Self {
        match error {
            AppError::Transport { .. } => Self::Transport,
            AppError::Decode { .. } => Self::Decode,
            AppError::Rejected {
                code, description, ..
            } => Self::Rejected {
                code: *code,
                description: description.clone(),
            },
            AppError::Cancelled => Self::Cancelled,
            _ => Self::Other,
        }
    }
}

/// What happened to one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Failed(FailureKind),
    /// Never reached the API because the run was cancelled first
    Skipped,
}

/// Per-recipient outcomes plus the first error observed.
#[derive(Debug, Default)]
pub struct BroadcastReport {
    /// Outcomes in recipient-list order
    pub outcomes: Vec<(ChatId, DeliveryOutcome)>,
    first_error: Option<AppError>,
}

impl BroadcastReport {
    pub fn delivered(&self) -> usize {
        self.count(|o| matches!(o, DeliveryOutcome::Delivered))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, DeliveryOutcome::Failed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, DeliveryOutcome::Skipped))
    }

    /// Recipients whose delivery reached the sender.
    pub fn attempted(&self) -> usize {
        self.delivered() + self.failed()
    }

    pub fn outcome(&self, chat_id: ChatId) -> Option<&DeliveryOutcome> {
        self.outcomes
            .iter()
            .find(|(id, _)| *id == chat_id)
            .map(|(_, outcome)| outcome)
    }

    pub fn first_error(&self) -> Option<&AppError> {
        self.first_error.as_ref()
    }

    /// The first error, or `Cancelled` if deliveries were skipped without one.
    pub fn into_result(self) -> Result<()> {
        if let Some(error) = self.first_error {
            return Err(error);
        }
        if self.skipped() > 0 {
            return Err(AppError::Cancelled);
        }
        Ok(())
    }

    fn count(&self, pred: impl Fn(&DeliveryOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }
}

/// Fans a message out to every recipient with a concurrency cap.
pub struct Broadcaster {
    sender: Arc<dyn MessageSender>,
    max_concurrent: usize,
}

impl Broadcaster {
    pub fn new(sender: Arc<dyn MessageSender>, max_concurrent: usize) -> Self {
        Self {
            sender,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Deliver `text` to every recipient and wait for all tasks.
    pub async fn broadcast(
        &self,
        text: &str,
        recipients: &[ChatId],
        cancel: &CancellationToken,
    ) -> BroadcastReport {
        let run = cancel.child_token();
        let permits = Arc::new(Semaphore::new(self.max_concurrent));
        let first_error = Arc::new(OnceLock::new());
        let text: Arc<str> = Arc::from(text);

        let handles: Vec<_> = recipients
            .iter()
            .map(|&chat_id| {
                let task = Delivery {
                    sender: Arc::clone(&self.sender),
                    permits: Arc::clone(&permits),
                    first_error: Arc::clone(&first_error),
                    text: Arc::clone(&text),
                    run: run.clone(),
                    shutdown: cancel.clone(),
                };
                (chat_id, tokio::spawn(task.run(chat_id)))
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (chat_id, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    log::error!("delivery task for {chat_id} did not complete: {e}");
                    if first_error.set(AppError::from(e)).is_ok() {
                        run.cancel();
                    }
                    DeliveryOutcome::Failed(FailureKind::Other)
                }
            };
            outcomes.push((chat_id, outcome));
        }

        let first_error = Arc::into_inner(first_error).and_then(OnceLock::into_inner);
        let report = BroadcastReport {
            outcomes,
            first_error,
        };

        log::info!(
            "Broadcast finished: {} delivered, {} failed, {} skipped",
            report.delivered(),
            report.failed(),
            report.skipped()
        );
        report
    }
}

/// State moved into one delivery task.
struct Delivery {
    sender: Arc<dyn MessageSender>,
    permits: Arc<Semaphore>,
    first_error: Arc<OnceLock<AppError>>,
    text: Arc<str>,
    /// Cancelled by the first failure or by shutdown
    run: CancellationToken,
    /// Cancelled only by shutdown
    shutdown: CancellationToken,
}

impl Delivery {
    async fn run(self, chat_id: ChatId) -> DeliveryOutcome {
        if self.run.is_cancelled() {
            log::debug!("delivery to {chat_id} skipped: run cancelled");
            return DeliveryOutcome::Skipped;
        }

        // A free slot launches immediately; waiting for one yields to cancellation.
        let _permit = match self.permits.try_acquire() {
            Ok(permit) => permit,
            Err(_) => tokio::select! {
                biased;
                _ = self.run.cancelled() => {
                    log::debug!("delivery to {chat_id} skipped: run cancelled");
                    return DeliveryOutcome::Skipped;
                }
                permit = self.permits.acquire() => match permit {
                    Ok(permit) => permit,
                    Err(_) => return DeliveryOutcome::Skipped,
                },
            },
        };

        // No new transport call once a sibling has failed.
        if self.run.is_cancelled() {
            log::debug!("delivery to {chat_id} skipped: run cancelled");
            return DeliveryOutcome::Skipped;
        }

        log::debug!("sending telegram message to {chat_id}");
        match self
            .sender
            .send_message(chat_id, &self.text, &self.shutdown)
            .await
        {
            Ok(()) => {
                log::debug!("message delivered to {chat_id}");
                DeliveryOutcome::Delivered
            }
            Err(error) => {
                let kind = FailureKind::of(&error);
                log::error!("delivery to {chat_id} failed: {error}");
                if self.first_error.set(error).is_ok() {
                    self.run.cancel();
                }
                DeliveryOutcome::Failed(kind)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    /// Records calls and peak concurrency; fails for chosen chats.
    #[derive(Default)]
    struct FakeSender {
        delay: Duration,
        reject: HashSet<ChatId>,
        fail_fast: HashSet<ChatId>,
        failed: AtomicBool,
        late_calls: AtomicUsize,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: Mutex<Vec<ChatId>>,
    }

    impl FakeSender {
        fn with_delay(delay: Duration) -> Self {
            Self {
                delay,
                ..Self::default()
            }
        }

        fn rejecting(mut self, chat_id: ChatId) -> Self {
            self.reject.insert(chat_id);
            self
        }

        /// Reject `chat_id` without yielding to the runtime.
        fn failing_fast(mut self, chat_id: ChatId) -> Self {
            self.fail_fast.insert(chat_id);
            self
        }

        fn calls(&self) -> Vec<ChatId> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MessageSender for FakeSender {
        async fn send_message(
            &self,
            chat_id: ChatId,
            _text: &str,
            cancel: &CancellationToken,
        ) -> Result<()> {
            self.calls.lock().unwrap().push(chat_id);
            if self.failed.load(Ordering::SeqCst) {
                self.late_calls.fetch_add(1, Ordering::SeqCst);
            }
            if self.fail_fast.contains(&chat_id) {
                self.failed.store(true, Ordering::SeqCst);
                return Err(AppError::Rejected {
                    recipient: chat_id,
                    code: 400,
                    description: "Bad Request".to_string(),
                });
            }

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let result = tokio::select! {
                _ = cancel.cancelled() => Err(AppError::Cancelled),
                _ = tokio::time::sleep(self.delay) => {
                    if self.reject.contains(&chat_id) {
                        Err(AppError::Rejected {
                            recipient: chat_id,
                            code: 400,
                            description: "Bad Request".to_string(),
                        })
                    } else {
                        Ok(())
                    }
                }
            };

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_never_exceeds_cap() {
        let sender = Arc::new(FakeSender::with_delay(Duration::from_millis(50)));
        let broadcaster = Broadcaster::new(sender.clone(), 10);
        let recipients: Vec<ChatId> = (1..=15).collect();

        let report = broadcaster
            .broadcast("hola", &recipients, &CancellationToken::new())
            .await;

        assert_eq!(sender.calls().len(), 15);
        assert_eq!(sender.peak.load(Ordering::SeqCst), 10);
        assert_eq!(report.delivered(), 15);
        assert!(report.into_result().is_ok());
    }

    #[tokio::test]
    async fn test_rejection_does_not_stop_other_recipients() {
        let sender = Arc::new(FakeSender::with_delay(Duration::from_millis(10)).rejecting(3));
        let broadcaster = Broadcaster::new(sender.clone(), 10);
        let recipients: Vec<ChatId> = (1..=6).collect();

        let report = broadcaster
            .broadcast("hola", &recipients, &CancellationToken::new())
            .await;

        let mut calls = sender.calls();
        calls.sort_unstable();
        assert_eq!(calls, recipients);
        assert_eq!(report.delivered(), 5);
        assert_eq!(
            report.outcome(3),
            Some(&DeliveryOutcome::Failed(FailureKind::Rejected {
                code: 400,
                description: "Bad Request".to_string()
            }))
        );

        match report.into_result() {
            Err(AppError::Rejected {
                recipient,
                code,
                description,
            }) => {
                assert_eq!(recipient, 3);
                assert_eq!(code, 400);
                assert_eq!(description, "Bad Request");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_first_error_skips_waiting_tasks() {
        let sender = Arc::new(
            FakeSender::with_delay(Duration::from_millis(20))
                .rejecting(1)
                .rejecting(2)
                .rejecting(3)
                .rejecting(4),
        );
        let broadcaster = Broadcaster::new(sender.clone(), 1);

        let report = broadcaster
            .broadcast("hola", &[1, 2, 3, 4], &CancellationToken::new())
            .await;

        assert_eq!(sender.calls().len(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.skipped(), 3);
        assert!(matches!(
            report.into_result(),
            Err(AppError::Rejected { .. })
        ));
    }

    #[tokio::test]
    async fn test_first_error_stops_new_calls_with_free_permits() {
        let sender =
            Arc::new(FakeSender::with_delay(Duration::from_millis(20)).failing_fast(1));
        let broadcaster = Broadcaster::new(sender.clone(), 10);
        let recipients: Vec<ChatId> = (1..=15).collect();

        let report = broadcaster
            .broadcast("hola", &recipients, &CancellationToken::new())
            .await;

        assert_eq!(sender.late_calls.load(Ordering::SeqCst), 0);
        assert_eq!(sender.calls(), vec![1]);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.delivered(), 0);
        assert_eq!(report.skipped(), 14);
        assert!(matches!(
            report.into_result(),
            Err(AppError::Rejected { recipient: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_cancelled_before_start_makes_no_calls() {
        let sender = Arc::new(FakeSender::default());
        let broadcaster = Broadcaster::new(sender.clone(), 10);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = broadcaster.broadcast("hola", &[1, 2, 3], &cancel).await;

        assert!(sender.calls().is_empty());
        assert_eq!(report.skipped(), 3);
        assert!(matches!(report.into_result(), Err(AppError::Cancelled)));
    }

    #[tokio::test]
    async fn test_shutdown_during_flight_reports_cancellation() {
        let sender = Arc::new(FakeSender::with_delay(Duration::from_secs(30)));
        let broadcaster = Broadcaster::new(sender.clone(), 10);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let report = broadcaster.broadcast("hola", &[1, 2], &cancel).await;

        assert_eq!(sender.calls().len(), 2);
        assert_eq!(report.failed(), 2);
        assert_eq!(
            report.outcome(1),
            Some(&DeliveryOutcome::Failed(FailureKind::Cancelled))
        );
        assert!(matches!(report.into_result(), Err(AppError::Cancelled)));
    }

    #[tokio::test]
    async fn test_empty_recipient_list() {
        let broadcaster = Broadcaster::new(Arc::new(FakeSender::default()), 10);
        let report = broadcaster
            .broadcast("hola", &[], &CancellationToken::new())
            .await;
        assert!(report.outcomes.is_empty());
        assert!(report.into_result().is_ok());
    }
}
