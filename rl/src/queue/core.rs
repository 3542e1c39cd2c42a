//! AdmissionQueue - actor that owns the pending set and drains it through
//! the pacer, one item at a time

use std::any::Any;
use std::collections::BinaryHeap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use eyre::{Context, Result};
use futures::FutureExt;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::classify::{Classify, OverloadPolicy};
use crate::config::Config;
use crate::domain::Priority;
use crate::pacer::{AdaptivePacer, PacerConfig};

use super::item::{Job, Outcome, Settle, WorkItem};
use super::messages::{QueueCommand, QueueEntry, QueueState, QueueStats};
use super::ticket::{QueueError, Ticket};

/// Handle to submit work to an admission queue
///
/// Cloneable; every clone feeds the same single drain loop. The actor stops
/// once all handles are dropped and every pending item has been settled.
#[derive(Clone)]
pub struct AdmissionQueue {
    name: Arc<str>,
    tx: mpsc::UnboundedSender<QueueCommand>,
    next_id: Arc<AtomicU64>,
}

impl AdmissionQueue {
    /// Spawn a queue with its own private pacer
    ///
    /// Fails if the pacer config is invalid or no Tokio runtime is running.
    pub fn spawn(name: impl Into<String>, pacer: PacerConfig, policy: OverloadPolicy) -> Result<Self> {
        let name = name.into();
        let pacer = AdaptivePacer::new(pacer).with_context(|| format!("Failed to build pacer for lane {}", name))?;
        Self::with_pacer(name, Arc::new(pacer), policy)
    }

    /// Spawn a queue around an existing pacer
    ///
    /// Queues sharing a pacer share its delay; use this only when that
    /// coupling is wanted. Fails outside a Tokio runtime.
    pub fn with_pacer(name: impl Into<String>, pacer: Arc<AdaptivePacer>, policy: OverloadPolicy) -> Result<Self> {
        let name: Arc<str> = Arc::from(name.into());
        debug!(lane = %name, ?policy, "AdmissionQueue::with_pacer: called");
        let runtime = tokio::runtime::Handle::try_current()
            .with_context(|| format!("Admission queue {} must be created inside a Tokio runtime", name))?;
        let (tx, rx) = mpsc::unbounded_channel();

        let actor = QueueActor {
            name: name.clone(),
            pacer,
            policy,
            pending: BinaryHeap::new(),
            draining: false,
            stats: QueueStats::default(),
        };
        runtime.spawn(actor.run(rx));

        info!(lane = %name, "AdmissionQueue spawned");
        Ok(Self {
            name,
            tx,
            next_id: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Spawn a queue tuned for the named provider, falling back to the
    /// default provider for unknown names
    pub fn for_provider(config: &Config, provider: &str) -> Result<Self> {
        debug!(%provider, "AdmissionQueue::for_provider: called");
        let (resolved, settings) = config.resolve_provider(provider);
        Self::spawn(resolved, settings.pacer, config.overload.clone())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Enqueue an operation and get a ticket for its outcome
    ///
    /// The operation is not started here; it runs when the drain loop
    /// reaches it. Fails immediately only if the queue actor is gone.
    pub fn submit<F, Fut, T, E>(&self, priority: impl Into<Priority>, operation: F) -> Result<Ticket<T, E>, QueueError<E>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Classify + Send + 'static,
    {
        let priority = priority.into();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(lane = %self.name, id, %priority, "submit: called");

        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job = Box::new(move || {
            async move {
                let caught = AssertUnwindSafe(async move { operation().await }).catch_unwind().await;
                let (outcome, result) = match caught {
                    Ok(Ok(value)) => (Outcome::Succeeded, Ok(value)),
                    Ok(Err(err)) => (Outcome::Failed(err.signal()), Err(QueueError::Operation(err))),
                    Err(payload) => {
                        let message = panic_message(&*payload);
                        (Outcome::Panicked(message.clone()), Err(QueueError::Panicked { id, message }))
                    }
                };
                let settle: Settle = Box::new(move || {
                    if reply_tx.send(result).is_err() {
                        debug!(id, "submit: ticket dropped, discarding result");
                    }
                });
                (outcome, settle)
            }
            .boxed()
        });

        self.tx
            .send(QueueCommand::Submit(WorkItem::new(id, priority, job)))
            .map_err(|_| QueueError::Closed)?;

        Ok(Ticket::new(id, reply_rx))
    }

    /// Submit and wait for the outcome
    pub async fn run<F, Fut, T, E>(&self, priority: impl Into<Priority>, operation: F) -> Result<T, QueueError<E>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Classify + Send + 'static,
    {
        self.submit(priority, operation)?.await
    }

    /// Get current queue state
    pub async fn state(&self) -> Result<QueueState> {
        debug!(lane = %self.name, "state: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(QueueCommand::State { reply: reply_tx })
            .map_err(|_| eyre::eyre!("Admission queue {} closed", self.name))?;
        reply_rx
            .await
            .map_err(|_| eyre::eyre!("Admission queue {} dropped state request", self.name))
    }

    /// Get pending items in dispatch order
    pub async fn details(&self) -> Result<Vec<QueueEntry>> {
        debug!(lane = %self.name, "details: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(QueueCommand::Details { reply: reply_tx })
            .map_err(|_| eyre::eyre!("Admission queue {} closed", self.name))?;
        reply_rx
            .await
            .map_err(|_| eyre::eyre!("Admission queue {} dropped details request", self.name))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

impl std::fmt::Debug for AdmissionQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionQueue").field("name", &self.name).finish()
    }
}

/// State owned by the drain task
struct QueueActor {
    name: Arc<str>,
    pacer: Arc<AdaptivePacer>,
    policy: OverloadPolicy,
    pending: BinaryHeap<WorkItem>,
    draining: bool,
    stats: QueueStats,
}

impl QueueActor {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<QueueCommand>) {
        debug!(lane = %self.name, "QueueActor::run: started");

        loop {
            // Pick up everything already submitted before choosing the next item
            while let Ok(cmd) = rx.try_recv() {
                self.handle(cmd).await;
            }

            let Some(item) = self.pending.pop() else {
                match rx.recv().await {
                    Some(cmd) => {
                        self.handle(cmd).await;
                        continue;
                    }
                    None => break,
                }
            };

            self.draining = true;
            self.dispatch(item, &mut rx).await;
            if self.pending.is_empty() {
                debug!(lane = %self.name, "QueueActor::run: pending empty, drain loop idle");
                self.draining = false;
            }
        }

        info!(lane = %self.name, stats = ?self.stats, "AdmissionQueue stopped");
    }

    /// Pace, execute, feed back, settle
    ///
    /// Commands keep being served while the item pauses and runs, so later
    /// submissions still take part in the priority order for the next pick.
    async fn dispatch(&mut self, item: WorkItem, rx: &mut mpsc::UnboundedReceiver<QueueCommand>) {
        let WorkItem {
            id,
            priority,
            submitted_at,
            job,
        } = item;
        let waited = submitted_at.elapsed();
        self.stats.total_wait_time_ms += waited.as_millis() as u64;
        debug!(lane = %self.name, id, %priority, ?waited, "QueueActor::dispatch: called");

        let pacer = self.pacer.clone();
        let work = async move {
            pacer.pause_before_next().await;
            job().await
        };
        tokio::pin!(work);

        let mut open = true;
        let (outcome, settle) = loop {
            tokio::select! {
                biased;
                done = &mut work => break done,
                cmd = rx.recv(), if open => match cmd {
                    Some(cmd) => self.handle(cmd).await,
                    None => open = false,
                },
            }
        };

        match outcome {
            Outcome::Succeeded => {
                debug!(lane = %self.name, id, "QueueActor::dispatch: succeeded");
                self.stats.total_succeeded += 1;
                self.pacer.on_success_signal().await;
            }
            Outcome::Failed(signal) => {
                self.stats.total_failed += 1;
                if self.policy.is_overload(&signal) {
                    warn!(lane = %self.name, id, ?signal, "Provider signalled overload");
                    self.stats.total_overloads += 1;
                    self.pacer.on_overload_signal().await;
                } else {
                    debug!(lane = %self.name, id, ?signal, "QueueActor::dispatch: failed, pacer untouched");
                }
            }
            Outcome::Panicked(message) => {
                error!(lane = %self.name, id, %message, "Operation panicked, continuing with next item");
                self.stats.total_failed += 1;
                self.stats.total_panicked += 1;
            }
        }

        settle();
    }

    async fn handle(&mut self, cmd: QueueCommand) {
        match cmd {
            QueueCommand::Submit(item) => {
                debug!(lane = %self.name, id = item.id, priority = %item.priority, "QueueActor::handle: enqueue");
                self.pending.push(item);
                self.stats.total_submitted += 1;
                self.stats.peak_queue_depth = self.stats.peak_queue_depth.max(self.pending.len());
            }
            QueueCommand::State { reply } => {
                let state = QueueState {
                    pending: self.pending.len(),
                    draining: self.draining,
                    current_delay: self.pacer.current_delay().await,
                    stats: self.stats.clone(),
                };
                let _ = reply.send(state);
            }
            QueueCommand::Details { reply } => {
                let mut entries: Vec<_> = self
                    .pending
                    .iter()
                    .map(|item| QueueEntry {
                        id: item.id,
                        priority: item.priority,
                        waited: item.submitted_at.elapsed(),
                    })
                    .collect();
                entries.sort_by_key(|e| (e.priority, e.id));
                let _ = reply.send(entries);
            }
        }
    }
}
