//! Inbound message queue and request/reply correlation.
//!
//! The reader task is the only producer; the sync engine and the
//! dispatcher task are consumers. A message is consumed exactly once:
//! either claimed by a [`DispatchQueue::wait_for_kind`] caller as the
//! reply it was waiting on, or removed by [`DispatchQueue::drain_auto`]
//! as an unsolicited event. Waiters block on a [`Notify`] wakeup per
//! enqueue instead of polling.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, Notify};
use tokio::time::{timeout_at, Duration, Instant};
use tracing::{debug, warn};

use crate::codec::Message;
use crate::constants::{AUTO_DISPATCH_KINDS, QUEUE_CAPACITY, STALE_AFTER_SECS};
use crate::error::{ElkError, Result};

struct Queued {
    message: Message,
    received_at: Instant,
}

/// Bounded FIFO of received, not-yet-consumed messages.
pub struct DispatchQueue {
    inner: Mutex<VecDeque<Queued>>,
    notify: Notify,
    closed: AtomicBool,
}

impl DispatchQueue {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(64)),
            notify: Notify::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Append a received message and wake any waiters. Never blocks;
    /// past capacity the oldest entry is dropped.
    pub async fn enqueue(&self, message: Message) {
        if self.is_closed() {
            debug!("queue closed, dropping {} message", message.kind);
            return;
        }
        {
            let mut queue = self.inner.lock().await;
            if queue.len() >= QUEUE_CAPACITY {
                if let Some(dropped) = queue.pop_front() {
                    warn!(
                        "dispatch queue full, dropping oldest {} message",
                        dropped.message.kind
                    );
                }
            }
            queue.push_back(Queued {
                message,
                received_at: Instant::now(),
            });
        }
        self.notify.notify_waiters();
    }

    /// Wait until a message of `kind` arrives, remove it and return it.
    ///
    /// Removes at most one message; everything else stays queued for
    /// later waits or auto-dispatch. Fails with
    /// [`ElkError::ReplyTimeout`] once `timeout` elapses, or
    /// [`ElkError::Disconnected`] when the queue is closed with no
    /// matching message left.
    pub async fn wait_for_kind(&self, kind: &str, timeout: Duration) -> Result<Message> {
        let deadline = Instant::now() + timeout;
        loop {
            // Arm the wakeup before scanning so an enqueue between the
            // scan and the await cannot be missed.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(message) = self.take_first(kind).await {
                return Ok(message);
            }
            if self.is_closed() {
                return Err(ElkError::Disconnected);
            }
            if timeout_at(deadline, notified).await.is_err() {
                return Err(ElkError::ReplyTimeout {
                    kind: kind.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
        }
    }

    async fn take_first(&self, kind: &str) -> Option<Message> {
        let mut queue = self.inner.lock().await;
        let pos = queue.iter().position(|q| q.message.kind == kind)?;
        queue.remove(pos).map(|q| q.message)
    }

    /// Sweep the queue once: evict entries older than the staleness
    /// threshold and remove every message whose kind is in the
    /// auto-dispatch set, returning those in arrival order for routing.
    pub async fn drain_auto(&self) -> Vec<Message> {
        let stale_after = Duration::from_secs(STALE_AFTER_SECS);
        let now = Instant::now();
        let mut auto = Vec::new();

        let mut queue = self.inner.lock().await;
        queue.retain(|q| {
            if now.duration_since(q.received_at) > stale_after {
                warn!("evicting stale {} message from queue", q.message.kind);
                return false;
            }
            if AUTO_DISPATCH_KINDS.contains(&q.message.kind.as_str()) {
                auto.push(q.message.clone());
                return false;
            }
            true
        });
        auto
    }

    /// Mark the queue closed and wake all waiters. Subsequent enqueues
    /// are dropped; pending waits fail once no matching message is left.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

impl Default for DispatchQueue {
    fn default() -> Self {
        Self::new()
    }
}
