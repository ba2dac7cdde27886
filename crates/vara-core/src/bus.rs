// ── Command event bus ──
//
// Fans parsed command records out to any number of subscribers, each
// filtered by event kind. Delivery is best-effort: every subscriber has a
// bounded inbox and a full inbox drops the new event for that subscriber
// only, so a slow consumer never stalls ingestion of the command channel.
//
// High-frequency events (`BUFFER`) are therefore lossy. The terminal
// `DISCONNECTED` event is not: every subscriber implicitly receives it,
// and closing the bus closes every inbox right after, so a pending
// `recv()` always resolves even if the inbox was full.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering, fence};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::trace;

use vara_api::{Command, EventKind};

/// Inbox size used by [`EventBus::default`].
pub const DEFAULT_INBOX_CAPACITY: usize = 64;

/// Publish/subscribe hub for one session's command events.
///
/// Cheaply cloneable. There is a single publisher (the session's command
/// loop); subscribers come and go from any task.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

struct BusInner {
    subscribers: DashMap<u64, Subscriber>,
    next_id: AtomicU64,
    closed: AtomicBool,
    capacity: usize,
}

struct Subscriber {
    kinds: Box<[EventKind]>,
    tx: mpsc::Sender<Command>,
}

impl Subscriber {
    fn wants(&self, kind: EventKind) -> bool {
        kind == EventKind::Disconnected || self.kinds.contains(&kind)
    }

    /// Deliver the terminal event (if there is room) and close the inbox.
    fn terminate(self) {
        let _ = self.tx.try_send(Command::Disconnected);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_INBOX_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(BusInner {
                subscribers: DashMap::new(),
                next_id: AtomicU64::new(0),
                closed: AtomicBool::new(false),
                capacity: capacity.max(1),
            }),
        }
    }

    /// Register interest in `kinds`. `Disconnected` is always included.
    ///
    /// Subscribing to a closed bus is allowed: the subscription yields the
    /// terminal `Disconnected` event and then ends.
    pub fn subscribe(&self, kinds: &[EventKind]) -> Subscription {
        let (tx, rx) = mpsc::channel(self.inner.capacity);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.subscribers.insert(
            id,
            Subscriber {
                kinds: kinds.into(),
                tx,
            },
        );

        // Pairs with the fence in `close`: either close sees this entry or
        // we see the flag. Whoever removes the entry delivers the terminal event.
        fence(Ordering::SeqCst);
        if self.inner.closed.load(Ordering::SeqCst) {
            if let Some((_, sub)) = self.inner.subscribers.remove(&id) {
                sub.terminate();
            }
        }

        Subscription {
            id,
            rx,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver `cmd` to every interested subscriber without blocking.
    ///
    /// Publishing `Disconnected` closes the bus.
    pub fn publish(&self, cmd: &Command) {
        if cmd.is_disconnected() {
            self.close();
            return;
        }
        if self.is_closed() {
            return;
        }

        let kind = cmd.kind();
        let targets: Vec<(u64, mpsc::Sender<Command>)> = self
            .inner
            .subscribers
            .iter()
            .filter(|entry| entry.wants(kind))
            .map(|entry| (*entry.key(), entry.tx.clone()))
            .collect();

        for (id, tx) in targets {
            match tx.try_send(cmd.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    trace!(subscriber = id, %kind, "subscriber inbox full, event dropped");
                }
                Err(TrySendError::Closed(_)) => {
                    self.inner.subscribers.remove(&id);
                }
            }
        }
    }

    /// Broadcast the terminal `Disconnected` event and close every inbox.
    ///
    /// Idempotent. Later subscribers receive the terminal event as well.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        fence(Ordering::SeqCst);

        let ids: Vec<u64> = self.inner.subscribers.iter().map(|e| *e.key()).collect();
        for id in ids {
            if let Some((_, sub)) = self.inner.subscribers.remove(&id) {
                sub.terminate();
            }
        }
        trace!("event bus closed");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }
}

// ── Subscription ─────────────────────────────────────────────────────

/// Receiving end of a bus registration. Dropping it deregisters.
pub struct Subscription {
    id: u64,
    rx: mpsc::Receiver<Command>,
    bus: Weak<BusInner>,
}

impl Subscription {
    /// Next event, or `None` once the bus has closed this inbox.
    ///
    /// `None` means the same thing as `Disconnected`: there will be no
    /// further events for this session.
    pub async fn recv(&mut self) -> Option<Command> {
        self.rx.recv().await
    }

    /// Non-blocking variant of [`recv`](Self::recv).
    pub fn try_recv(&mut self) -> Option<Command> {
        self.rx.try_recv().ok()
    }

    /// Resolve once the session is over, discarding any other events.
    pub async fn disconnected(&mut self) {
        while let Some(cmd) = self.rx.recv().await {
            if cmd.is_disconnected() {
                return;
            }
        }
    }

    /// Deregister from the bus. Never blocks; safe to call repeatedly.
    pub fn cancel(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.subscribers.remove(&self.id);
        }
        self.rx.close();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

// ── Tests ────────────────────────────────────────────────────────────
