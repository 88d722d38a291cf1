// src/pipeline/broadcaster.rs
// Broadcaster: live subscribers keyed by (tenant, conversation), each
// with a bounded oldest-drop queue so a slow subscriber never blocks the
// Aggregator.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Notify;
use tracing::debug;
use uuid::Uuid;

use crate::domain::{AggregatedIntelligence, ConversationKey};

struct SubscriberQueue {
    items: parking_lot::Mutex<VecDeque<AggregatedIntelligence>>,
    capacity: usize,
    notify: Notify,
}

impl SubscriberQueue {
    fn new(capacity: usize) -> Self {
        Self {
            items: parking_lot::Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
            notify: Notify::new(),
        }
    }

    /// Enqueue, dropping the oldest item on overflow. Returns `true` if an
    /// item was dropped.
    fn push(&self, item: AggregatedIntelligence) -> bool {
        let dropped = {
            let mut queue = self.items.lock();
            let dropped = if queue.len() >= self.capacity {
                queue.pop_front();
                true
            } else {
                false
            };
            queue.push_back(item);
            dropped
        };
        self.notify.notify_one();
        dropped
    }

    async fn pop(&self) -> AggregatedIntelligence {
        loop {
            {
                let mut queue = self.items.lock();
                if let Some(item) = queue.pop_front() {
                    return item;
                }
            }
            self.notify.notified().await;
        }
    }
}

/// A handle to a live subscription. Dropping it does not unsubscribe;
/// callers must call `Broadcaster::unsubscribe` explicitly once their
/// connection closes (idempotent).
pub struct Subscriber {
    pub id: Uuid,
    pub key: ConversationKey,
    queue: Arc<SubscriberQueue>,
}

impl Subscriber {
    /// Awaits the next update for this conversation. Never returns a
    /// "dropped" notification directly; overflow is silent to the
    /// subscriber by design, visible only via `Broadcaster::dropped_total`.
    pub async fn recv(&self) -> AggregatedIntelligence {
        self.queue.pop().await
    }
}

pub struct Broadcaster {
    subscriptions: RwLock<HashMap<ConversationKey, Vec<(Uuid, Arc<SubscriberQueue>)>>>,
    cache: RwLock<HashMap<ConversationKey, AggregatedIntelligence>>,
    queue_depth: usize,
    dropped_total: AtomicU64,
}

impl Broadcaster {
    pub fn new(queue_depth: usize) -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            cache: RwLock::new(HashMap::new()),
            queue_depth,
            dropped_total: AtomicU64::new(0),
        }
    }

    /// Registers a subscriber and, if a cached view already exists for
    /// `key`, delivers it synchronously into the new queue ("connected" +
    /// immediate snapshot).
    pub fn subscribe(&self, key: ConversationKey) -> Subscriber {
        let queue = Arc::new(SubscriberQueue::new(self.queue_depth));
        let id = Uuid::new_v4();
        self.subscriptions
            .write()
            .entry(key.clone())
            .or_default()
            .push((id, queue.clone()));

        if let Some(snapshot) = self.cache.read().get(&key).cloned() {
            queue.push(snapshot);
        }
        debug!(conversation = %key, subscriber = %id, "subscriber registered");
        Subscriber { id, key, queue }
    }

    /// Publishes the latest merged view to the cache and every live
    /// subscriber for `key`. Never blocks on a slow subscriber.
    pub fn publish(&self, key: &ConversationKey, intelligence: AggregatedIntelligence) {
        self.cache.write().insert(key.clone(), intelligence.clone());
        let subs = self.subscriptions.read().get(key).cloned().unwrap_or_default();
        for (_, queue) in subs {
            if queue.push(intelligence.clone()) {
                self.dropped_total.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Idempotent: removing an already-absent subscriber is a no-op.
    pub fn unsubscribe(&self, key: &ConversationKey, subscriber: &Subscriber) {
        let mut guard = self.subscriptions.write();
        if let Some(subs) = guard.get_mut(key) {
            subs.retain(|(id, _)| *id != subscriber.id);
            if subs.is_empty() {
                guard.remove(key);
            }
        }
    }

    pub fn dropped_total(&self) -> u64 {
        self.dropped_total.load(Ordering::Relaxed)
    }

    pub fn cached(&self, key: &ConversationKey) -> Option<AggregatedIntelligence> {
        self.cache.read().get(key).cloned()
    }

    pub fn subscriber_count(&self, key: &ConversationKey) -> usize {
        self.subscriptions.read().get(key).map(Vec::len).unwrap_or(0)
    }
}
