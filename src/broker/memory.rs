// src/broker/memory.rs
// In-memory broker: the default adapter used for local runs and the whole
// test suite. Keyed records are bucketed into a fixed number of
// partitions by a stable hash of the key, which preserves per-key ordering
// exactly the way a real partitioned log would.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::Notify;
use tracing::debug;

use crate::error::BrokerError;

use super::types::{BrokerMessage, Headers};
use super::Broker;

const DEFAULT_PARTITIONS: i32 = 3;

#[derive(Debug, Clone)]
struct StoredRecord {
    key: String,
    value: Vec<u8>,
    headers: Headers,
}

#[derive(Default)]
struct TopicLog {
    partitions: Vec<Vec<StoredRecord>>,
}

impl TopicLog {
    fn new(partitions: i32) -> Self {
        Self {
            partitions: vec![Vec::new(); partitions.max(1) as usize],
        }
    }

    fn partition_count(&self) -> i32 {
        self.partitions.len() as i32
    }
}

#[derive(Default)]
struct BrokerState {
    topics: HashMap<String, TopicLog>,
    // (group, topic, partition) -> next index to deliver
    cursors: HashMap<(String, String, i32), usize>,
}

/// An in-memory, partitioned, keyed log. Suitable for local development and
/// deterministic tests; not durable across process restarts.
pub struct InMemoryBroker {
    state: RwLock<BrokerState>,
    notify: Notify,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(BrokerState::default()),
            notify: Notify::new(),
        }
    }

    fn partition_for(partitions: i32, key: &str) -> i32 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % partitions.max(1) as u64) as i32
    }

    fn try_poll_once(&self, group: &str, topics: &[&str]) -> Option<BrokerMessage> {
        let mut state = self.state.write();
        for &topic in topics {
            let partition_count = match state.topics.get(topic) {
                Some(log) => log.partition_count(),
                None => continue,
            };
            for partition in 0..partition_count {
                let cursor_key = (group.to_string(), topic.to_string(), partition);
                let next_index = *state.cursors.get(&cursor_key).unwrap_or(&0);
                let log = state.topics.get(topic).unwrap();
                if let Some(record) = log.partitions[partition as usize].get(next_index) {
                    let message = BrokerMessage {
                        topic: topic.to_string(),
                        partition,
                        offset: next_index as i64,
                        key: record.key.clone(),
                        value: record.value.clone(),
                        headers: record.headers.clone(),
                    };
                    state.cursors.insert(cursor_key, next_index + 1);
                    return Some(message);
                }
            }
        }
        None
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn create_topic(&self, topic: &str, partitions: i32) -> Result<(), BrokerError> {
        let mut state = self.state.write();
        state
            .topics
            .entry(topic.to_string())
            .or_insert_with(|| TopicLog::new(if partitions > 0 { partitions } else { DEFAULT_PARTITIONS }));
        Ok(())
    }

    async fn produce(
        &self,
        topic: &str,
        key: &str,
        value: &[u8],
        headers: Headers,
    ) -> Result<(), BrokerError> {
        {
            let mut state = self.state.write();
            let log = state
                .topics
                .entry(topic.to_string())
                .or_insert_with(|| TopicLog::new(DEFAULT_PARTITIONS));
            let partition = Self::partition_for(log.partition_count(), key);
            log.partitions[partition as usize].push(StoredRecord {
                key: key.to_string(),
                value: value.to_vec(),
                headers,
            });
            debug!(topic, key, partition, "produced record");
        }
        self.notify.notify_waiters();
        Ok(())
    }

    async fn poll(
        &self,
        group: &str,
        topics: &[&str],
        timeout: Duration,
    ) -> Result<Option<BrokerMessage>, BrokerError> {
        if let Some(message) = self.try_poll_once(group, topics) {
            return Ok(Some(message));
        }
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            let notified = self.notify.notified();
            tokio::select! {
                _ = notified => {
                    if let Some(message) = self.try_poll_once(group, topics) {
                        return Ok(Some(message));
                    }
                }
                _ = tokio::time::sleep(remaining) => {
                    return Ok(None);
                }
            }
        }
    }

    async fn commit(&self, _group: &str, _message: &BrokerMessage) -> Result<(), BrokerError> {
        // Cursors already advance at delivery time (see `try_poll_once`);
        // commit exists for interface parity with a real broker and as the
        // point where a future durable-cursor implementation would persist.
        Ok(())
    }
}
