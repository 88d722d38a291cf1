// src/broker/mod.rs
// Broker Adapter: a thin abstraction over a keyed, partitioned log.

pub mod memory;
pub mod types;
#[cfg(feature = "kafka")]
pub mod kafka;

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::BrokerError;
pub use types::{BrokerMessage, Headers};

/// Minimal broker contract every implementation must satisfy. Exactly-once
/// is not required; downstream components are idempotent under
/// last-writer-wins.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Idempotent topic creation; a no-op if the topic already exists.
    async fn create_topic(&self, topic: &str, partitions: i32) -> Result<(), BrokerError>;

    /// Produce a record, preserving per-key ordering within the topic.
    async fn produce(
        &self,
        topic: &str,
        key: &str,
        value: &[u8],
        headers: Headers,
    ) -> Result<(), BrokerError>;

    /// Produce a `serde`-encoded value as the compact text encoding
    /// (`serde_json`) this core standardizes on.
    async fn produce_json<T: Serialize + Sync>(
        &self,
        topic: &str,
        key: &str,
        value: &T,
        headers: Headers,
    ) -> Result<(), BrokerError> {
        let bytes = serde_json::to_vec(value)?;
        self.produce(topic, key, &bytes, headers).await
    }

    /// Poll for the next message visible to `group` across `topics`,
    /// blocking up to `timeout`. Returns `None` on timeout.
    async fn poll(
        &self,
        group: &str,
        topics: &[&str],
        timeout: Duration,
    ) -> Result<Option<BrokerMessage>, BrokerError>;

    /// Durably record that `group` has consumed up to and including this
    /// message's offset.
    async fn commit(&self, group: &str, message: &BrokerMessage) -> Result<(), BrokerError>;
}
