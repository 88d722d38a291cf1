// src/broker/types.rs
// Wire-level shapes shared by every broker implementation.

use std::collections::HashMap;

/// Headers carried on every produced record. `retry_count` and `tenant_id`
/// are always present; additional headers may be added freely.
#[derive(Debug, Clone, Default)]
pub struct Headers(HashMap<String, String>);

impl Headers {
    pub fn new(tenant_id: impl Into<String>) -> Self {
        let mut map = HashMap::new();
        map.insert("tenant_id".to_string(), tenant_id.into());
        map.insert("retry_count".to_string(), "0".to_string());
        map.insert("producer".to_string(), "support-intel".to_string());
        Self(map)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn retry_count(&self) -> u32 {
        self.get("retry_count").and_then(|v| v.parse().ok()).unwrap_or(0)
    }

    pub fn with_retry_count(mut self, count: u32) -> Self {
        self.insert("retry_count", count.to_string());
        self
    }

    pub fn tenant_id(&self) -> Option<&str> {
        self.get("tenant_id")
    }
}

/// A record delivered to a consumer, carrying enough broker metadata for
/// per-conversation ordering and offset-based merge decisions.
#[derive(Debug, Clone)]
pub struct BrokerMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: String,
    pub value: Vec<u8>,
    pub headers: Headers,
}

impl BrokerMessage {
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.value)
    }
}
