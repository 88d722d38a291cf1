// src/broker/kafka.rs
// Production broker adapter backed by a real Kafka-compatible cluster via
// `rdkafka`. Gated behind the `kafka` feature so the default build doesn't
// need a system `librdkafka`.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::{Header, Headers as RdHeaders, Message, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord};
use tracing::warn;

use crate::config::BrokerConfig;
use crate::error::BrokerError;

use super::types::{BrokerMessage, Headers};
use super::Broker;

pub struct KafkaBroker {
    producer: FutureProducer,
    admin: AdminClient<DefaultClientContext>,
    bootstrap_servers: String,
    // One consumer per group is created lazily and cached so repeated
    // `poll`/`commit` calls reuse the same underlying subscription. Keyed by
    // group alone (not group+topic-set) so `commit`, which only knows the
    // group and the message's topic, can always find it.
    consumers: tokio::sync::Mutex<HashMap<String, StreamConsumer>>,
}

impl KafkaBroker {
    pub fn new(config: &BrokerConfig) -> Result<Self, BrokerError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.bootstrap_servers)
            .set("client.id", &config.client_id)
            .set("message.timeout.ms", "15000")
            .create()
            .map_err(|e| BrokerError::Transient(e.to_string()))?;

        let admin: AdminClient<DefaultClientContext> = ClientConfig::new()
            .set("bootstrap.servers", &config.bootstrap_servers)
            .create()
            .map_err(|e| BrokerError::Transient(e.to_string()))?;

        Ok(Self {
            producer,
            admin,
            bootstrap_servers: config.bootstrap_servers.clone(),
            consumers: tokio::sync::Mutex::new(HashMap::new()),
        })
    }

    async fn consumer_for(&self, group: &str, topics: &[&str]) -> Result<(), BrokerError> {
        let mut guard = self.consumers.lock().await;
        if guard.contains_key(group) {
            return Ok(());
        }
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &self.bootstrap_servers)
            .set("group.id", group)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .create()
            .map_err(|e| BrokerError::Transient(e.to_string()))?;
        consumer
            .subscribe(topics)
            .map_err(|e| BrokerError::Transient(e.to_string()))?;
        guard.insert(group.to_string(), consumer);
        Ok(())
    }
}

fn to_owned_headers(headers: &Headers) -> OwnedHeaders {
    let mut owned = OwnedHeaders::new();
    for key in ["tenant_id", "retry_count", "producer"] {
        if let Some(value) = headers.get(key) {
            owned = owned.insert(Header {
                key,
                value: Some(value.as_bytes()),
            });
        }
    }
    owned
}

fn from_borrowed_headers(headers: Option<&rdkafka::message::BorrowedHeaders>) -> Headers {
    let mut out = Headers::default();
    if let Some(headers) = headers {
        for i in 0..headers.count() {
            if let Ok(header) = headers.get_as::<str>(i) {
                if let Some(value) = header.value {
                    out.insert(header.key.to_string(), value.to_string());
                }
            }
        }
    }
    out
}

#[async_trait]
impl Broker for KafkaBroker {
    async fn create_topic(&self, topic: &str, partitions: i32) -> Result<(), BrokerError> {
        let new_topic = NewTopic::new(topic, partitions.max(1), TopicReplication::Fixed(1));
        let results = self
            .admin
            .create_topics(&[new_topic], &AdminOptions::new())
            .await
            .map_err(|e| BrokerError::Transient(e.to_string()))?;
        for result in results {
            if let Err((name, err)) = result {
                // Idempotent create: "topic already exists" is not an error.
                warn!(topic = %name, error = %err, "create_topic reported an error (may already exist)");
            }
        }
        Ok(())
    }

    async fn produce(
        &self,
        topic: &str,
        key: &str,
        value: &[u8],
        headers: Headers,
    ) -> Result<(), BrokerError> {
        let record = FutureRecord::to(topic)
            .key(key)
            .payload(value)
            .headers(to_owned_headers(&headers));
        self.producer
            .send(record, Duration::from_secs(15))
            .await
            .map_err(|(e, _)| BrokerError::Transient(e.to_string()))?;
        Ok(())
    }

    async fn poll(
        &self,
        group: &str,
        topics: &[&str],
        timeout: Duration,
    ) -> Result<Option<BrokerMessage>, BrokerError> {
        self.consumer_for(group, topics).await?;
        let guard = self.consumers.lock().await;
        let consumer = guard.get(group).expect("consumer just created");

        match tokio::time::timeout(timeout, consumer.recv()).await {
            Ok(Ok(borrowed)) => {
                let value = borrowed.payload().unwrap_or(&[]).to_vec();
                let key = borrowed
                    .key()
                    .map(|k| String::from_utf8_lossy(k).to_string())
                    .unwrap_or_default();
                Ok(Some(BrokerMessage {
                    topic: borrowed.topic().to_string(),
                    partition: borrowed.partition(),
                    offset: borrowed.offset(),
                    key,
                    value,
                    headers: from_borrowed_headers(borrowed.headers()),
                }))
            }
            Ok(Err(e)) => Err(BrokerError::Transient(e.to_string())),
            Err(_) => Ok(None),
        }
    }

    async fn commit(&self, group: &str, message: &BrokerMessage) -> Result<(), BrokerError> {
        let guard = self.consumers.lock().await;
        if let Some(consumer) = guard.get(group) {
            let mut tpl = rdkafka::TopicPartitionList::new();
            tpl.add_partition_offset(
                &message.topic,
                message.partition,
                rdkafka::Offset::Offset(message.offset + 1),
            )
            .map_err(|e| BrokerError::Transient(e.to_string()))?;
            consumer
                .commit(&tpl, rdkafka::consumer::CommitMode::Async)
                .map_err(|e| BrokerError::Transient(e.to_string()))?;
        }
        Ok(())
    }
}
