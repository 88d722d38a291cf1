// src/pipeline/aggregator.rs
// Aggregator: folds the four result streams into one merged view per
// conversation and hands each update to the Broadcaster.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::broker::{Broker, BrokerMessage, Headers};
use crate::config::TopicsConfig;
use crate::domain::{AggregatedIntelligence, ConversationKey, InsightsResult, PiiResult, SentimentResult, SummaryResult};

use super::broadcaster::Broadcaster;

const CONSUMER_GROUP: &str = "intelligence-aggregator";

pub struct Aggregator {
    broker: Arc<dyn Broker>,
    topics: TopicsConfig,
    broadcaster: Arc<Broadcaster>,
    state: RwLock<HashMap<ConversationKey, AggregatedIntelligence>>,
}

impl Aggregator {
    pub fn new(broker: Arc<dyn Broker>, topics: TopicsConfig, broadcaster: Arc<Broadcaster>) -> Self {
        Self {
            broker,
            topics,
            broadcaster,
            state: RwLock::new(HashMap::new()),
        }
    }

    pub fn snapshot(&self, key: &ConversationKey) -> Option<AggregatedIntelligence> {
        self.state.read().get(key).cloned()
    }

    /// Drains all four analyzer result topics under a single consumer group.
    /// The originating topic is the primary discriminator.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        info!("aggregator starting");
        let topics = [
            self.topics.ai_sentiment.as_str(),
            self.topics.ai_pii.as_str(),
            self.topics.ai_insights.as_str(),
            self.topics.ai_summary.as_str(),
        ];
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("aggregator shutting down");
                    break;
                }
                polled = self.broker.poll(CONSUMER_GROUP, &topics, Duration::from_millis(500)) => {
                    match polled {
                        Ok(Some(message)) => self.handle(message).await,
                        Ok(None) => {}
                        Err(e) => warn!(error = %e, "aggregator poll error"),
                    }
                }
            }
        }
    }

    async fn handle(&self, message: BrokerMessage) {
        let merged = if message.topic == self.topics.ai_sentiment {
            self.fold(&message, |agg, result: SentimentResult| agg.apply_sentiment(result))
        } else if message.topic == self.topics.ai_pii {
            self.fold(&message, |agg, result: PiiResult| agg.apply_pii(&result))
        } else if message.topic == self.topics.ai_insights {
            self.fold(&message, |agg, result: InsightsResult| agg.apply_insights(result))
        } else if message.topic == self.topics.ai_summary {
            self.fold(&message, |agg, result: SummaryResult| agg.apply_summary(result))
        } else {
            warn!(topic = %message.topic, "aggregator received message for unexpected topic");
            None
        };

        if let Some((key, snapshot)) = merged {
            let headers = Headers::new(key.tenant_id.clone());
            if let Err(e) = self
                .broker
                .produce_json(&self.topics.ai_aggregated, &key.conversation_id, &snapshot, headers)
                .await
            {
                warn!(error = %e, conversation = %key, "failed to emit aggregated intelligence");
            }
            self.broadcaster.publish(&key, snapshot);
            debug!(conversation = %key, "aggregated intelligence updated");
        }

        let _ = self.broker.commit(CONSUMER_GROUP, &message).await;
    }

    /// Decodes the message's payload as `T` and applies `apply` to the
    /// conversation's merged view, returning the key and updated snapshot.
    fn fold<T, F>(&self, message: &BrokerMessage, apply: F) -> Option<(ConversationKey, AggregatedIntelligence)>
    where
        T: TenantConversation + serde::de::DeserializeOwned,
        F: FnOnce(&mut AggregatedIntelligence, T),
    {
        let result: T = match message.decode() {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, topic = %message.topic, "failed to decode analyzer result");
                return None;
            }
        };
        let key = ConversationKey::new(result.tenant_id().to_string(), result.conversation_id().to_string());

        let mut guard = self.state.write();
        let entry = guard
            .entry(key.clone())
            .or_insert_with(|| AggregatedIntelligence::new(key.tenant_id.clone(), key.conversation_id.clone()));
        apply(entry, result);
        entry.touch();
        Some((key, entry.clone()))
    }
}

/// Lets `fold` stay generic over the four analyzer result types without
/// duplicating the dispatch-and-lock boilerplate per topic.
trait TenantConversation {
    fn tenant_id(&self) -> &str;
    fn conversation_id(&self) -> &str;
}

impl TenantConversation for SentimentResult {
    fn tenant_id(&self) -> &str {
        &self.tenant_id
    }
    fn conversation_id(&self) -> &str {
        &self.conversation_id
    }
}

impl TenantConversation for PiiResult {
    fn tenant_id(&self) -> &str {
        &self.tenant_id
    }
    fn conversation_id(&self) -> &str {
        &self.conversation_id
    }
}

impl TenantConversation for InsightsResult {
    fn tenant_id(&self) -> &str {
        &self.tenant_id
    }
    fn conversation_id(&self) -> &str {
        &self.conversation_id
    }
}

impl TenantConversation for SummaryResult {
    fn tenant_id(&self) -> &str {
        &self.tenant_id
    }
    fn conversation_id(&self) -> &str {
        &self.conversation_id
    }
}
