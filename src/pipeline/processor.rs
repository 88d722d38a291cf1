// src/pipeline/processor.rs
// Conversation Processor: the only component that mutates
// `ConversationState`, and the loop-guard that keeps state<->summary
// acyclic.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::broker::{Broker, BrokerMessage, Headers};
use crate::config::{SupervisorConfig, TopicsConfig};
use crate::domain::{ConversationKey, ConversationState, SummaryResult, SupportMessage};
use crate::error::ProcessorError;

const CONSUMER_GROUP: &str = "conversation-processor";

pub struct ConversationProcessor {
    broker: Arc<dyn Broker>,
    topics: TopicsConfig,
    window: usize,
    max_retries: u32,
    state: RwLock<HashMap<ConversationKey, ConversationState>>,
}

impl ConversationProcessor {
    pub fn new(broker: Arc<dyn Broker>, topics: TopicsConfig, supervisor: &SupervisorConfig) -> Self {
        Self {
            broker,
            topics,
            window: supervisor.recent_messages_window,
            max_retries: supervisor.processor_max_retries,
            state: RwLock::new(HashMap::new()),
        }
    }

    pub fn snapshot(&self, key: &ConversationKey) -> Option<ConversationState> {
        self.state.read().get(key).cloned()
    }

    /// Drains `messages.raw` and `ai.summary` until `cancel` fires.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        info!("conversation processor starting");
        let topics = [self.topics.messages_raw.as_str(), self.topics.ai_summary.as_str()];
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("conversation processor shutting down");
                    break;
                }
                polled = self.broker.poll(CONSUMER_GROUP, &topics, Duration::from_millis(500)) => {
                    match polled {
                        Ok(Some(message)) => self.handle(message).await,
                        Ok(None) => {}
                        Err(e) => warn!(error = %e, "processor poll error"),
                    }
                }
            }
        }
    }

    async fn handle(&self, message: BrokerMessage) {
        if message.topic == self.topics.messages_raw {
            self.handle_raw_message(message).await;
        } else if message.topic == self.topics.ai_summary {
            self.handle_summary(message).await;
        } else {
            warn!(topic = %message.topic, "processor received message for unexpected topic");
        }
    }

    /// Appends to state, emits `conversations.state`, commits.
    async fn handle_raw_message(&self, message: BrokerMessage) {
        let parsed: Result<SupportMessage, _> = message.decode();
        let support_message = match parsed {
            Ok(msg) => msg,
            Err(e) => {
                self.route_to_dlq(&message, &e.to_string()).await;
                return;
            }
        };

        let key = ConversationKey::new(support_message.tenant_id.clone(), support_message.conversation_id.clone());
        let updated = {
            let mut guard = self.state.write();
            let entry = guard
                .entry(key.clone())
                .or_insert_with(|| ConversationState::new(key.tenant_id.clone(), key.conversation_id.clone()));
            entry.record_message(support_message, self.window);
            entry.clone()
        };

        let headers = Headers::new(key.tenant_id.clone());
        if let Err(e) = self
            .broker
            .produce_json(&self.topics.conversations_state, &key.conversation_id, &updated, headers)
            .await
        {
            warn!(error = %e, conversation = %key, "failed to emit conversations.state");
            return;
        }
        let _ = self.broker.commit(CONSUMER_GROUP, &message).await;
        debug!(conversation = %key, message_count = updated.message_count, "state emitted");
    }

    /// Updates the cached summary only; never emits (loop guard).
    async fn handle_summary(&self, message: BrokerMessage) {
        let parsed: Result<SummaryResult, _> = message.decode();
        let summary = match parsed {
            Ok(summary) => summary,
            Err(e) => {
                self.route_to_dlq(&message, &e.to_string()).await;
                return;
            }
        };

        let key = ConversationKey::new(summary.tenant_id.clone(), summary.conversation_id.clone());
        let adopted = {
            let mut guard = self.state.write();
            match guard.get_mut(&key) {
                Some(state) => Some(state.maybe_adopt_summary(summary)),
                None => None,
            }
        };

        match adopted {
            Some(true) => debug!(conversation = %key, "summary adopted into cached state"),
            Some(false) => debug!(conversation = %key, "stale summary ignored"),
            None => {
                let err = ProcessorError::UnknownConversation {
                    tenant_id: key.tenant_id.clone(),
                    conversation_id: key.conversation_id.clone(),
                };
                warn!(error = %err, "dropping summary");
            }
        }
        let _ = self.broker.commit(CONSUMER_GROUP, &message).await;
    }

    async fn route_to_dlq(&self, message: &BrokerMessage, error: &str) {
        let retries = message.headers.retry_count();
        let poison_err = ProcessorError::PoisonRecord {
            detail: error.to_string(),
            retries,
            max_retries: self.max_retries,
        };

        if retries < self.max_retries {
            let headers = message.headers.clone().with_retry_count(retries + 1);
            if let Err(e) = self
                .broker
                .produce(&message.topic, &message.key, &message.value, headers)
                .await
                .map_err(ProcessorError::Broker)
            {
                warn!(error = %e, "failed to requeue poison record");
            }
            let _ = self.broker.commit(CONSUMER_GROUP, message).await;
            return;
        }

        warn!(topic = %message.topic, error = %poison_err, "routing poison record to dlq");
        crate::metrics::record_dlq();
        let dlq_payload = json!({
            "original_topic": message.topic,
            "payload": String::from_utf8_lossy(&message.value),
            "error": error,
            "retry_count": retries,
            "timestamp": Utc::now(),
        });
        let headers = message.headers.clone();
        let _ = self
            .broker
            .produce_json(&self.broker_dlq_topic(), &message.key, &dlq_payload, headers)
            .await;
        let _ = self.broker.commit(CONSUMER_GROUP, message).await;
    }

    fn broker_dlq_topic(&self) -> String {
        self.topics.dlq.clone()
    }
}
