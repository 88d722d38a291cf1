// src/config/mod.rs
// Central configuration for the pipeline, composed from domain sub-configs
// the same way the rest of this ambient stack is organized.

pub mod helpers;

use serde::{Deserialize, Serialize};

/// Topic names, overridable per deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicsConfig {
    pub messages_raw: String,
    pub conversations_state: String,
    pub ai_sentiment: String,
    pub ai_pii: String,
    pub ai_insights: String,
    pub ai_summary: String,
    pub ai_aggregated: String,
    pub dlq: String,
}

impl TopicsConfig {
    pub fn from_env() -> Self {
        Self {
            messages_raw: helpers::env_or("TOPIC_MESSAGES_RAW", "messages.raw"),
            conversations_state: helpers::env_or("TOPIC_CONVERSATIONS_STATE", "conversations.state"),
            ai_sentiment: helpers::env_or("TOPIC_AI_SENTIMENT", "ai.sentiment"),
            ai_pii: helpers::env_or("TOPIC_AI_PII", "ai.pii"),
            ai_insights: helpers::env_or("TOPIC_AI_INSIGHTS", "ai.insights"),
            ai_summary: helpers::env_or("TOPIC_AI_SUMMARY", "ai.summary"),
            ai_aggregated: helpers::env_or("TOPIC_AI_AGGREGATED", "ai.aggregated"),
            dlq: helpers::env_or("TOPIC_DLQ", "dlq"),
        }
    }

    pub fn all(&self) -> Vec<&str> {
        vec![
            &self.messages_raw,
            &self.conversations_state,
            &self.ai_sentiment,
            &self.ai_pii,
            &self.ai_insights,
            &self.ai_summary,
            &self.ai_aggregated,
            &self.dlq,
        ]
    }
}

/// Model Client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub requests_per_minute: u32,
    pub max_concurrent_requests: usize,
    pub max_retries: u32,
    pub request_timeout_seconds: u64,
    pub mock_mode: bool,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
}

impl ModelConfig {
    pub fn from_env() -> Self {
        Self {
            requests_per_minute: helpers::env_parsed_or("MODEL_REQUESTS_PER_MINUTE", 60),
            max_concurrent_requests: helpers::env_parsed_or("MAX_CONCURRENT_MODEL_REQUESTS", 10),
            max_retries: helpers::env_parsed_or("MODEL_MAX_RETRIES", 3),
            request_timeout_seconds: helpers::env_parsed_or("MODEL_REQUEST_TIMEOUT_SECONDS", 15),
            // Defaults to true: the pipeline must be runnable without a live
            // model provider configured.
            mock_mode: helpers::env_bool_or("MOCK_MODE", true),
            endpoint: std::env::var("MODEL_ENDPOINT").ok(),
            api_key: std::env::var("MODEL_API_KEY").ok(),
        }
    }
}

/// Broker bootstrap configuration. Only consulted by the `kafka` feature's
/// adapter; the in-memory broker ignores it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    pub bootstrap_servers: String,
    pub client_id: String,
    pub poll_timeout_ms: u64,
}

impl BrokerConfig {
    pub fn from_env() -> Self {
        // Only the `kafka` feature's adapter actually dials out to this
        // address, so only it requires the variable to be set.
        #[cfg(feature = "kafka")]
        let bootstrap_servers = helpers::require_env("BROKER_BOOTSTRAP_SERVERS");
        #[cfg(not(feature = "kafka"))]
        let bootstrap_servers = helpers::env_or("BROKER_BOOTSTRAP_SERVERS", "localhost:9092");

        Self {
            bootstrap_servers,
            client_id: helpers::env_or("BROKER_CLIENT_ID", "support-intel"),
            poll_timeout_ms: helpers::env_parsed_or("BROKER_POLL_TIMEOUT_MS", 1_000),
        }
    }
}

/// Supervisor and pipeline-wide knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    pub recent_messages_window: usize,
    pub subscriber_queue_depth: usize,
    pub shutdown_grace_seconds: u64,
    pub processor_max_retries: u32,
    pub bind_address: String,
}

impl SupervisorConfig {
    pub fn from_env() -> Self {
        Self {
            recent_messages_window: helpers::env_parsed_or("RECENT_MESSAGES_WINDOW", 10),
            subscriber_queue_depth: helpers::env_parsed_or("SUBSCRIBER_QUEUE_DEPTH", 64),
            shutdown_grace_seconds: helpers::env_parsed_or("SHUTDOWN_GRACE_SECONDS", 30),
            processor_max_retries: helpers::env_parsed_or("PROCESSOR_MAX_RETRIES", 3),
            bind_address: helpers::env_or("BIND_ADDRESS", "0.0.0.0:8080"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub topics: TopicsConfig,
    pub model: ModelConfig,
    pub broker: BrokerConfig,
    pub supervisor: SupervisorConfig,
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self {
            topics: TopicsConfig::from_env(),
            model: ModelConfig::from_env(),
            broker: BrokerConfig::from_env(),
            supervisor: SupervisorConfig::from_env(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        // Safe to build without touching the environment at all: every
        // field has a documented default.
        Self {
            topics: TopicsConfig {
                messages_raw: "messages.raw".into(),
                conversations_state: "conversations.state".into(),
                ai_sentiment: "ai.sentiment".into(),
                ai_pii: "ai.pii".into(),
                ai_insights: "ai.insights".into(),
                ai_summary: "ai.summary".into(),
                ai_aggregated: "ai.aggregated".into(),
                dlq: "dlq".into(),
            },
            model: ModelConfig {
                requests_per_minute: 60,
                max_concurrent_requests: 10,
                max_retries: 3,
                request_timeout_seconds: 15,
                mock_mode: true,
                endpoint: None,
                api_key: None,
            },
            broker: BrokerConfig {
                bootstrap_servers: "localhost:9092".into(),
                client_id: "support-intel".into(),
                poll_timeout_ms: 1_000,
            },
            supervisor: SupervisorConfig {
                recent_messages_window: 10,
                subscriber_queue_depth: 64,
                shutdown_grace_seconds: 30,
                processor_max_retries: 3,
                bind_address: "0.0.0.0:8080".into(),
            },
        }
    }
}
