// src/error.rs
// Typed error taxonomy for the pipeline, one `thiserror` enum per failure
// domain.

use thiserror::Error;

/// Errors surfaced by the broker adapter.
#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("transient broker error: {0}")]
    Transient(String),
    #[error("serialization error: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Errors surfaced by the model client.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("transient model error: {0}")]
    Transient(String),
    #[error("permanent model error: {0}")]
    Permanent(String),
    #[error("response parse failure: {0}")]
    ParseFailure(String),
}

impl ModelError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ModelError::Transient(_))
    }
}

/// Errors that can occur while the Processor handles a raw message or a
/// summary ingest.
#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("poison record, retry {retries}/{max_retries}: {detail}")]
    PoisonRecord {
        detail: String,
        retries: u32,
        max_retries: u32,
    },
    #[error("summary for unknown conversation {tenant_id}/{conversation_id}")]
    UnknownConversation {
        tenant_id: String,
        conversation_id: String,
    },
    #[error(transparent)]
    Broker(#[from] BrokerError),
}

/// Errors surfaced by HTTP ingestion validation.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("message text exceeds {max} characters (got {actual})")]
    TextTooLong { max: usize, actual: usize },
}
