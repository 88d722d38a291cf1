// src/domain/message.rs
// SupportMessage and its enums.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const MAX_MESSAGE_CHARS: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    Customer,
    Agent,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Chat,
    Email,
    Voice,
    Sms,
}

impl Default for Channel {
    fn default() -> Self {
        Channel::Chat
    }
}

/// A single inbound message, immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportMessage {
    pub message_id: String,
    pub tenant_id: String,
    pub conversation_id: String,
    pub sender: Sender,
    pub channel: Channel,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}
