// src/domain/state.rs
// ConversationState, owned and mutated exclusively by the Processor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

use super::message::{Sender, SupportMessage};
use super::results::SummaryResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    pub tenant_id: String,
    pub conversation_id: String,
    pub message_count: u64,
    pub recent_messages: VecDeque<SupportMessage>,
    pub current_summary: Option<SummaryResult>,
    pub participants: HashSet<SenderKind>,
    pub last_activity: DateTime<Utc>,
}

/// `Sender` doesn't implement `Hash`/`Eq` by default in a way that's
/// convenient to store in a `HashSet` alongside serde derives, so the
/// participant set tracks a small mirrored enum instead of the wire type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderKind {
    Customer,
    Agent,
    System,
}

impl From<Sender> for SenderKind {
    fn from(s: Sender) -> Self {
        match s {
            Sender::Customer => SenderKind::Customer,
            Sender::Agent => SenderKind::Agent,
            Sender::System => SenderKind::System,
        }
    }
}

impl ConversationState {
    pub fn new(tenant_id: String, conversation_id: String) -> Self {
        Self {
            tenant_id,
            conversation_id,
            message_count: 0,
            recent_messages: VecDeque::new(),
            current_summary: None,
            participants: HashSet::new(),
            last_activity: Utc::now(),
        }
    }

    /// Append a new message, enforcing the bounded recent-messages window:
    /// oldest entries are evicted once `recent_messages.len()` exceeds `window`.
    pub fn record_message(&mut self, message: SupportMessage, window: usize) {
        self.participants.insert(message.sender.into());
        self.last_activity = message.timestamp;
        self.message_count += 1;
        self.recent_messages.push_back(message);
        while self.recent_messages.len() > window {
            self.recent_messages.pop_front();
        }
    }

    /// Replace the cached summary iff the incoming one is strictly newer,
    /// by version first and falling back to timestamp.
    pub fn maybe_adopt_summary(&mut self, incoming: SummaryResult) -> bool {
        let is_newer = match &self.current_summary {
            None => true,
            Some(current) => {
                if incoming.version != current.version {
                    incoming.version > current.version
                } else {
                    incoming.timestamp > current.timestamp
                }
            }
        };
        if is_newer {
            self.current_summary = Some(incoming);
        }
        is_newer
    }

    pub fn latest_message(&self) -> Option<&SupportMessage> {
        self.recent_messages.back()
    }
}
