// src/domain/results.rs
// The four analyzer result shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    Joy,
    Frustration,
    Anger,
    Confusion,
    Gratitude,
    Neutral,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentResult {
    pub tenant_id: String,
    pub conversation_id: String,
    pub offset: i64,
    pub sentiment: Sentiment,
    pub emotion: Emotion,
    pub confidence: f32,
    pub reasoning: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PiiEntity {
    #[serde(rename = "type")]
    pub kind: String,
    pub redacted_value: String,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PiiResult {
    pub tenant_id: String,
    pub conversation_id: String,
    pub offset: i64,
    pub has_pii: bool,
    pub entities: Vec<PiiEntity>,
    pub redacted_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    GeneralInquiry,
    BillingIssue,
    TechnicalIssue,
    CancellationRequest,
    ComplaintEscalation,
    FeatureRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimatedResolutionTime {
    Minutes,
    Hours,
    Days,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightsResult {
    pub tenant_id: String,
    pub conversation_id: String,
    pub offset: i64,
    pub intent: Intent,
    pub urgency: Urgency,
    pub categories: Vec<String>,
    pub suggested_actions: Vec<String>,
    pub requires_escalation: bool,
    pub estimated_resolution_time: EstimatedResolutionTime,
    pub key_concerns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryResult {
    pub tenant_id: String,
    pub conversation_id: String,
    pub version: i64,
    pub tldr: String,
    pub customer_issue: String,
    pub agent_response: String,
    pub key_points: Vec<String>,
    pub next_steps: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl SummaryResult {
    /// An empty skeleton used as the Model Client's summary fallback and as
    /// the Processor's "no summary yet" state.
    pub fn empty(tenant_id: &str, conversation_id: &str) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            conversation_id: conversation_id.to_string(),
            version: 0,
            tldr: String::new(),
            customer_issue: String::new(),
            agent_response: String::new(),
            key_points: Vec::new(),
            next_steps: Vec::new(),
            timestamp: Utc::now(),
        }
    }
}
