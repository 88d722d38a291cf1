// src/model/fallback.rs
// Deterministic fallback values for each operation, returned on permanent
// model failure so the pipeline never stalls.

use crate::domain::{
    Emotion, EstimatedResolutionTime, Intent, InsightsResult, PiiResult, Sentiment,
    SentimentResult, SummaryResult, Urgency,
};

pub fn sentiment_fallback(tenant_id: &str, conversation_id: &str, offset: i64) -> SentimentResult {
    SentimentResult {
        tenant_id: tenant_id.to_string(),
        conversation_id: conversation_id.to_string(),
        offset,
        sentiment: Sentiment::Neutral,
        emotion: Emotion::Neutral,
        confidence: 0.0,
        reasoning: "model unavailable; fallback result".to_string(),
    }
}

pub fn pii_fallback(tenant_id: &str, conversation_id: &str, offset: i64, text: &str) -> PiiResult {
    PiiResult {
        tenant_id: tenant_id.to_string(),
        conversation_id: conversation_id.to_string(),
        offset,
        has_pii: false,
        entities: Vec::new(),
        redacted_text: text.to_string(),
    }
}

pub fn insights_fallback(tenant_id: &str, conversation_id: &str, offset: i64) -> InsightsResult {
    InsightsResult {
        tenant_id: tenant_id.to_string(),
        conversation_id: conversation_id.to_string(),
        offset,
        intent: Intent::GeneralInquiry,
        urgency: Urgency::Low,
        categories: Vec::new(),
        suggested_actions: Vec::new(),
        requires_escalation: false,
        estimated_resolution_time: EstimatedResolutionTime::Unknown,
        key_concerns: Vec::new(),
    }
}

pub fn summary_fallback(
    tenant_id: &str,
    conversation_id: &str,
    version: i64,
    previous: Option<&SummaryResult>,
) -> SummaryResult {
    match previous {
        Some(prev) => SummaryResult {
            version,
            ..prev.clone()
        },
        None => SummaryResult::empty(tenant_id, conversation_id),
    }
}
