// src/model/heuristics.rs
// Deterministic keyword/regex analyzers used in `mock_mode` so the
// pipeline is fully runnable, and testable, without a live model provider.

use regex::Regex;
use std::sync::OnceLock;

use crate::domain::{
    Emotion, EstimatedResolutionTime, Intent, PiiEntity, PiiResult, Sentiment, SentimentResult,
    SummaryResult, Urgency, InsightsResult,
};

static EMAIL: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL.get_or_init(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap())
}

const NEGATIVE_WORDS: &[&str] = &[
    "frustrated", "angry", "upset", "terrible", "worst", "broken", "awful", "horrible", "unacceptable",
];
const POSITIVE_WORDS: &[&str] = &["thanks", "thank you", "great", "awesome", "appreciate", "perfect"];
const URGENT_WORDS: &[&str] = &["urgent", "immediately", "asap", "right now", "emergency"];
const ESCALATION_WORDS: &[&str] = &["angry", "furious", "lawyer", "cancel", "refund now"];

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    let lower = haystack.to_lowercase();
    needles.iter().any(|needle| lower.contains(needle))
}

pub fn analyze_sentiment(
    tenant_id: &str,
    conversation_id: &str,
    offset: i64,
    text: &str,
) -> SentimentResult {
    let (sentiment, emotion, confidence) = if contains_any(text, NEGATIVE_WORDS) {
        (Sentiment::Negative, Emotion::Frustration, 0.75)
    } else if contains_any(text, POSITIVE_WORDS) {
        (Sentiment::Positive, Emotion::Gratitude, 0.75)
    } else {
        (Sentiment::Neutral, Emotion::Neutral, 0.5)
    };
    SentimentResult {
        tenant_id: tenant_id.to_string(),
        conversation_id: conversation_id.to_string(),
        offset,
        sentiment,
        emotion,
        confidence,
        reasoning: "mock_mode keyword heuristic".to_string(),
    }
}

pub fn detect_pii(tenant_id: &str, conversation_id: &str, offset: i64, text: &str) -> PiiResult {
    let mut entities = Vec::new();
    let mut redacted = text.to_string();

    for capture in email_regex().find_iter(text) {
        entities.push(PiiEntity {
            kind: "email".to_string(),
            redacted_value: "[REDACTED]".to_string(),
            start: capture.start(),
            end: capture.end(),
        });
    }
    if !entities.is_empty() {
        redacted = email_regex().replace_all(text, "[REDACTED]").to_string();
    }
    let has_pii = !entities.is_empty();

    PiiResult {
        tenant_id: tenant_id.to_string(),
        conversation_id: conversation_id.to_string(),
        offset,
        has_pii,
        entities,
        redacted_text: redacted,
    }
}

pub fn extract_insights(
    tenant_id: &str,
    conversation_id: &str,
    offset: i64,
    text: &str,
) -> InsightsResult {
    let urgency = if contains_any(text, URGENT_WORDS) {
        Urgency::High
    } else if contains_any(text, NEGATIVE_WORDS) {
        Urgency::Medium
    } else {
        Urgency::Low
    };
    let requires_escalation = contains_any(text, ESCALATION_WORDS);
    let intent = if contains_any(text, &["refund", "charge", "bill"]) {
        Intent::BillingIssue
    } else if contains_any(text, &["cancel"]) {
        Intent::CancellationRequest
    } else if contains_any(text, &["broken", "bug", "error", "crash"]) {
        Intent::TechnicalIssue
    } else {
        Intent::GeneralInquiry
    };

    InsightsResult {
        tenant_id: tenant_id.to_string(),
        conversation_id: conversation_id.to_string(),
        offset,
        intent,
        urgency,
        categories: Vec::new(),
        suggested_actions: Vec::new(),
        requires_escalation,
        estimated_resolution_time: EstimatedResolutionTime::Hours,
        key_concerns: Vec::new(),
    }
}

/// Incremental summarization: folds the new message into the prior summary.
/// With no prior summary, folds in the whole recent-message window instead.
pub fn update_summary(
    tenant_id: &str,
    conversation_id: &str,
    version: i64,
    old_summary: Option<&SummaryResult>,
    window_texts: &[String],
    new_message: &str,
) -> SummaryResult {
    let tldr = match old_summary {
        Some(prev) if !prev.tldr.is_empty() => {
            format!("{} | latest: {}", prev.tldr, truncate(new_message, 80))
        }
        _ => {
            let joined = window_texts.join(" / ");
            truncate(&joined, 160)
        }
    };
    SummaryResult {
        tenant_id: tenant_id.to_string(),
        conversation_id: conversation_id.to_string(),
        version,
        tldr,
        customer_issue: new_message.to_string(),
        agent_response: String::new(),
        key_points: Vec::new(),
        next_steps: Vec::new(),
        timestamp: chrono::Utc::now(),
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        text.chars().take(max).collect::<String>() + "…"
    }
}
