// src/domain/aggregated.rs
// AggregatedIntelligence and the PII merge-state it carries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::results::{InsightsResult, PiiEntity, PiiResult, SentimentResult, SummaryResult, Urgency, Sentiment};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PiiAggregate {
    pub has_pii: bool,
    pub entities: Vec<PiiEntity>,
    pub redacted_text: String,
}

impl PiiAggregate {
    /// Monotonic OR on `has_pii`, deduplicated union on entities keyed by
    /// `(type, redacted_value)`, latest-wins on `redacted_text`.
    pub fn merge(&mut self, incoming: &PiiResult) {
        self.has_pii = self.has_pii || incoming.has_pii;
        for entity in &incoming.entities {
            let already_present = self
                .entities
                .iter()
                .any(|e| e.kind == entity.kind && e.redacted_value == entity.redacted_value);
            if !already_present {
                self.entities.push(entity.clone());
            }
        }
        self.redacted_text = incoming.redacted_text.clone();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedIntelligence {
    pub tenant_id: String,
    pub conversation_id: String,
    pub sentiment: Option<SentimentResult>,
    pub pii: PiiAggregate,
    pub insights: Option<InsightsResult>,
    pub summary: Option<SummaryResult>,
    pub last_updated: DateTime<Utc>,
    pub quality_score: Option<i32>,
    // Largest broker offset folded into each sub-object so replays of an
    // already-seen record are no-ops.
    sentiment_offset: i64,
    insights_offset: i64,
    summary_offset: i64,
}

impl AggregatedIntelligence {
    pub fn new(tenant_id: String, conversation_id: String) -> Self {
        Self {
            tenant_id,
            conversation_id,
            sentiment: None,
            pii: PiiAggregate::default(),
            insights: None,
            summary: None,
            last_updated: Utc::now(),
            quality_score: None,
            sentiment_offset: i64::MIN,
            insights_offset: i64::MIN,
            summary_offset: i64::MIN,
        }
    }

    pub fn apply_sentiment(&mut self, result: SentimentResult) {
        if result.offset > self.sentiment_offset {
            self.sentiment_offset = result.offset;
            self.sentiment = Some(result);
        }
    }

    pub fn apply_insights(&mut self, result: InsightsResult) {
        if result.offset > self.insights_offset {
            self.insights_offset = result.offset;
            self.insights = Some(result);
        }
    }

    pub fn apply_summary(&mut self, result: SummaryResult) {
        if result.version > self.summary_offset {
            self.summary_offset = result.version;
            self.summary = Some(result);
        }
    }

    pub fn apply_pii(&mut self, result: &PiiResult) {
        self.pii.merge(result);
    }

    pub fn touch(&mut self) {
        self.last_updated = Utc::now();
        self.quality_score = Some(self.compute_quality_score());
    }

    /// Scalar in `[0, 100]`: starts neutral, rewarded for positive
    /// sentiment, penalized for urgency and unresolved PII exposure. An
    /// advisory signal, not an authoritative rating.
    fn compute_quality_score(&self) -> i32 {
        let mut score: i32 = 60;
        if let Some(sentiment) = &self.sentiment {
            score += match sentiment.sentiment {
                Sentiment::Positive => 20,
                Sentiment::Neutral => 0,
                Sentiment::Negative => -20,
            };
        }
        if let Some(insights) = &self.insights {
            score -= match insights.urgency {
                Urgency::Low => 0,
                Urgency::Medium => 10,
                Urgency::High => 20,
                Urgency::Critical => 30,
            };
            if insights.requires_escalation {
                score -= 10;
            }
        }
        if self.pii.has_pii {
            score -= 5;
        }
        score.clamp(0, 100)
    }
}
