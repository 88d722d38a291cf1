// tests/aggregator_test.rs
// Aggregator merge semantics: PII monotonicity + dedup union, last-offset-
// wins for sentiment/insights/summary, and broadcast wiring.

use std::sync::Arc;
use std::time::Duration;

use support_intel::broker::memory::InMemoryBroker;
use support_intel::broker::{Broker, Headers};
use support_intel::config::TopicsConfig;
use support_intel::domain::{
    AggregatedIntelligence, ConversationKey, Emotion, PiiEntity, PiiResult, Sentiment, SentimentResult,
};
use support_intel::pipeline::{Aggregator, Broadcaster};
use tokio_util::sync::CancellationToken;

fn test_topics() -> TopicsConfig {
    TopicsConfig {
        messages_raw: "messages.raw".into(),
        conversations_state: "conversations.state".into(),
        ai_sentiment: "ai.sentiment".into(),
        ai_pii: "ai.pii".into(),
        ai_insights: "ai.insights".into(),
        ai_summary: "ai.summary".into(),
        ai_aggregated: "ai.aggregated".into(),
        dlq: "dlq".into(),
    }
}

fn pii_with_email(offset: i64, has_pii: bool) -> PiiResult {
    PiiResult {
        tenant_id: "tenant-a".into(),
        conversation_id: "c1".into(),
        offset,
        has_pii,
        entities: if has_pii {
            vec![PiiEntity {
                kind: "email".into(),
                redacted_value: "[REDACTED]".into(),
                start: 14,
                end: 29,
            }]
        } else {
            Vec::new()
        },
        redacted_text: if has_pii {
            "Contact me at [REDACTED]".into()
        } else {
            "Thanks!".into()
        },
    }
}

async fn run_aggregator_briefly(aggregator: Arc<Aggregator>) {
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(aggregator.clone().run(cancel.clone()));
    tokio::time::sleep(Duration::from_millis(150)).await;
    cancel.cancel();
    let _ = handle.await;
}

#[tokio::test]
async fn pii_monotonicity_and_entity_union_survive_a_clean_message() {
    let broker: Arc<InMemoryBroker> = Arc::new(InMemoryBroker::new());
    let topics = test_topics();
    let broadcaster = Arc::new(Broadcaster::new(64));
    let aggregator = Arc::new(Aggregator::new(broker.clone(), topics.clone(), broadcaster.clone()));

    // First, a PII-bearing result.
    broker
        .produce_json(&topics.ai_pii, "c1", &pii_with_email(0, true), Headers::new("tenant-a"))
        .await
        .unwrap();
    run_aggregator_briefly(aggregator.clone()).await;

    let key = ConversationKey::new("tenant-a", "c1");
    let after_pii = aggregator.snapshot(&key).expect("snapshot after the PII-bearing result");
    assert!(after_pii.pii.has_pii);
    assert_eq!(after_pii.pii.entities.len(), 1);

    // A subsequent clean message must not clear has_pii or the entity.
    broker
        .produce_json(&topics.ai_pii, "c1", &pii_with_email(1, false), Headers::new("tenant-a"))
        .await
        .unwrap();
    run_aggregator_briefly(aggregator.clone()).await;

    let after_clean = aggregator.snapshot(&key).expect("snapshot after the clean message");
    assert!(after_clean.pii.has_pii, "PII monotonicity violated");
    assert_eq!(after_clean.pii.entities.len(), 1, "entity set must not duplicate or shrink");
    assert_eq!(after_clean.pii.redacted_text, "Thanks!", "redacted_text is latest-wins");
}

#[tokio::test]
async fn sentiment_merge_keeps_greatest_offset_even_out_of_order() {
    let broker: Arc<InMemoryBroker> = Arc::new(InMemoryBroker::new());
    let topics = test_topics();
    let broadcaster = Arc::new(Broadcaster::new(64));
    let aggregator = Arc::new(Aggregator::new(broker.clone(), topics.clone(), broadcaster.clone()));

    let newer = SentimentResult {
        tenant_id: "tenant-a".into(),
        conversation_id: "c1".into(),
        offset: 5,
        sentiment: Sentiment::Negative,
        emotion: Emotion::Frustration,
        confidence: 0.75,
        reasoning: "negative keywords matched".into(),
    };
    let stale = SentimentResult {
        offset: 2,
        sentiment: Sentiment::Positive,
        emotion: Emotion::Gratitude,
        confidence: 0.75,
        reasoning: "positive keywords matched".into(),
        ..newer.clone()
    };

    // Produce the newer offset first, then a stale one arriving late; the
    // aggregator must not let the lower offset win.
    broker
        .produce_json(&topics.ai_sentiment, "c1", &newer, Headers::new("tenant-a"))
        .await
        .unwrap();
    broker
        .produce_json(&topics.ai_sentiment, "c1", &stale, Headers::new("tenant-a"))
        .await
        .unwrap();

    run_aggregator_briefly(aggregator.clone()).await;

    let key = ConversationKey::new("tenant-a", "c1");
    let snapshot = aggregator.snapshot(&key).expect("snapshot");
    assert_eq!(snapshot.sentiment.unwrap().sentiment, Sentiment::Negative, "higher offset must win regardless of arrival order");
}

#[tokio::test]
async fn merging_the_same_record_twice_is_idempotent() {
    let broker: Arc<InMemoryBroker> = Arc::new(InMemoryBroker::new());
    let topics = test_topics();
    let broadcaster = Arc::new(Broadcaster::new(64));
    let aggregator = Arc::new(Aggregator::new(broker.clone(), topics.clone(), broadcaster.clone()));

    let result = pii_with_email(3, true);
    broker
        .produce_json(&topics.ai_pii, "c1", &result, Headers::new("tenant-a"))
        .await
        .unwrap();
    broker
        .produce_json(&topics.ai_pii, "c1", &result, Headers::new("tenant-a"))
        .await
        .unwrap();

    run_aggregator_briefly(aggregator.clone()).await;

    let key = ConversationKey::new("tenant-a", "c1");
    let snapshot: AggregatedIntelligence = aggregator.snapshot(&key).expect("snapshot");
    assert_eq!(snapshot.pii.entities.len(), 1, "replaying the same record must not duplicate entities");
}
