// tests/processor_test.rs
// Conversation Processor: emission-on-message, loop guard on summary ingest,
// and the bounded recent-messages window.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use support_intel::broker::memory::InMemoryBroker;
use support_intel::broker::{Broker, Headers};
use support_intel::config::{SupervisorConfig, TopicsConfig};
use support_intel::domain::{Channel, ConversationState, Sender, SummaryResult, SupportMessage};
use support_intel::pipeline::ConversationProcessor;
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

fn message(conversation_id: &str, text: &str) -> SupportMessage {
    SupportMessage {
        message_id: uuid::Uuid::new_v4().to_string(),
        tenant_id: "tenant-a".to_string(),
        conversation_id: conversation_id.to_string(),
        sender: Sender::Customer,
        channel: Channel::Chat,
        text: text.to_string(),
        timestamp: Utc::now(),
        metadata: Default::default(),
    }
}

async fn run_processor_briefly(processor: Arc<ConversationProcessor>) {
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(processor.clone().run(cancel.clone()));
    tokio::time::sleep(Duration::from_millis(150)).await;
    cancel.cancel();
    let _ = handle.await;
}

#[tokio::test]
async fn new_message_emits_exactly_one_state_record() {
    let broker: Arc<InMemoryBroker> = Arc::new(InMemoryBroker::new());
    let topics = test_topics();
    let supervisor = SupervisorConfig {
        recent_messages_window: 10,
        subscriber_queue_depth: 64,
        shutdown_grace_seconds: 5,
        processor_max_retries: 3,
        bind_address: "0.0.0.0:0".into(),
    };
    let processor = Arc::new(ConversationProcessor::new(broker.clone(), topics.clone(), &supervisor));

    broker
        .produce_json(&topics.messages_raw, "c1", &message("c1", "hello"), Headers::new("tenant-a"))
        .await
        .unwrap();

    run_processor_briefly(processor.clone()).await;

    let emitted = broker
        .poll("verifier", &[&topics.conversations_state], Duration::from_millis(50))
        .await
        .unwrap()
        .expect("exactly one conversations.state record expected");
    let state: ConversationState = emitted.decode().unwrap();
    assert_eq!(state.message_count, 1);

    let none_left = broker
        .poll("verifier", &[&topics.conversations_state], Duration::from_millis(50))
        .await
        .unwrap();
    assert!(none_left.is_none(), "exactly one state record should be produced per raw message");
}

#[tokio::test]
async fn summary_ingest_never_emits_state_loop_guard() {
    let broker: Arc<InMemoryBroker> = Arc::new(InMemoryBroker::new());
    let topics = test_topics();
    let supervisor = SupervisorConfig {
        recent_messages_window: 10,
        subscriber_queue_depth: 64,
        shutdown_grace_seconds: 5,
        processor_max_retries: 3,
        bind_address: "0.0.0.0:0".into(),
    };
    let processor = Arc::new(ConversationProcessor::new(broker.clone(), topics.clone(), &supervisor));

    // Seed state for c1 first so the summary has somewhere to land.
    broker
        .produce_json(&topics.messages_raw, "c1", &message("c1", "hi"), Headers::new("tenant-a"))
        .await
        .unwrap();

    let summary = SummaryResult::empty("tenant-a", "c1");
    broker
        .produce_json(&topics.ai_summary, "c1", &summary, Headers::new("tenant-a"))
        .await
        .unwrap();

    run_processor_briefly(processor).await;

    // Drain every conversations.state record; there must be exactly one
    // (from the raw message), never two (the summary must not re-emit).
    let mut count = 0;
    while broker
        .poll("verifier", &[&topics.conversations_state], Duration::from_millis(50))
        .await
        .unwrap()
        .is_some()
    {
        count += 1;
    }
    assert_eq!(count, 1, "summary ingest must never emit a conversations.state record");
}

#[tokio::test]
async fn summary_for_unknown_conversation_is_dropped_with_no_effect() {
    let broker: Arc<InMemoryBroker> = Arc::new(InMemoryBroker::new());
    let topics = test_topics();
    let supervisor = SupervisorConfig {
        recent_messages_window: 10,
        subscriber_queue_depth: 64,
        shutdown_grace_seconds: 5,
        processor_max_retries: 3,
        bind_address: "0.0.0.0:0".into(),
    };
    let processor = Arc::new(ConversationProcessor::new(broker.clone(), topics.clone(), &supervisor));

    let summary = SummaryResult::empty("tenant-a", "c99");
    broker
        .produce_json(&topics.ai_summary, "c99", &summary, Headers::new("tenant-a"))
        .await
        .unwrap();

    run_processor_briefly(processor.clone()).await;

    assert!(processor.snapshot(&support_intel::domain::ConversationKey::new("tenant-a", "c99")).is_none());
    let leftover = broker
        .poll("verifier", &[&topics.conversations_state], Duration::from_millis(50))
        .await
        .unwrap();
    assert!(leftover.is_none());
}

#[tokio::test]
async fn recent_messages_window_evicts_oldest_on_overflow() {
    let broker: Arc<InMemoryBroker> = Arc::new(InMemoryBroker::new());
    let topics = test_topics();
    let supervisor = SupervisorConfig {
        recent_messages_window: 10,
        subscriber_queue_depth: 64,
        shutdown_grace_seconds: 5,
        processor_max_retries: 3,
        bind_address: "0.0.0.0:0".into(),
    };
    let processor = Arc::new(ConversationProcessor::new(broker.clone(), topics.clone(), &supervisor));

    for i in 0..11 {
        broker
            .produce_json(&topics.messages_raw, "c2", &message("c2", &format!("message {i}")), Headers::new("tenant-a"))
            .await
            .unwrap();
    }

    run_processor_briefly(processor.clone()).await;

    let state = processor
        .snapshot(&support_intel::domain::ConversationKey::new("tenant-a", "c2"))
        .expect("state must exist for c2");
    assert_eq!(state.recent_messages.len(), 10);
    assert_eq!(state.message_count, 11);
    assert_eq!(state.recent_messages.front().unwrap().text, "message 1");
    assert_eq!(state.recent_messages.back().unwrap().text, "message 10");
}
