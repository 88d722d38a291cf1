// tests/pipeline_e2e_test.rs
// End-to-end: Processor -> Analyzer Workers -> Aggregator -> Broadcaster,
// wired over the in-memory broker, run from a single raw message.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use support_intel::broker::memory::InMemoryBroker;
use support_intel::broker::{Broker, Headers};
use support_intel::config::{ModelConfig, SupervisorConfig, TopicsConfig};
use support_intel::domain::{Channel, ConversationKey, Sender, Sentiment, SupportMessage};
use support_intel::model::ModelClient;
use support_intel::pipeline::workers::{AnalyzerKind, AnalyzerWorker};
use support_intel::pipeline::{Aggregator, Broadcaster, ConversationProcessor};
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

#[tokio::test]
async fn one_message_flows_through_to_a_subscribed_aggregated_view() {
    let broker: Arc<InMemoryBroker> = Arc::new(InMemoryBroker::new());
    let topics = test_topics();
    let supervisor_cfg = SupervisorConfig {
        recent_messages_window: 10,
        subscriber_queue_depth: 64,
        shutdown_grace_seconds: 5,
        processor_max_retries: 3,
        bind_address: "0.0.0.0:0".into(),
    };
    let model = Arc::new(ModelClient::new(ModelConfig {
        requests_per_minute: 6_000,
        max_concurrent_requests: 10,
        max_retries: 1,
        request_timeout_seconds: 5,
        mock_mode: true,
        endpoint: None,
        api_key: None,
    }));

    let processor = Arc::new(ConversationProcessor::new(broker.clone(), topics.clone(), &supervisor_cfg));
    let broadcaster = Arc::new(Broadcaster::new(supervisor_cfg.subscriber_queue_depth));
    let aggregator = Arc::new(Aggregator::new(broker.clone(), topics.clone(), broadcaster.clone()));

    let workers: Vec<_> = [
        AnalyzerKind::Sentiment,
        AnalyzerKind::Pii,
        AnalyzerKind::Insights,
        AnalyzerKind::Summary,
    ]
    .into_iter()
    .map(|kind| Arc::new(AnalyzerWorker::new(kind, broker.clone(), model.clone(), topics.clone())))
    .collect();

    let cancel = CancellationToken::new();
    let mut handles = vec![tokio::spawn(processor.clone().run(cancel.clone())), tokio::spawn(aggregator.clone().run(cancel.clone()))];
    for worker in &workers {
        handles.push(tokio::spawn(worker.clone().run(cancel.clone())));
    }

    let key = ConversationKey::new("tenant-a", "c1");
    let subscriber = broadcaster.subscribe(key.clone());

    let message = SupportMessage {
        message_id: uuid::Uuid::new_v4().to_string(),
        tenant_id: "tenant-a".into(),
        conversation_id: "c1".into(),
        sender: Sender::Customer,
        channel: Channel::Chat,
        text: "I'm frustrated with my order".into(),
        timestamp: Utc::now(),
        metadata: Default::default(),
    };
    broker
        .produce_json(&topics.messages_raw, "c1", &message, Headers::new("tenant-a"))
        .await
        .unwrap();

    // Four independent analyzer workers race to publish; keep draining
    // broadcast updates until every sub-result has landed (or time out).
    let aggregated = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let update = subscriber.recv().await;
            if update.sentiment.is_some() && update.insights.is_some() && update.summary.is_some() {
                return update;
            }
        }
    })
    .await
    .expect("aggregated intelligence should converge within the timeout");

    assert_eq!(aggregated.tenant_id, "tenant-a");
    assert_eq!(aggregated.conversation_id, "c1");
    assert_eq!(aggregated.sentiment.unwrap().sentiment, Sentiment::Negative);
    assert!(!aggregated.pii.has_pii);
    assert!(aggregated.quality_score.is_some());

    cancel.cancel();
    for handle in handles {
        let _ = handle.await;
    }
}
