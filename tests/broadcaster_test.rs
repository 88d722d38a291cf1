// tests/broadcaster_test.rs
// Broadcaster: immediate snapshot on subscribe, never-blocks overflow
// behavior, and idempotent unsubscribe.

use std::time::Duration;

use support_intel::domain::{AggregatedIntelligence, ConversationKey};
use support_intel::pipeline::Broadcaster;

fn snapshot(key: &ConversationKey) -> AggregatedIntelligence {
    AggregatedIntelligence::new(key.tenant_id.clone(), key.conversation_id.clone())
}

#[tokio::test]
async fn subscribe_after_a_publish_delivers_snapshot_first() {
    let broadcaster = Broadcaster::new(4);
    let key = ConversationKey::new("tenant-a", "c1");

    broadcaster.publish(&key, snapshot(&key));

    let subscriber = broadcaster.subscribe(key.clone());
    let first = tokio::time::timeout(Duration::from_millis(200), subscriber.recv())
        .await
        .expect("snapshot should be delivered without any further publish");
    assert_eq!(first.conversation_id, "c1");
}

#[tokio::test]
async fn overflow_drops_oldest_without_blocking_publisher() {
    let broadcaster = Broadcaster::new(2);
    let key = ConversationKey::new("tenant-a", "c1");
    let subscriber = broadcaster.subscribe(key.clone());

    // Fill past capacity; publish must never block even though nobody is
    // draining the queue yet.
    for _ in 0..5 {
        broadcaster.publish(&key, snapshot(&key));
    }

    assert!(broadcaster.dropped_total() >= 3, "expected overflow drops to be counted");

    // The subscriber still receives the most recent items, not stale ones.
    let _ = subscriber.recv().await;
    let _ = subscriber.recv().await;
}

#[tokio::test]
async fn unsubscribe_is_idempotent() {
    let broadcaster = Broadcaster::new(4);
    let key = ConversationKey::new("tenant-a", "c1");
    let subscriber = broadcaster.subscribe(key.clone());

    broadcaster.unsubscribe(&key, &subscriber);
    broadcaster.unsubscribe(&key, &subscriber);
    assert_eq!(broadcaster.subscriber_count(&key), 0);
}

#[tokio::test]
async fn tenant_isolation_keeps_subscribers_scoped_to_their_tenant() {
    let broadcaster = Broadcaster::new(4);
    let key_a = ConversationKey::new("tenant-a", "c1");
    let key_b = ConversationKey::new("tenant-b", "c1");

    let subscriber_b = broadcaster.subscribe(key_b.clone());
    broadcaster.publish(&key_a, snapshot(&key_a));

    let result = tokio::time::timeout(Duration::from_millis(100), subscriber_b.recv()).await;
    assert!(result.is_err(), "a tenant-b subscriber must not receive tenant-a events for the same conversation id");
}
