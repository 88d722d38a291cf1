// tests/model_client_test.rs
// Model Client: mock-mode heuristics behave deterministically for frustrated
// and PII-bearing messages, and a missing endpoint degrades to the
// documented fallback rather than stalling.

use support_intel::config::ModelConfig;
use support_intel::domain::{Intent, Sentiment};
use support_intel::model::{AnalysisContext, ModelClient};

fn mock_config() -> ModelConfig {
    ModelConfig {
        requests_per_minute: 6_000,
        max_concurrent_requests: 10,
        max_retries: 1,
        request_timeout_seconds: 5,
        mock_mode: true,
        endpoint: None,
        api_key: None,
    }
}

fn ctx(conversation_id: &str, message: &str) -> AnalysisContext {
    AnalysisContext {
        tenant_id: "tenant-a".to_string(),
        conversation_id: conversation_id.to_string(),
        offset: 0,
        summary_context: None,
        message: message.to_string(),
    }
}

#[tokio::test]
async fn frustrated_message_is_negative_sentiment_without_pii() {
    let client = ModelClient::new(mock_config());
    let context = ctx("c1", "I'm frustrated with my order");

    let sentiment = client.analyze_sentiment(&context).await;
    assert_eq!(sentiment.sentiment, Sentiment::Negative);

    let pii = client.detect_pii("tenant-a", "c1", 0, &context.message).await;
    assert!(!pii.has_pii);
}

#[tokio::test]
async fn email_in_text_is_detected_and_redacted() {
    let client = ModelClient::new(mock_config());
    let text = "Contact me at alice@example.com";

    let pii = client.detect_pii("tenant-a", "c1", 1, text).await;
    assert!(pii.has_pii);
    assert_eq!(pii.entities.len(), 1);
    assert_eq!(pii.entities[0].kind, "email");
    assert_eq!(pii.entities[0].redacted_value, "[REDACTED]");
    assert!(!pii.redacted_text.contains("alice@example.com"));
}

#[tokio::test]
async fn neutral_message_yields_general_inquiry_low_urgency() {
    let client = ModelClient::new(mock_config());
    let context = ctx("c1", "What are your business hours?");

    let insights = client.extract_insights(&context).await;
    assert_eq!(insights.intent, Intent::GeneralInquiry);
    assert!(!insights.requires_escalation);
}

#[tokio::test]
async fn no_prior_summary_falls_back_to_full_window_mode() {
    let client = ModelClient::new(mock_config());
    let window = vec!["first message".to_string(), "second message".to_string()];

    let summary = client
        .update_summary("tenant-a", "c1", 0, None, &window, "third message")
        .await;
    assert_eq!(summary.version, 0);
    assert!(!summary.tldr.is_empty());
}

#[tokio::test]
async fn missing_endpoint_in_live_mode_degrades_to_fallback() {
    let mut config = mock_config();
    config.mock_mode = false;
    config.endpoint = None;
    let client = ModelClient::new(config);

    let context = ctx("c1", "anything");
    let sentiment = client.analyze_sentiment(&context).await;
    assert_eq!(sentiment.sentiment, Sentiment::Neutral);
    assert_eq!(sentiment.confidence, 0.0);
}
