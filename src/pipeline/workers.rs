// src/pipeline/workers.rs
// The four Analyzer Workers. Each is an independent consumer group over
// `conversations.state`; a failure in one never stalls the others.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::broker::{Broker, Headers};
use crate::config::TopicsConfig;
use crate::domain::ConversationState;
use crate::model::{AnalysisContext, ModelClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyzerKind {
    Sentiment,
    Pii,
    Insights,
    Summary,
}

impl AnalyzerKind {
    fn consumer_group(self) -> &'static str {
        match self {
            AnalyzerKind::Sentiment => "analyzer-sentiment",
            AnalyzerKind::Pii => "analyzer-pii",
            AnalyzerKind::Insights => "analyzer-insights",
            AnalyzerKind::Summary => "analyzer-summary",
        }
    }

    fn output_topic(self, topics: &TopicsConfig) -> String {
        match self {
            AnalyzerKind::Sentiment => topics.ai_sentiment.clone(),
            AnalyzerKind::Pii => topics.ai_pii.clone(),
            AnalyzerKind::Insights => topics.ai_insights.clone(),
            AnalyzerKind::Summary => topics.ai_summary.clone(),
        }
    }
}

pub struct AnalyzerWorker {
    kind: AnalyzerKind,
    broker: Arc<dyn Broker>,
    model: Arc<ModelClient>,
    topics: TopicsConfig,
}

impl AnalyzerWorker {
    pub fn new(kind: AnalyzerKind, broker: Arc<dyn Broker>, model: Arc<ModelClient>, topics: TopicsConfig) -> Self {
        Self {
            kind,
            broker,
            model,
            topics,
        }
    }

    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let input_topic = self.topics.conversations_state.clone();
        let group = self.kind.consumer_group();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                polled = self.broker.poll(group, &[&input_topic], Duration::from_millis(500)) => {
                    match polled {
                        Ok(Some(message)) => {
                            let state: Result<ConversationState, _> = message.decode();
                            match state {
                                Ok(state) => {
                                    self.analyze_and_emit(&state, message.offset).await;
                                    let _ = self.broker.commit(group, &message).await;
                                }
                                Err(e) => warn!(worker = ?self.kind, error = %e, "failed to decode conversation state"),
                            }
                        }
                        Ok(None) => {}
                        Err(e) => warn!(worker = ?self.kind, error = %e, "worker poll error"),
                    }
                }
            }
        }
    }

    async fn analyze_and_emit(&self, state: &ConversationState, offset: i64) {
        let Some(latest) = state.latest_message() else {
            return;
        };
        let summary_context = state.current_summary.as_ref().map(|s| s.tldr.clone());
        let ctx = AnalysisContext {
            tenant_id: state.tenant_id.clone(),
            conversation_id: state.conversation_id.clone(),
            offset,
            summary_context,
            message: latest.text.clone(),
        };

        let headers = Headers::new(state.tenant_id.clone());
        let output_topic = self.kind.output_topic(&self.topics);

        let produced = match self.kind {
            AnalyzerKind::Sentiment => {
                let result = self.model.analyze_sentiment(&ctx).await;
                self.broker.produce_json(&output_topic, &ctx.conversation_id, &result, headers).await
            }
            AnalyzerKind::Pii => {
                let result = self
                    .model
                    .detect_pii(&ctx.tenant_id, &ctx.conversation_id, ctx.offset, &ctx.message)
                    .await;
                self.broker.produce_json(&output_topic, &ctx.conversation_id, &result, headers).await
            }
            AnalyzerKind::Insights => {
                let result = self.model.extract_insights(&ctx).await;
                self.broker.produce_json(&output_topic, &ctx.conversation_id, &result, headers).await
            }
            AnalyzerKind::Summary => {
                let window_texts: Vec<String> = state.recent_messages.iter().map(|m| m.text.clone()).collect();
                let result = self
                    .model
                    .update_summary(
                        &ctx.tenant_id,
                        &ctx.conversation_id,
                        offset,
                        state.current_summary.as_ref(),
                        &window_texts,
                        &ctx.message,
                    )
                    .await;
                self.broker.produce_json(&output_topic, &ctx.conversation_id, &result, headers).await
            }
        };

        if let Err(e) = produced {
            warn!(worker = ?self.kind, error = %e, "failed to emit analyzer result");
        } else {
            debug!(worker = ?self.kind, conversation = %ctx.conversation_id, "analyzer result emitted");
        }
    }
}
