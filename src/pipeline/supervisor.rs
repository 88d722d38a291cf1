// src/pipeline/supervisor.rs
// Pipeline Supervisor: boots every component, restarts a crashed task
// with backoff while isolating failures, and drains on shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::broker::Broker;
use crate::config::PipelineConfig;
use crate::model::ModelClient;

use super::broadcaster::Broadcaster;
use super::processor::ConversationProcessor;
use super::workers::{AnalyzerKind, AnalyzerWorker};
use super::Aggregator;

const RESTART_BACKOFF: Duration = Duration::from_secs(2);

pub struct PipelineSupervisor {
    broker: Arc<dyn Broker>,
    config: PipelineConfig,
    model: Arc<ModelClient>,
    processor: Arc<ConversationProcessor>,
    aggregator: Arc<Aggregator>,
    broadcaster: Arc<Broadcaster>,
    cancel: CancellationToken,
}

impl PipelineSupervisor {
    pub fn new(broker: Arc<dyn Broker>, config: PipelineConfig) -> Self {
        let model = Arc::new(ModelClient::new(config.model.clone()));
        let broadcaster = Arc::new(Broadcaster::new(config.supervisor.subscriber_queue_depth));
        let processor = Arc::new(ConversationProcessor::new(
            broker.clone(),
            config.topics.clone(),
            &config.supervisor,
        ));
        let aggregator = Arc::new(Aggregator::new(broker.clone(), config.topics.clone(), broadcaster.clone()));

        Self {
            broker,
            config,
            model,
            processor,
            aggregator,
            broadcaster,
            cancel: CancellationToken::new(),
        }
    }

    pub fn broadcaster(&self) -> Arc<Broadcaster> {
        self.broadcaster.clone()
    }

    pub fn processor(&self) -> Arc<ConversationProcessor> {
        self.processor.clone()
    }

    pub fn aggregator(&self) -> Arc<Aggregator> {
        self.aggregator.clone()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Ensures every topic exists, then starts the Processor, the four
    /// Analyzer Workers, and the Aggregator as independently supervised
    /// tasks. Returns once `cancel` fires and every component has drained.
    pub async fn run(self: Arc<Self>) {
        info!("pipeline supervisor starting");
        for topic in self.config.topics.all() {
            if let Err(e) = self.broker.create_topic(topic, 3).await {
                warn!(topic, error = %e, "failed to ensure topic exists");
            }
        }

        let mut handles: Vec<JoinHandle<()>> = Vec::new();

        handles.push(self.clone().supervise("processor", {
            let processor = self.processor.clone();
            move |cancel| {
                let processor = processor.clone();
                async move { processor.run(cancel).await }
            }
        }));

        for kind in [
            AnalyzerKind::Sentiment,
            AnalyzerKind::Pii,
            AnalyzerKind::Insights,
            AnalyzerKind::Summary,
        ] {
            let worker = Arc::new(AnalyzerWorker::new(
                kind,
                self.broker.clone(),
                self.model.clone(),
                self.config.topics.clone(),
            ));
            handles.push(self.clone().supervise(worker_label(kind), move |cancel| {
                let worker = worker.clone();
                async move { worker.run(cancel).await }
            }));
        }

        handles.push(self.clone().supervise("aggregator", {
            let aggregator = self.aggregator.clone();
            move |cancel| {
                let aggregator = aggregator.clone();
                async move { aggregator.run(cancel).await }
            }
        }));

        self.cancel.cancelled().await;
        info!(
            grace_seconds = self.config.supervisor.shutdown_grace_seconds,
            "shutdown requested, draining components"
        );

        let grace = Duration::from_secs(self.config.supervisor.shutdown_grace_seconds);
        let drain = futures::future::join_all(handles);
        if tokio::time::timeout(grace, drain).await.is_err() {
            warn!("shutdown grace period elapsed before all components drained");
        }
        info!("pipeline supervisor stopped");
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Runs `task` to completion; if it returns (a crash, since these loops
    /// only exit via cancellation) before `cancel` fires, restarts it after
    /// a fixed backoff. Isolates a single component's failure from the rest
    /// of the pipeline.
    fn supervise<F, Fut>(self: Arc<Self>, label: &'static str, task: F) -> JoinHandle<()>
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            loop {
                task(cancel.clone()).await;
                if cancel.is_cancelled() {
                    break;
                }
                error!(component = label, backoff = ?RESTART_BACKOFF, "component exited unexpectedly, restarting");
                tokio::time::sleep(RESTART_BACKOFF).await;
            }
        })
    }
}

fn worker_label(kind: AnalyzerKind) -> &'static str {
    match kind {
        AnalyzerKind::Sentiment => "analyzer-sentiment",
        AnalyzerKind::Pii => "analyzer-pii",
        AnalyzerKind::Insights => "analyzer-insights",
        AnalyzerKind::Summary => "analyzer-summary",
    }
}
