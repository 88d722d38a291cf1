// src/main.rs
// Process entrypoint: loads configuration, wires the broker, starts the
// Pipeline Supervisor, and serves the ingestion/read/subscribe HTTP surface.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use support_intel::api::{router, AppState};
use support_intel::broker::Broker;
use support_intel::config::PipelineConfig;
use support_intel::pipeline::PipelineSupervisor;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = PipelineConfig::from_env();
    info!(bind_address = %config.supervisor.bind_address, mock_mode = config.model.mock_mode, "starting support-intel");

    let broker = build_broker(&config)?;
    let supervisor = Arc::new(PipelineSupervisor::new(broker.clone(), config.clone()));

    let state = AppState {
        broker,
        topics: config.topics.clone(),
        processor: supervisor.processor(),
        aggregator: supervisor.aggregator(),
        broadcaster: supervisor.broadcaster(),
    };
    let app = router(state);

    let listener = TcpListener::bind(&config.supervisor.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", config.supervisor.bind_address))?;
    info!(addr = %config.supervisor.bind_address, "http server listening");

    let supervisor_task = tokio::spawn(supervisor.clone().run());

    let cancel = supervisor.cancellation_token();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("ctrl-c received, shutting down");
            cancel.cancel();
        })
        .await
        .context("http server error")?;

    supervisor_task.await.context("pipeline supervisor task panicked")?;
    Ok(())
}

fn build_broker(config: &PipelineConfig) -> Result<Arc<dyn Broker>> {
    #[cfg(feature = "kafka")]
    {
        use support_intel::broker::kafka::KafkaBroker;
        let broker = KafkaBroker::new(&config.broker).context("failed to initialize kafka broker")?;
        return Ok(Arc::new(broker));
    }
    #[cfg(not(feature = "kafka"))]
    {
        use support_intel::broker::memory::InMemoryBroker;
        let _ = &config.broker;
        Ok(Arc::new(InMemoryBroker::new()))
    }
}
