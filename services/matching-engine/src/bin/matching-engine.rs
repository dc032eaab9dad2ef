//! Standalone matching engine
//!
//! Reads line-delimited JSON commands from stdin and writes every engine
//! event as one JSON line to stdout. Logs go to stderr.
//!
//! Environment:
//! - `MATCHING_ENGINE_CONFIG`: optional path to a JSON `EngineConfig`
//! - `RUST_LOG`: log filter, `info` by default

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use matching_engine::publisher::PublishError;
use matching_engine::{
    Command, EngineConfig, EngineEvent, EventPublisher, EventSink, MatchingEngine,
    MemoryOrderStore,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

const CONFIG_ENV: &str = "MATCHING_ENGINE_CONFIG";

/// Writes events as JSON lines to stdout
struct StdoutSink {
    out: Mutex<tokio::io::Stdout>,
}

#[async_trait]
impl EventSink for StdoutSink {
    async fn publish(&self, event: &EngineEvent) -> Result<(), PublishError> {
        let mut line =
            serde_json::to_vec(event).map_err(|e| PublishError::Unavailable(e.to_string()))?;
        line.push(b'\n');

        let mut out = self.out.lock().await;
        out.write_all(&line)
            .await
            .map_err(|e| PublishError::Unavailable(e.to_string()))?;
        out.flush()
            .await
            .map_err(|e| PublishError::Unavailable(e.to_string()))
    }
}

fn load_config() -> anyhow::Result<EngineConfig> {
    let Ok(path) = std::env::var(CONFIG_ENV) else {
        return Ok(EngineConfig::default());
    };
    let json = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
    EngineConfig::from_json(&json).with_context(|| format!("parsing {path}"))
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config()?;
    tracing::info!(?config, "Starting matching engine");

    let sink = Arc::new(StdoutSink {
        out: Mutex::new(tokio::io::stdout()),
    });
    let (publisher, worker) = EventPublisher::spawn(sink, None, config.publisher.clone());

    let store = Arc::new(MemoryOrderStore::new());
    let engine = MatchingEngine::new(store, publisher, config);
    engine.start().await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        };
        let Some(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let result = match Command::decode(line.as_bytes()) {
            Ok(command) => engine.dispatch(command).await,
            Err(err) => Err(err),
        };
        match result {
            Ok(outcome) => tracing::debug!(?outcome, "Command applied"),
            Err(err) => tracing::warn!(error = %err, "Command failed"),
        }
    }

    // Dropping the engine closes the hand-off queue; wait for it to drain
    drop(engine);
    let stats = worker.await?;
    tracing::info!(
        published = stats.published,
        dropped = stats.dropped,
        "Matching engine stopped"
    );

    Ok(())
}
