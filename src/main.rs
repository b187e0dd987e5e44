mod config;
mod error;
mod neo4j_storage;
mod pipeline;
mod records;
mod retry;
mod store;

use anyhow::{Context, Result};
use config::Config;
use pipeline::{Pipeline, PipelineOptions};
use tracing::{error, info, Instrument};
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("🚀 MovieLens graph ingestion starting...");

    let config = Config::from_env().context("Failed to load configuration")?;
    let run_id = Uuid::new_v4();

    run(config, run_id)
        .instrument(tracing::info_span!("ingest", %run_id))
        .await
}

async fn run(config: Config, run_id: Uuid) -> Result<()> {
    // Wait for Neo4j; it usually starts alongside us.
    let store = neo4j_storage::connect_with_retry(&config.neo4j, &config.retry).await?;

    let pipeline = Pipeline::new(
        &store,
        PipelineOptions {
            limits: config.limits.clone(),
            strict_references: config.strict_references,
            ensure_constraints: config.ensure_constraints,
        },
    );

    match pipeline.run(run_id, &config.sources).await {
        Ok(summary) => {
            let json = serde_json::to_string(&summary).context("Failed to serialize run summary")?;
            info!("✅ Ingestion complete: {}", json);
            Ok(())
        }
        Err(e) => {
            error!("❌ Ingestion failed: {}", e);
            Err(e).context("Ingestion aborted; re-run to resume, completed writes are upserts")
        }
    }
}

#[cfg(test)]
mod memory_store;
