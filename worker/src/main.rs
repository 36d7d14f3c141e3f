use anyhow::Result;
use common::wordcount;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use worker::{run_worker, WorkerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("worker=debug,reqwest=info")),
        )
        .init();

    let config = WorkerConfig::from_env()?;
    run_worker(config, Arc::new(wordcount::map), Arc::new(wordcount::reduce)).await
}
