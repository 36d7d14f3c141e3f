use anyhow::{Context, Result};
use clap::Parser;
use coordinator::{Coordinator, CoordinatorConfig};
use glob::glob;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "coordinator")]
#[command(about = "Coordinator de un job map/reduce")]
struct Cli {
    /// Archivos de entrada (acepta patrones glob, ej: "data/pg-*.txt")
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<String>,

    /// Cantidad de buckets de reduce
    #[arg(long, default_value_t = 10)]
    n_reduce: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("coordinator=debug,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();
    let files = expand_inputs(&cli.inputs)?;
    let config = CoordinatorConfig::from_env()?;

    let coordinator = Coordinator::start(files, cli.n_reduce, config).await?;

    while !coordinator.is_job_complete() {
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
    info!("job completo");

    // margen para que los workers vean el último aviso aceptado
    tokio::time::sleep(Duration::from_secs(1)).await;
    coordinator.shutdown().await;
    Ok(())
}

// Expande cada argumento como patrón glob; un nombre literal se matchea a sí mismo
fn expand_inputs(patterns: &[String]) -> Result<Vec<String>> {
    let mut files = Vec::new();

    for pattern in patterns {
        let mut matched = false;
        for entry in glob(pattern).with_context(|| format!("patrón inválido: {}", pattern))? {
            let path = entry?;
            if path.is_file() {
                files.push(path.to_string_lossy().to_string());
                matched = true;
            }
        }
        if !matched {
            warn!("el patrón {} no coincide con ningún archivo", pattern);
        }
    }

    Ok(files)
}
