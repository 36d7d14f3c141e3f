use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use common::{endpoint, JobStatusReport};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

#[derive(Parser)]
#[command(name = "client")]
#[command(about = "CLI simple para consultar al coordinator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Muestra el estado del job (tamaño de cada pool)
    Status,
    /// Espera hasta que el job termine
    Wait {
        /// Segundos entre consultas
        #[arg(long, default_value_t = 1)]
        interval_secs: u64,
    },
}

async fn fetch_status(client: &Client, base_url: &str) -> Result<JobStatusReport> {
    let url = format!("{}/api/v1/status", base_url);
    let report = client
        .get(&url)
        .send()
        .await
        .with_context(|| format!("no se pudo contactar al coordinator en {}", base_url))?
        .error_for_status()?
        .json()
        .await?;
    Ok(report)
}

fn print_status(report: &JobStatusReport) {
    println!("Job:");
    println!("  iniciado: {}", report.started_at);
    println!("  n_reduce: {}", report.n_reduce);
    println!(
        "  map:    {} pendientes, {} en vuelo",
        report.pending_map, report.in_progress_map
    );
    println!(
        "  reduce: {} pendientes, {} en vuelo",
        report.pending_reduce, report.in_progress_reduce
    );
    println!("  terminado: {}", if report.done { "sí" } else { "no" });
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let client = Client::builder().no_proxy().build()?;
    let base_url = endpoint::base_url(endpoint::coordinator_addr()?);

    match cli.command {
        Commands::Status => {
            let report = fetch_status(&client, &base_url).await?;
            print_status(&report);
        }
        Commands::Wait { interval_secs } => loop {
            let report = fetch_status(&client, &base_url).await?;
            if report.done {
                print_status(&report);
                break;
            }
            debug!(
                "faltan {} maps y {} reduces",
                report.pending_map + report.in_progress_map,
                report.pending_reduce + report.in_progress_reduce
            );
            tokio::time::sleep(Duration::from_secs(interval_secs)).await;
        },
    }

    Ok(())
}
