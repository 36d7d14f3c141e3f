mod failover;
mod handlers;
mod state;

pub use failover::sweep_once;
pub use handlers::build_router;
pub use state::{AppState, MapTask, ReduceTask, Requeued, TaskPool};

use anyhow::{bail, Context, Result};
use common::{endpoint, JobStatusReport};
use std::{net::SocketAddr, time::Duration};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};
use tracing::{info, warn};

pub const TICK_INTERVAL: Duration = Duration::from_secs(1);
pub const TIMEOUT_TICKS: u32 = 10;

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub addr: SocketAddr,
    /// Período del detector de fallos
    pub tick: Duration,
    /// Ticks en vuelo tras los que una tarea vuelve a pendientes
    pub timeout_ticks: u32,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            addr: endpoint::default_coordinator_addr(),
            tick: TICK_INTERVAL,
            timeout_ticks: TIMEOUT_TICKS,
        }
    }
}

impl CoordinatorConfig {
    /// Config por defecto, con MR_COORDINATOR_ADDR si está definida.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            addr: endpoint::coordinator_addr()?,
            ..Self::default()
        })
    }
}

/// Coordinator en marcha: servidor HTTP + detector de fallos sobre el mismo pool.
pub struct Coordinator {
    state: AppState,
    local_addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    server: JoinHandle<()>,
    failover: JoinHandle<()>,
}

impl Coordinator {
    /// Crea una tarea map por archivo y `n_reduce` tareas reduce, levanta el
    /// listener y el detector, y vuelve enseguida.
    pub async fn start(
        files: Vec<String>,
        n_reduce: usize,
        config: CoordinatorConfig,
    ) -> Result<Self> {
        if n_reduce == 0 {
            bail!("n_reduce debe ser >= 1");
        }

        let state = AppState::new(TaskPool::new(&files, n_reduce));

        let listener = TcpListener::bind(config.addr)
            .await
            .with_context(|| format!("no se pudo escuchar en {}", config.addr))?;
        let local_addr = listener.local_addr()?;
        info!(
            "coordinator escuchando en {} ({} maps, {} reduces)",
            local_addr,
            files.len(),
            n_reduce
        );

        let app = build_router(state.clone());
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            let shutdown = async {
                let _ = shutdown_rx.await;
            };
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                warn!("error en el servidor HTTP: {:?}", e);
            }
        });

        let failover = tokio::spawn(failover::run_failover_loop(
            state.clone(),
            config.tick,
            config.timeout_ticks,
        ));

        Ok(Self {
            state,
            local_addr,
            shutdown_tx: Some(shutdown_tx),
            server,
            failover,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// true sii no queda ninguna tarea pendiente ni en vuelo.
    pub fn is_job_complete(&self) -> bool {
        self.state.pool().is_complete()
    }

    pub fn status(&self) -> JobStatusReport {
        self.state.pool().report(self.state.started_at)
    }

    /// Frena el detector, deja de aceptar conexiones y espera a que cierren las abiertas.
    pub async fn shutdown(mut self) {
        self.failover.abort();
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let _ = (&mut self.server).await;
        info!("coordinator detenido");
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.failover.abort();
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
