use anyhow::{Context, Result};
use common::{endpoint, AssignmentRequest, CompletionNotice, Task, TaskKind};
use std::{env, path::PathBuf, sync::Arc, time::Duration};
use tokio::time::sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::executor::{self, MapFn, ReduceFn};
use crate::rpc::CoordinatorClient;

/// Espera cuando el coordinator responde que no hay trabajo.
pub const IDLE_BACKOFF: Duration = Duration::from_secs(5);
/// Pausa entre una tarea y el siguiente pedido.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub coordinator_url: String,
    /// Directorio compartido donde viven entradas, intermedios y salidas
    pub work_dir: PathBuf,
    pub idle_backoff: Duration,
    pub poll_interval: Duration,
}

impl WorkerConfig {
    /// Lee la config del entorno:
    /// - MR_COORDINATOR_ADDR: dirección del coordinator (default: la del usuario)
    /// - MR_WORK_DIR: directorio de trabajo (default: ".")
    pub fn from_env() -> Result<Self> {
        let addr = endpoint::coordinator_addr()?;
        let work_dir = env::var("MR_WORK_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));

        Ok(Self {
            coordinator_url: endpoint::base_url(addr),
            work_dir,
            idle_backoff: IDLE_BACKOFF,
            poll_interval: POLL_INTERVAL,
        })
    }
}

/// Loop principal del worker:
/// - pide tarea al coordinator
/// - si no hay, espera `idle_backoff` y vuelve a pedir
/// - ejecuta el map o el reduce
/// - reporta; si un reduce fue aceptado borra sus intermedios
///
/// Vuelve con `Ok(())` cuando no puede conectarse al coordinator (el job
/// terminó) y con `Err` ante cualquier error de E/S local: la recuperación
/// queda en manos del timeout del coordinator.
pub async fn run_worker(config: WorkerConfig, map_fn: MapFn, reduce_fn: ReduceFn) -> Result<()> {
    let client = CoordinatorClient::new(config.coordinator_url.clone())?;

    let worker_id = Uuid::new_v4().to_string();
    let hostname = hostname::get()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();
    info!(
        "worker {} ({}) contra {} en {}",
        worker_id,
        hostname,
        client.base_url(),
        config.work_dir.display()
    );

    let request = AssignmentRequest {
        worker_id: worker_id.clone(),
        hostname,
    };

    loop {
        let task = match client.request_assignment(&request).await {
            Ok(task) => task,
            Err(e) if e.is_connect() => {
                info!(
                    "no se pudo contactar al coordinator ({}), asumimos job terminado",
                    e
                );
                return Ok(());
            }
            Err(e) => {
                warn!(
                    "error pidiendo tarea: {:?}, reintento en {:?}",
                    e, config.idle_backoff
                );
                sleep(config.idle_backoff).await;
                continue;
            }
        };

        if task.is_none() {
            debug!("no hay tareas, esperando {:?}...", config.idle_backoff);
            sleep(config.idle_backoff).await;
            continue;
        }

        let produced_files = execute(&config, &task, &map_fn, &reduce_fn).await?;

        let notice = CompletionNotice {
            worker_id: worker_id.clone(),
            kind: task.kind,
            id: task.id,
            produced_files,
        };
        let accepted = match client.report_completion(&notice).await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("no se pudo reportar {:?} {}: {:?}", task.kind, task.id, e);
                false
            }
        };

        if accepted {
            info!("{:?} {} aceptada", task.kind, task.id);
            if task.kind == TaskKind::Reduce {
                executor::remove_inputs(&config.work_dir, &task.files);
            }
        } else {
            warn!(
                "{:?} {} rechazada: otro worker quedó con la tarea, descarto el resultado",
                task.kind, task.id
            );
        }

        sleep(config.poll_interval).await;
    }
}

// Corre el map o el reduce en el pool de bloqueo. Devuelve los intermedios
// producidos (vacío para reduce).
async fn execute(
    config: &WorkerConfig,
    task: &Task,
    map_fn: &MapFn,
    reduce_fn: &ReduceFn,
) -> Result<Vec<String>> {
    let work_dir = config.work_dir.clone();
    let owned = task.clone();
    let map_fn = Arc::clone(map_fn);
    let reduce_fn = Arc::clone(reduce_fn);

    match task.kind {
        TaskKind::Map => {
            info!("map {} sobre {:?}", task.id, task.files);
            tokio::task::spawn_blocking(move || executor::run_map(&work_dir, &owned, &*map_fn))
                .await
                .context("la tarea map entró en pánico")?
        }
        TaskKind::Reduce => {
            info!("reduce {} sobre {} intermedios", task.id, task.files.len());
            let output = tokio::task::spawn_blocking(move || {
                executor::run_reduce(&work_dir, &owned, &*reduce_fn)
            })
            .await
            .context("la tarea reduce entró en pánico")??;
            debug!("reduce {} escribió {}", task.id, output);
            Ok(Vec::new())
        }
        TaskKind::None => Ok(Vec::new()),
    }
}
