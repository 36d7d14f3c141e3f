use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::state::{AppState, Requeued};

/// Loop del detector de fallos: un tick cada `tick`.
/// No hay heartbeats; el único síntoma de un worker caído es que su tarea
/// envejece en vuelo sin que llegue el aviso de terminada.
pub async fn run_failover_loop(state: AppState, tick: Duration, timeout_ticks: u32) {
    loop {
        sleep(tick).await;
        sweep_once(&state, timeout_ticks);
    }
}

/// Una pasada: envejece lo que está en vuelo y reencola lo vencido,
/// todo dentro de la misma sección crítica que usan los handlers.
pub fn sweep_once(state: &AppState, timeout_ticks: u32) -> Vec<Requeued> {
    let mut pool = state.pool();
    let requeued = pool.tick(timeout_ticks);

    for r in &requeued {
        warn!(
            "{:?} {} sin completar tras {} ticks, vuelve a pendientes",
            r.kind, r.id, timeout_ticks
        );
    }
    if !requeued.is_empty() {
        debug!("estado: {}", pool.summary());
    }

    requeued
}
