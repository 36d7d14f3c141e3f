use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use common::{
    AssignmentRequest, CompletionNotice, CompletionReply, JobStatusReport, Task, TaskKind,
};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/tasks/next", post(assign_task))
        .route("/api/v1/tasks/complete", post(complete_task))
        .route("/api/v1/status", get(job_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/* ---------------- handlers HTTP ---------------- */

async fn health() -> &'static str {
    "ok"
}

// Entrega la próxima tarea. "No hay trabajo" es una respuesta válida (kind = NONE).
async fn assign_task(
    State(state): State<AppState>,
    Json(req): Json<AssignmentRequest>,
) -> Json<Task> {
    let task = {
        let mut pool = state.pool();
        let task = pool.assign();
        if !task.is_none() {
            debug!("estado: {}", pool.summary());
        }
        task
    };

    match task.kind {
        TaskKind::Map => info!(
            "asignando map {} (input={}) al worker {} ({})",
            task.id,
            task.files.first().map(String::as_str).unwrap_or_default(),
            req.worker_id,
            req.hostname
        ),
        TaskKind::Reduce => info!(
            "asignando reduce {} ({} intermedios) al worker {} ({})",
            task.id,
            task.files.len(),
            req.worker_id,
            req.hostname
        ),
        TaskKind::None => debug!(
            "worker {} pidió tarea pero no hay disponibles",
            req.worker_id
        ),
    }

    Json(task)
}

// Worker reporta que terminó una tarea
async fn complete_task(
    State(state): State<AppState>,
    Json(notice): Json<CompletionNotice>,
) -> Json<CompletionReply> {
    let accepted = {
        let mut pool = state.pool();
        let accepted = pool.complete(&notice);
        if accepted {
            debug!("estado: {}", pool.summary());
        }
        accepted
    };

    if accepted {
        info!(
            "{:?} {} completada por el worker {}",
            notice.kind, notice.id, notice.worker_id
        );
    } else {
        warn!(
            "aviso de {:?} {} del worker {} rechazado: la tarea ya no está en vuelo para él",
            notice.kind, notice.id, notice.worker_id
        );
    }

    Json(CompletionReply { accepted })
}

async fn job_status(State(state): State<AppState>) -> Json<JobStatusReport> {
    let report = state.pool().report(state.started_at);
    Json(report)
}
