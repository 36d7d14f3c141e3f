use serde::{Deserialize, Serialize};

/// Id de una tarea. Map: índice del archivo de entrada. Reduce: índice del bucket.
pub type TaskId = usize;
pub type WorkerId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskKind {
    Map,
    Reduce,
    /// No hay trabajo disponible por ahora; el worker espera y vuelve a pedir.
    None,
}

/// Asignación que el coordinator entrega a un worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub kind: TaskKind,
    pub id: TaskId,
    /// Map: un único archivo de entrada. Reduce: los intermedios del bucket.
    pub files: Vec<String>,
    /// Cantidad total de buckets, la necesita el map para particionar
    pub n_reduce: usize,
}

impl Task {
    pub fn map(id: TaskId, source_file: String, n_reduce: usize) -> Self {
        Self {
            kind: TaskKind::Map,
            id,
            files: vec![source_file],
            n_reduce,
        }
    }

    pub fn reduce(id: TaskId, input_files: Vec<String>, n_reduce: usize) -> Self {
        Self {
            kind: TaskKind::Reduce,
            id,
            files: input_files,
            n_reduce,
        }
    }

    pub fn none(n_reduce: usize) -> Self {
        Self {
            kind: TaskKind::None,
            id: 0,
            files: Vec::new(),
            n_reduce,
        }
    }

    pub fn is_none(&self) -> bool {
        self.kind == TaskKind::None
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentRequest {
    pub worker_id: WorkerId,
    pub hostname: String,
}

/// Aviso de tarea terminada que el worker manda al coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionNotice {
    pub worker_id: WorkerId,
    pub kind: TaskKind,
    pub id: TaskId,
    /// Map: los n_reduce intermedios escritos, indexados por bucket. Reduce: vacío.
    pub produced_files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionReply {
    /// false = el coordinator ya no considera a este worker dueño de la tarea
    pub accepted: bool,
}
