use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Foto del estado del job: tamaño de cada pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusReport {
    pub n_reduce: usize,
    pub pending_map: usize,
    pub in_progress_map: usize,
    pub pending_reduce: usize,
    pub in_progress_reduce: usize,
    /// true sii los cuatro pools están vacíos
    pub done: bool,
    pub started_at: DateTime<Utc>,
}
