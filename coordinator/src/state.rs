// coordinator/src/state.rs

use chrono::{DateTime, Utc};
use common::{CompletionNotice, JobStatusReport, Task, TaskId, TaskKind};
use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct MapTask {
    pub id: TaskId,
    pub source_file: String,
    pub age_ticks: u32,
}

#[derive(Debug, Clone)]
pub struct ReduceTask {
    pub id: TaskId,
    /// Un intermedio por cada map completado (orden irrelevante)
    pub input_files: Vec<String>,
    pub age_ticks: u32,
}

/// Tarea devuelta a pendientes por el detector de fallos.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requeued {
    pub kind: TaskKind,
    pub id: TaskId,
}

trait Aged {
    fn age_ticks_mut(&mut self) -> &mut u32;
}

impl Aged for MapTask {
    fn age_ticks_mut(&mut self) -> &mut u32 {
        &mut self.age_ticks
    }
}

impl Aged for ReduceTask {
    fn age_ticks_mut(&mut self) -> &mut u32 {
        &mut self.age_ticks
    }
}

/// Modelo en memoria de todas las tareas del job.
///
/// Cada id vive en a lo sumo uno de {pendiente, en vuelo} de su fase.
/// Una tarea terminada sale de ambos pools y no vuelve.
#[derive(Debug)]
pub struct TaskPool {
    n_reduce: usize,
    pending_map: BTreeMap<TaskId, MapTask>,
    in_progress_map: BTreeMap<TaskId, MapTask>,
    pending_reduce: BTreeMap<TaskId, ReduceTask>,
    in_progress_reduce: BTreeMap<TaskId, ReduceTask>,
}

impl TaskPool {
    /// Una tarea map por archivo (en orden) y `n_reduce` tareas reduce sin entradas.
    pub fn new(files: &[String], n_reduce: usize) -> Self {
        let pending_map = files
            .iter()
            .enumerate()
            .map(|(id, file)| {
                (
                    id,
                    MapTask {
                        id,
                        source_file: file.clone(),
                        age_ticks: 0,
                    },
                )
            })
            .collect();

        let pending_reduce = (0..n_reduce)
            .map(|id| {
                (
                    id,
                    ReduceTask {
                        id,
                        input_files: Vec::new(),
                        age_ticks: 0,
                    },
                )
            })
            .collect();

        Self {
            n_reduce,
            pending_map,
            in_progress_map: BTreeMap::new(),
            pending_reduce,
            in_progress_reduce: BTreeMap::new(),
        }
    }

    pub fn n_reduce(&self) -> usize {
        self.n_reduce
    }

    /// Elige la próxima asignación, en orden de prioridad:
    /// 1. map pendiente de menor id
    /// 2. si quedan maps en vuelo, nada (barrera de fase)
    /// 3. reduce pendiente de menor id
    /// 4. nada
    pub fn assign(&mut self) -> Task {
        if let Some((id, mut task)) = self.pending_map.pop_first() {
            task.age_ticks = 0;
            let assignment = Task::map(id, task.source_file.clone(), self.n_reduce);
            self.in_progress_map.insert(id, task);
            return assignment;
        }

        if !self.in_progress_map.is_empty() {
            return Task::none(self.n_reduce);
        }

        if let Some((id, mut task)) = self.pending_reduce.pop_first() {
            task.age_ticks = 0;
            let assignment = Task::reduce(id, task.input_files.clone(), self.n_reduce);
            self.in_progress_reduce.insert(id, task);
            return assignment;
        }

        Task::none(self.n_reduce)
    }

    /// Aplica un aviso de tarea terminada. Devuelve `true` sii la tarea seguía
    /// en vuelo en el pool de su tipo; si no, el resultado del worker es viejo.
    pub fn complete(&mut self, notice: &CompletionNotice) -> bool {
        match notice.kind {
            TaskKind::Map => {
                if notice.produced_files.len() != self.n_reduce {
                    warn!(
                        "map {} reportó {} intermedios, se esperaban {}",
                        notice.id,
                        notice.produced_files.len(),
                        self.n_reduce
                    );
                    return false;
                }
                if self.in_progress_map.remove(&notice.id).is_none() {
                    return false;
                }
                for (bucket, file) in notice.produced_files.iter().enumerate() {
                    if let Some(reduce) = self.reduce_task_mut(bucket) {
                        reduce.input_files.push(file.clone());
                    }
                }
                true
            }
            TaskKind::Reduce => self.in_progress_reduce.remove(&notice.id).is_some(),
            TaskKind::None => false,
        }
    }

    fn reduce_task_mut(&mut self, id: TaskId) -> Option<&mut ReduceTask> {
        if let Some(task) = self.pending_reduce.get_mut(&id) {
            return Some(task);
        }
        self.in_progress_reduce.get_mut(&id)
    }

    /// Un tick del detector: envejece todo lo que está en vuelo y devuelve a
    /// pendientes (con edad 0) lo que llegó a `timeout_ticks`.
    pub fn tick(&mut self, timeout_ticks: u32) -> Vec<Requeued> {
        let mut requeued = Vec::new();

        for id in age_and_expire(
            &mut self.in_progress_map,
            &mut self.pending_map,
            timeout_ticks,
        ) {
            requeued.push(Requeued {
                kind: TaskKind::Map,
                id,
            });
        }

        for id in age_and_expire(
            &mut self.in_progress_reduce,
            &mut self.pending_reduce,
            timeout_ticks,
        ) {
            requeued.push(Requeued {
                kind: TaskKind::Reduce,
                id,
            });
        }

        requeued
    }

    /// El job terminó sii los cuatro pools están vacíos.
    pub fn is_complete(&self) -> bool {
        self.pending_map.is_empty()
            && self.in_progress_map.is_empty()
            && self.pending_reduce.is_empty()
            && self.in_progress_reduce.is_empty()
    }

    pub fn report(&self, started_at: DateTime<Utc>) -> JobStatusReport {
        JobStatusReport {
            n_reduce: self.n_reduce,
            pending_map: self.pending_map.len(),
            in_progress_map: self.in_progress_map.len(),
            pending_reduce: self.pending_reduce.len(),
            in_progress_reduce: self.in_progress_reduce.len(),
            done: self.is_complete(),
            started_at,
        }
    }

    /// Resumen de una línea para los logs.
    pub fn summary(&self) -> String {
        format!(
            "map pendientes={} en_vuelo={} | reduce pendientes={} en_vuelo={}",
            self.pending_map.len(),
            self.in_progress_map.len(),
            self.pending_reduce.len(),
            self.in_progress_reduce.len()
        )
    }

    #[cfg(test)]
    pub(crate) fn age_of(&self, kind: TaskKind, id: TaskId) -> Option<u32> {
        match kind {
            TaskKind::Map => self.in_progress_map.get(&id).map(|t| t.age_ticks),
            TaskKind::Reduce => self.in_progress_reduce.get(&id).map(|t| t.age_ticks),
            TaskKind::None => None,
        }
    }
}

fn age_and_expire<T: Aged>(
    in_progress: &mut BTreeMap<TaskId, T>,
    pending: &mut BTreeMap<TaskId, T>,
    timeout_ticks: u32,
) -> Vec<TaskId> {
    let mut expired = Vec::new();
    for (id, task) in in_progress.iter_mut() {
        let age = task.age_ticks_mut();
        *age += 1;
        if *age >= timeout_ticks {
            expired.push(*id);
        }
    }

    for id in &expired {
        if let Some(mut task) = in_progress.remove(id) {
            *task.age_ticks_mut() = 0;
            pending.insert(*id, task);
        }
    }

    expired
}

#[derive(Clone)]
pub struct AppState {
    // un único lock: handlers y detector nunca se intercalan
    pub pool: Arc<Mutex<TaskPool>>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(pool: TaskPool) -> Self {
        Self {
            pool: Arc::new(Mutex::new(pool)),
            started_at: Utc::now(),
        }
    }

    /// Acceso exclusivo al pool. Un lock envenenado se recupera: el pool
    /// queda consistente al final de cada sección crítica.
    pub fn pool(&self) -> MutexGuard<'_, TaskPool> {
        self.pool.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
