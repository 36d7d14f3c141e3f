use anyhow::{anyhow, bail, Context, Result};
use common::{
    bucket_for,
    kv::{self, intermediate_name, output_name},
    KeyValue, Task,
};
use std::{
    fs,
    io::{self, BufWriter, Write},
    path::Path,
    sync::Arc,
};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Función map del usuario: (nombre de archivo, contenido) -> pares clave/valor.
/// Puede capturar estado; se comparte entre tareas.
pub type MapFn = Arc<dyn Fn(&str, &str) -> Vec<KeyValue> + Send + Sync>;

/// Función reduce del usuario: (clave, valores) -> resultado.
pub type ReduceFn = Arc<dyn Fn(&str, &[String]) -> String + Send + Sync>;

/* =========================
   Map
   ========================= */

/// Ejecuta una tarea map:
///
/// 1. Lee el archivo de entrada `files[0]`.
/// 2. Aplica `map_fn`.
/// 3. Manda cada par al bucket `hash(key) % n_reduce`.
/// 4. Deja un intermedio `mr-<map>-<bucket>` por bucket, aunque quede vacío.
///
/// Cada intermedio se escribe en un temporal y se renombra al final, así un
/// archivo visible siempre es la salida completa de un único intento.
/// Devuelve los nombres de los intermedios indexados por bucket.
pub fn run_map<F>(work_dir: &Path, task: &Task, map_fn: F) -> Result<Vec<String>>
where
    F: Fn(&str, &str) -> Vec<KeyValue>,
{
    let source = task
        .files
        .first()
        .ok_or_else(|| anyhow!("tarea map {} sin archivo de entrada", task.id))?;
    if task.n_reduce == 0 {
        bail!("tarea map {} con n_reduce = 0", task.id);
    }

    let input_path = work_dir.join(source);
    let contents = fs::read_to_string(&input_path)
        .with_context(|| format!("no se pudo leer {}", input_path.display()))?;
    let records = map_fn(source, &contents);
    debug!("map {}: {} pares desde {}", task.id, records.len(), source);

    let mut writers = Vec::with_capacity(task.n_reduce);
    for _ in 0..task.n_reduce {
        let tmp = NamedTempFile::new_in(work_dir).with_context(|| {
            format!("no se pudo crear temporal en {}", work_dir.display())
        })?;
        writers.push(BufWriter::new(tmp));
    }

    for kv in &records {
        let bucket = bucket_for(&kv.key, task.n_reduce);
        kv::write_record(&mut writers[bucket], kv)?;
    }

    let mut produced = Vec::with_capacity(task.n_reduce);
    for (bucket, writer) in writers.into_iter().enumerate() {
        let tmp = writer.into_inner().map_err(|e| e.into_error())?;
        let name = intermediate_name(task.id, bucket);
        tmp.persist(work_dir.join(&name))
            .with_context(|| format!("no se pudo dejar {} en su lugar", name))?;
        produced.push(name);
    }

    Ok(produced)
}

/* =========================
   Reduce
   ========================= */

/// Ejecuta una tarea reduce: junta todos los intermedios del bucket, ordena
/// por clave y escribe `mr-out-<bucket>`. Devuelve el nombre de la salida.
pub fn run_reduce<F>(work_dir: &Path, task: &Task, reduce_fn: F) -> Result<String>
where
    F: Fn(&str, &[String]) -> String,
{
    let mut records = Vec::new();
    for name in &task.files {
        let path = work_dir.join(name);
        let mut recs = kv::read_records(&path)
            .with_context(|| format!("no se pudo leer el intermedio {}", path.display()))?;
        records.append(&mut recs);
    }
    debug!(
        "reduce {}: {} pares desde {} intermedios",
        task.id,
        records.len(),
        task.files.len()
    );

    // sort_by es estable: claves iguales quedan en orden de lectura
    records.sort_by(|a, b| a.key.cmp(&b.key));

    let mut tmp = NamedTempFile::new_in(work_dir)
        .with_context(|| format!("no se pudo crear temporal en {}", work_dir.display()))?;
    {
        let mut writer = BufWriter::new(&mut tmp);
        write_reduced(&mut writer, &records, reduce_fn)?;
        writer.flush()?;
    }

    let name = output_name(task.id);
    tmp.persist(work_dir.join(&name))
        .with_context(|| format!("no se pudo dejar {} en su lugar", name))?;

    Ok(name)
}

/// Llama a `reduce_fn` una vez por clave distinta (en orden) y escribe
/// `"<clave> <resultado>\n"`. `sorted` tiene que venir ordenado por clave.
pub fn write_reduced<W, F>(writer: &mut W, sorted: &[KeyValue], reduce_fn: F) -> io::Result<()>
where
    W: Write,
    F: Fn(&str, &[String]) -> String,
{
    for group in sorted.chunk_by(|a, b| a.key == b.key) {
        let key = &group[0].key;
        let values: Vec<String> = group.iter().map(|kv| kv.value.clone()).collect();
        writeln!(writer, "{} {}", key, reduce_fn(key, &values))?;
    }
    Ok(())
}

/// Borra los intermedios de un reduce aceptado. Un fallo acá no es fatal.
pub fn remove_inputs(work_dir: &Path, files: &[String]) {
    for name in files {
        let path = work_dir.join(name);
        if let Err(e) = fs::remove_file(&path) {
            warn!("no se pudo borrar {}: {}", path.display(), e);
        }
    }
}
