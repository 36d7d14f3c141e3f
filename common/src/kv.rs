use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{self, BufRead, BufReader, Write},
    path::Path,
};

/// Par clave/valor que emite la función map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Nombre del intermedio que escribe la tarea map `map_id` para el bucket `bucket`.
pub fn intermediate_name(map_id: usize, bucket: usize) -> String {
    format!("mr-{}-{}", map_id, bucket)
}

/// Nombre del archivo de salida del bucket `bucket`.
pub fn output_name(bucket: usize) -> String {
    format!("mr-out-{}", bucket)
}

/// Escribe un registro como una línea JSON.
pub fn write_record<W: Write>(writer: &mut W, kv: &KeyValue) -> io::Result<()> {
    serde_json::to_writer(&mut *writer, kv)?;
    writer.write_all(b"\n")
}

/// Lee un intermedio (JSONL) completo. Una línea que no decodifica es un error.
pub fn read_records(path: &Path) -> io::Result<Vec<KeyValue>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let kv: KeyValue = serde_json::from_str(&line)?;
        out.push(kv);
    }

    Ok(out)
}
