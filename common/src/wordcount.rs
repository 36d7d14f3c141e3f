use crate::kv::KeyValue;

/// map de WordCount: emite (palabra, "1") por cada token.
/// Limpia cada token: solo alfanumérico y '_', en minúscula.
pub fn map(_filename: &str, contents: &str) -> Vec<KeyValue> {
    let mut out = Vec::new();

    for raw in contents.split_whitespace() {
        let cleaned: String = raw
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '_')
            .collect::<String>()
            .to_lowercase();

        if !cleaned.is_empty() {
            out.push(KeyValue::new(cleaned, "1"));
        }
    }

    out
}

/// reduce de WordCount: cantidad de apariciones.
pub fn reduce(_key: &str, values: &[String]) -> String {
    values.len().to_string()
}
