use std::hash::Hasher;

use fnv::FnvHasher;

/// Hash FNV-1a de la clave, recortado a 31 bits.
pub fn ihash(key: &str) -> u32 {
    let mut hasher = FnvHasher::default();
    hasher.write(key.as_bytes());
    (hasher.finish() & 0x7fff_ffff) as u32
}

/// Bucket de reduce que le toca a una clave: `ihash(key) % n_reduce`.
///
/// `n_reduce` tiene que ser >= 1.
pub fn bucket_for(key: &str, n_reduce: usize) -> usize {
    debug_assert!(n_reduce > 0, "n_reduce debe ser >= 1");
    ihash(key) as usize % n_reduce
}
