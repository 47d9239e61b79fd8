//! Valores deterministas derivados con sha256.

use sha2::{Digest, Sha256};

/// Digest hex de un set de archivos (orden ya resuelto por el caller) y un
/// discriminador.
pub fn frame_digest<S: AsRef<str>>(files: &[S], salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    for f in files {
        hasher.update(b"\n");
        hasher.update(f.as_ref().as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Número en [0, 1) estable para (`seed`, `index`).
pub fn unit_score(seed: &str, index: usize) -> f64 {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(index.to_le_bytes());
    let out = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&out[..8]);
    (u64::from_le_bytes(bytes) >> 11) as f64 / (1u64 << 53) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_depends_on_salt_and_files() {
        let a = frame_digest(&["a.fits", "b.fits"], "bias");
        assert_eq!(a.len(), 64);
        assert_eq!(a, frame_digest(&["a.fits", "b.fits"], "bias"));
        assert_ne!(a, frame_digest(&["a.fits"], "bias"));
        assert_ne!(a, frame_digest(&["a.fits", "b.fits"], "arc"));
    }

    #[test]
    fn score_is_in_unit_interval() {
        for i in 0..64 {
            let s = unit_score("seed", i);
            assert!((0.0..1.0).contains(&s));
        }
        assert_eq!(unit_score("seed", 3), unit_score("seed", 3));
    }
}
