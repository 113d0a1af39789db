//! Canonical serialization for deterministic hashing.
//!
//! ## Determinism Guarantees
//!
//! - Stable field order: struct fields serialize in declaration order
//! - Stable map order: only `BTreeMap` is used in hashed data
//! - Stable floats: a float serializes to its shortest round-trip decimal,
//!   so equal bits always hash equally. Values that should tolerate float
//!   noise, such as policy parameters, go through [`quantize_float`] first.
//!   Export snapshots hash their floats exactly.

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

/// Floats are multiplied by this value and rounded to i64 before hashing.
pub const FLOAT_QUANTIZATION_FACTOR: f64 = 1_000_000.0;

/// Quantize a float for hashing.
pub fn quantize_float(value: f64) -> i64 {
    (value * FLOAT_QUANTIZATION_FACTOR).round() as i64
}

/// Serialize a value to canonical JSON bytes for hashing.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).expect("Canonical serialization failed")
}

/// Compute canonical hash of a serializable value.
pub fn canonical_hash<T: Serialize>(value: &T) -> u64 {
    xxh64(&to_canonical_bytes(value), 0)
}

/// Compute canonical hash and return as hex string.
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> String {
    format!("{:016x}", canonical_hash(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_determinism() {
        let mut provenance = BTreeMap::new();
        provenance.insert("hero.png", quantize_float(0.9));
        provenance.insert("about.png", quantize_float(0.6));

        assert_eq!(canonical_hash(&provenance), canonical_hash(&provenance.clone()));
        assert_eq!(canonical_hash_hex(&provenance).len(), 16);
    }

    #[test]
    fn test_quantize_float() {
        assert_eq!(quantize_float(0.992), 992_000);
        assert_eq!(quantize_float(0.1 + 0.2), quantize_float(0.3));
    }

    #[test]
    fn test_raw_floats_hash_exactly() {
        assert_eq!(canonical_hash(&(0.1 + 0.2)), canonical_hash(&(0.1 + 0.2)));
        assert_ne!(canonical_hash(&(0.1 + 0.2)), canonical_hash(&0.3));
        assert_eq!(canonical_hash(&quantize_float(0.1 + 0.2)), canonical_hash(&quantize_float(0.3)));
    }
}
