//! # design-token-kernel
//!
//! Perceptual aggregation and reference graph for design tokens.
//!
//! The kernel answers one question:
//!
//! > Given many per-image observations of colors, spacings, radii, shadows
//! > and type, which **distinct design tokens** do they describe?
//!
//! ## Core Contract
//!
//! 1. Deduplicate raw candidates perceptually, per category, keeping full provenance
//! 2. Hold the result in a [`TokenLibrary`] with a typed reference graph (aliases, dependencies)
//! 3. Export a fixed, alias-resolved snapshot in four formats
//!
//! ## Architecture
//!
//! ```text
//! RawCandidate* → Aggregator(policy) → TokenLibrary ──▶ ResolvedSnapshot ──▶ render(format)
//!                       ↓                   │
//!              metric (ΔE00, % diff)        ├── TokenStore
//!                                           └── ReferenceGraph
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Same candidates + same policy → same partition into tokens
//! - Token ordering is canonical (category, then id)
//! - Edge ordering is canonical (from, to, kind)
//! - Exports are byte-identical for identical libraries

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aggregator;
pub mod canonical;
pub mod error;
pub mod export;
pub mod graph;
pub mod library;
pub mod metric;
pub mod policy;
pub mod store;
pub mod types;

// Re-exports
pub use aggregator::{aggregate, Aggregation, AggregationReport, Aggregator};
pub use canonical::{canonical_hash, canonical_hash_hex, to_canonical_bytes};
pub use error::TokenError;
pub use export::{render, render_with, ExportError, ExportFormat, ExportOptions, ResolvedSnapshot};
pub use graph::ReferenceGraph;
pub use library::{
    BatchId, CacheConfig, CacheStats, LibraryStats, RenderResult, SharedLibrary, TokenLibrary,
};
pub use metric::{delta_e_2000, distance, merge, DISJOINT};
pub use policy::{AggregationPolicy, DEFAULT_THRESHOLD, THRESHOLD_ENV};
pub use store::TokenStore;
pub use types::{
    CanonicalToken, Category, ColorValue, Edge, EdgeKind, Provenance, RawCandidate, Role,
    ShadowValue, TokenAttributes, TokenId, TypographyValue,
};

/// Schema version stamped into every export.
pub const TOKEN_KERNEL_SCHEMA_VERSION: &str = "1.0.0";

/// Version identifier of the default aggregation policy.
pub const DEFAULT_POLICY_VERSION: &str = "aggregation_policy_v1";
