//! Reference graph over canonical tokens.
//!
//! ```text
//!   typography-0001 ──composition──▶ font-family-0001
//!          │
//!          └────────composition──▶ color-0003 ◀──alias── brand-ink
//! ```
//!
//! Alias edges say "this token *is* that token"; Dependency and Composition
//! edges say "this token is built from those". Only the Alias subgraph is
//! required to be acyclic, and only aliases are resolved away on export.

pub mod reference;

pub use reference::ReferenceGraph;
