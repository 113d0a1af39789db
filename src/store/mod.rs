//! Token storage.
//!
//! The store is a plain in-memory map with a category index. Persisting a
//! library is the caller's job: every type here is `Serialize`, and the
//! library can be rebuilt from its tokens and edges.

pub mod memory;

pub use memory::TokenStore;
