//! Error taxonomy for library operations.
//!
//! Every variant is a recoverable, typed result. The only fatal condition
//! is an internal invariant violation, which panics under `debug_assertions`
//! and surfaces as [`TokenError::InvariantViolation`] otherwise.

use crate::types::{EdgeKind, TokenId};

/// Error type for store, graph and library operations.
#[derive(Debug, Clone, PartialEq, serde::Serialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum TokenError {
    /// A raw candidate was rejected; the batch continued without it.
    #[error("Malformed candidate #{index} from {source_id}: {reason}")]
    MalformedCandidate {
        /// Position of the candidate in the input batch.
        index: usize,
        /// Source image id.
        source_id: String,
        /// Why it was rejected.
        reason: String,
    },
    /// Id does not name a token in this library.
    #[error("Unknown token: {0}")]
    UnknownToken(TokenId),
    /// The requested alias edge would close a cycle.
    #[error("Alias cycle detected: {from} -> {to}")]
    CycleDetected {
        /// Proposed edge source.
        from: TokenId,
        /// Proposed edge target.
        to: TokenId,
    },
    /// Deletion refused because edges still reference the token.
    #[error("Token {id} is referenced by {edge_count} edge(s)")]
    ReferencedToken {
        /// Token that was to be deleted.
        id: TokenId,
        /// Number of edges touching it.
        edge_count: usize,
    },
    /// Curation input outside the closed role set.
    #[error("Invalid role: {0}")]
    InvalidRole(String),
    /// The token already aliases another token.
    #[error("Token {from} already aliases {existing}")]
    AliasConflict {
        /// Token carrying the alias.
        from: TokenId,
        /// Current alias target.
        existing: TokenId,
    },
    /// An identical edge already exists.
    #[error("Edge already exists: {from} -[{kind}]-> {to}")]
    DuplicateEdge {
        /// Edge source.
        from: TokenId,
        /// Edge target.
        to: TokenId,
        /// Edge kind.
        kind: EdgeKind,
    },
    /// Id does not match the token id pattern.
    #[error("Invalid token id: {0:?}")]
    InvalidTokenId(String),
    /// Distance threshold is negative or non-finite.
    #[error("Invalid distance threshold: {0}")]
    InvalidThreshold(f64),
    /// An internal invariant was violated (a defect).
    #[error("Internal invariant violated: {0}")]
    InvariantViolation(String),
}

impl TokenError {
    /// Report an invariant violation: panic in debug builds, log and
    /// return an error in release builds.
    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        let message = message.into();
        debug_assert!(false, "invariant violation: {message}");
        tracing::error!(violation = %message, "INVARIANT_VIOLATION");
        Self::InvariantViolation(message)
    }
}
