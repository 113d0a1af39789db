//! Edge types for the token reference graph.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::token::TokenId;

/// Kind of reference between two tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// `from` stands in for `to`: its value is exactly `to`'s value.
    Alias,
    /// `from`'s value is derived from `to`.
    Dependency,
    /// `from` is assembled from `to` (e.g. a typographic style and its font family).
    Composition,
}

impl EdgeKind {
    /// Parse edge kind from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "alias" => Some(Self::Alias),
            "dependency" => Some(Self::Dependency),
            "composition" => Some(Self::Composition),
            _ => None,
        }
    }

    /// Whether this kind is a structural (Dependency/Composition) reference.
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Dependency | Self::Composition)
    }
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Alias => write!(f, "alias"),
            Self::Dependency => write!(f, "dependency"),
            Self::Composition => write!(f, "composition"),
        }
    }
}

/// Directed reference between two tokens.
///
/// Implements `Ord` for deterministic ordering: (from, to, kind).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// Referring token.
    pub from: TokenId,
    /// Referenced token.
    pub to: TokenId,
    /// Kind of reference.
    pub kind: EdgeKind,
    /// Free-form annotations (e.g. which slot of a composite this fills).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl Edge {
    /// Create a new edge without metadata.
    pub fn new(from: TokenId, to: TokenId, kind: EdgeKind) -> Self {
        Self {
            from,
            to,
            kind,
            metadata: BTreeMap::new(),
        }
    }

    /// Create an alias edge.
    pub fn alias(from: TokenId, to: TokenId) -> Self {
        Self::new(from, to, EdgeKind::Alias)
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

// Canonical ordering: from, then to, then kind
impl PartialOrd for Edge {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Edge {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.from
            .cmp(&other.from)
            .then_with(|| self.to.cmp(&other.to))
            .then_with(|| self.kind.cmp(&other.kind))
            .then_with(|| self.metadata.cmp(&other.metadata))
    }
}
