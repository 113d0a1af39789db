//! Token identity, categories, roles and the canonical token record.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use super::attributes::TokenAttributes;
use crate::error::TokenError;

/// Pattern every token id must match.
const TOKEN_ID_PATTERN: &str = r"^[a-z0-9][a-z0-9_-]*$";

fn token_id_regex() -> &'static regex_lite::Regex {
    static RE: OnceLock<regex_lite::Regex> = OnceLock::new();
    RE.get_or_init(|| regex_lite::Regex::new(TOKEN_ID_PATTERN).expect("token id pattern compiles"))
}

/// Stable, addressable identifier of a canonical token.
///
/// Lowercase ASCII letters, digits, `_` and `-`, starting with a letter or
/// digit. Every id is a valid CSS custom-property suffix and a single
/// segment of an interchange reference path, where `.` separates segments.
/// Implements `Ord` for canonical ordering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TokenId(String);

impl TokenId {
    /// Create a token id, validating its shape.
    pub fn new(id: impl Into<String>) -> Result<Self, TokenError> {
        let id = id.into();
        if token_id_regex().is_match(&id) {
            Ok(Self(id))
        } else {
            Err(TokenError::InvalidTokenId(id))
        }
    }

    /// Id minted by the aggregator: `<category>-<NNNN>`.
    pub fn sequential(category: Category, n: usize) -> Self {
        Self(format!("{}-{:04}", category.as_str(), n))
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TokenId {
    type Error = TokenError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for TokenId {
    type Error = TokenError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TokenId> for String {
    fn from(id: TokenId) -> Self {
        id.0
    }
}

/// Token category.
///
/// Declaration order is the canonical export order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Colors.
    Color,
    /// Spacing increments.
    Spacing,
    /// Corner radii.
    Radius,
    /// Box shadows.
    Shadow,
    /// Font families.
    FontFamily,
    /// Composite typographic styles.
    Typography,
}

impl Category {
    /// All categories in canonical order.
    pub const ALL: [Category; 6] = [
        Self::Color,
        Self::Spacing,
        Self::Radius,
        Self::Shadow,
        Self::FontFamily,
        Self::Typography,
    ];

    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Color => "color",
            Self::Spacing => "spacing",
            Self::Radius => "radius",
            Self::Shadow => "shadow",
            Self::FontFamily => "font-family",
            Self::Typography => "typography",
        }
    }

    /// Parse category from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "color" => Some(Self::Color),
            "spacing" => Some(Self::Spacing),
            "radius" => Some(Self::Radius),
            "shadow" => Some(Self::Shadow),
            "font-family" | "font_family" | "fontfamily" => Some(Self::FontFamily),
            "typography" => Some(Self::Typography),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Curator-assigned semantic role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Main brand value.
    Primary,
    /// Supporting brand value.
    Secondary,
    /// Highlight value.
    Accent,
    /// Greys, backgrounds, borders.
    Neutral,
    /// Positive state.
    Success,
    /// Cautionary state.
    Warning,
    /// Destructive or error state.
    Danger,
    /// Informational state.
    Info,
}

impl Role {
    /// Parse a role, rejecting anything outside the closed set.
    pub fn parse(s: &str) -> Result<Self, TokenError> {
        match s.trim().to_lowercase().as_str() {
            "primary" => Ok(Self::Primary),
            "secondary" => Ok(Self::Secondary),
            "accent" => Ok(Self::Accent),
            "neutral" => Ok(Self::Neutral),
            "success" => Ok(Self::Success),
            "warning" => Ok(Self::Warning),
            "danger" => Ok(Self::Danger),
            "info" => Ok(Self::Info),
            _ => Err(TokenError::InvalidRole(s.to_string())),
        }
    }

    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
            Self::Accent => "accent",
            Self::Neutral => "neutral",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Danger => "danger",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-source record of contributed confidences.
///
/// Keyed by source id; each contribution is appended, never replaced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    entries: BTreeMap<String, Vec<f64>>,
}

impl Provenance {
    /// Create an empty provenance record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a contribution from a source.
    pub fn record(&mut self, source_id: impl Into<String>, confidence: f64) {
        self.entries.entry(source_id.into()).or_default().push(confidence);
    }

    /// Total number of contributions across all sources.
    pub fn entry_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Number of distinct sources.
    pub fn source_count(&self) -> usize {
        self.entries.len()
    }

    /// Contributions of one source.
    pub fn get(&self, source_id: &str) -> Option<&[f64]> {
        self.entries.get(source_id).map(Vec::as_slice)
    }

    /// Distinct source ids in order.
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Every contributed confidence, ordered by source then arrival.
    pub fn confidences(&self) -> impl Iterator<Item = f64> + '_ {
        self.entries.values().flat_map(|v| v.iter().copied())
    }

    /// Aggregate confidence: probabilistic OR of all contributions.
    pub fn aggregate_confidence(&self) -> f64 {
        combine_confidences(self.confidences())
    }
}

/// Combine independent confidences as `1 - prod(1 - c)`.
///
/// Multiplication is commutative, so the result does not depend on the
/// order of the inputs beyond float rounding.
pub fn combine_confidences(confidences: impl IntoIterator<Item = f64>) -> f64 {
    let miss: f64 = confidences
        .into_iter()
        .map(|c| 1.0 - c.clamp(0.0, 1.0))
        .product();
    (1.0 - miss).clamp(0.0, 1.0)
}

/// A deduplicated, authoritative token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalToken {
    /// Stable id.
    pub id: TokenId,
    /// Representative value.
    pub attributes: TokenAttributes,
    /// Aggregate confidence derived from provenance.
    pub confidence: f64,
    /// Source contributions.
    pub provenance: Provenance,
    /// Optional curator role.
    pub role: Option<Role>,
    /// Recency key: latest observation time, or the batch position when
    /// no timestamps were supplied.
    pub last_observed: i64,
}

impl CanonicalToken {
    /// Create a token from a representative value and provenance.
    ///
    /// Confidence is always derived from the provenance.
    pub fn new(id: TokenId, attributes: TokenAttributes, provenance: Provenance, last_observed: i64) -> Self {
        let confidence = provenance.aggregate_confidence();
        Self {
            id,
            attributes,
            confidence,
            provenance,
            role: None,
            last_observed,
        }
    }

    /// Category of this token.
    pub fn category(&self) -> Category {
        self.attributes.category()
    }

    /// Number of observations merged into this token.
    pub fn observation_count(&self) -> usize {
        self.provenance.entry_count()
    }

    /// Whether more than one source contributed.
    pub fn is_multi_source(&self) -> bool {
        self.provenance.source_count() > 1
    }
}
