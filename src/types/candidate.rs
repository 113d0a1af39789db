//! Raw token candidates produced by the extraction collaborator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::attributes::TokenAttributes;
use super::token::Category;

/// An unverified, per-source observation of a possible token value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCandidate {
    /// Observed value; the variant fixes the category.
    pub attributes: TokenAttributes,
    /// Extractor confidence in [0, 1].
    pub confidence: f64,
    /// Id of the source image.
    pub source_id: String,
    /// When the source was observed, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_at: Option<DateTime<Utc>>,
}

impl RawCandidate {
    /// Create a new candidate.
    pub fn new(attributes: TokenAttributes, confidence: f64, source_id: impl Into<String>) -> Self {
        Self {
            attributes,
            confidence,
            source_id: source_id.into(),
            observed_at: None,
        }
    }

    /// Set the observation time.
    pub fn observed_at(mut self, at: DateTime<Utc>) -> Self {
        self.observed_at = Some(at);
        self
    }

    /// Category of this candidate.
    pub fn category(&self) -> Category {
        self.attributes.category()
    }

    /// Check the candidate is well formed.
    ///
    /// Returns a human-readable reason on failure.
    pub fn validate(&self) -> Result<(), String> {
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(format!("confidence {} outside [0, 1]", self.confidence));
        }
        if self.source_id.trim().is_empty() {
            return Err("source id is empty".to_string());
        }
        self.attributes.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ColorValue;

    #[test]
    fn test_validate_confidence_range() {
        let attrs = TokenAttributes::Spacing { px: 4.0 };
        assert!(RawCandidate::new(attrs.clone(), 0.0, "img").validate().is_ok());
        assert!(RawCandidate::new(attrs.clone(), 1.0, "img").validate().is_ok());
        assert!(RawCandidate::new(attrs.clone(), 1.01, "img").validate().is_err());
        assert!(RawCandidate::new(attrs.clone(), f64::NAN, "img").validate().is_err());
        assert!(RawCandidate::new(attrs, 0.5, " ").validate().is_err());
    }

    #[test]
    fn test_deserialize_feed_entry() {
        let json = r#"{
            "attributes": {"category": "color", "l": 53.2, "a": 80.1, "b": 67.2},
            "confidence": 0.75,
            "source_id": "hero.png"
        }"#;
        let candidate: RawCandidate = serde_json::from_str(json).unwrap();
        assert_eq!(candidate.category(), Category::Color);
        assert_eq!(candidate.observed_at, None);
        assert_eq!(
            candidate.attributes,
            TokenAttributes::Color(ColorValue::lab(53.2, 80.1, 67.2))
        );
    }
}
