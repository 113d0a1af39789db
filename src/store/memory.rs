//! In-memory token store.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::TokenError;
use crate::types::{CanonicalToken, Category, Role, TokenId};

/// In-memory token store.
///
/// Uses BTreeMap/BTreeSet for deterministic iteration order.
#[derive(Debug, Clone, Default)]
pub struct TokenStore {
    /// Tokens by ID.
    tokens: BTreeMap<TokenId, CanonicalToken>,
    /// Category -> token IDs.
    by_category: BTreeMap<Category, BTreeSet<TokenId>>,
}

impl TokenStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a token to the store.
    ///
    /// A duplicate id is an internal invariant violation.
    pub fn insert(&mut self, token: CanonicalToken) -> Result<(), TokenError> {
        if self.tokens.contains_key(&token.id) {
            return Err(TokenError::invariant(format!("duplicate token id {}", token.id)));
        }
        self.by_category
            .entry(token.category())
            .or_default()
            .insert(token.id.clone());
        self.tokens.insert(token.id.clone(), token);
        Ok(())
    }

    /// Fetch a token by ID.
    pub fn get(&self, id: &TokenId) -> Option<&CanonicalToken> {
        self.tokens.get(id)
    }

    /// Whether the store holds this ID.
    pub fn contains(&self, id: &TokenId) -> bool {
        self.tokens.contains_key(id)
    }

    /// Tokens of one category, ordered by ID.
    pub fn get_by_category(&self, category: Category) -> Vec<&CanonicalToken> {
        self.by_category
            .get(&category)
            .map(|ids| ids.iter().filter_map(|id| self.tokens.get(id)).collect())
            .unwrap_or_default()
    }

    /// Assign or clear a token's role.
    pub fn set_role(&mut self, id: &TokenId, role: Option<Role>) -> Result<(), TokenError> {
        let token = self
            .tokens
            .get_mut(id)
            .ok_or_else(|| TokenError::UnknownToken(id.clone()))?;
        token.role = role;
        Ok(())
    }

    /// All tokens in canonical order: category, then ID.
    pub fn all(&self) -> Vec<&CanonicalToken> {
        self.by_category
            .values()
            .flat_map(|ids| ids.iter().filter_map(|id| self.tokens.get(id)))
            .collect()
    }

    /// Remove a token. Graph integrity is the caller's concern.
    pub(crate) fn remove(&mut self, id: &TokenId) -> Result<CanonicalToken, TokenError> {
        let token = self
            .tokens
            .remove(id)
            .ok_or_else(|| TokenError::UnknownToken(id.clone()))?;
        let category = token.category();
        if let Some(ids) = self.by_category.get_mut(&category) {
            ids.remove(id);
            if ids.is_empty() {
                self.by_category.remove(&category);
            }
        }
        Ok(token)
    }

    /// Categories that hold at least one token, in canonical order.
    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.by_category.keys().copied()
    }

    /// Get number of tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Provenance, TokenAttributes};

    fn make_token(id: &str, attributes: TokenAttributes) -> CanonicalToken {
        let mut provenance = Provenance::new();
        provenance.record("img-1", 0.5);
        CanonicalToken::new(TokenId::new(id).unwrap(), attributes, provenance, 0)
    }

    fn spacing(id: &str, px: f64) -> CanonicalToken {
        make_token(id, TokenAttributes::Spacing { px })
    }

    fn family(id: &str) -> CanonicalToken {
        make_token(id, TokenAttributes::FontFamily { family: "Inter".into() })
    }

    #[test]
    fn test_insert_and_get() {
        let mut store = TokenStore::new();
        store.insert(spacing("spacing-0001", 4.0)).unwrap();

        let id = TokenId::new("spacing-0001").unwrap();
        let token = store.get(&id).unwrap();
        assert_eq!(token.attributes, TokenAttributes::Spacing { px: 4.0 });
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_by_category() {
        let mut store = TokenStore::new();
        store.insert(spacing("spacing-0002", 8.0)).unwrap();
        store.insert(family("font-family-0001")).unwrap();
        store.insert(spacing("spacing-0001", 4.0)).unwrap();

        let ids: Vec<_> = store
            .get_by_category(Category::Spacing)
            .iter()
            .map(|t| t.id.as_str().to_string())
            .collect();
        assert_eq!(ids, vec!["spacing-0001", "spacing-0002"]);
        assert!(store.get_by_category(Category::Color).is_empty());
    }

    #[test]
    fn test_all_is_category_then_id() {
        let mut store = TokenStore::new();
        store.insert(family("a-family")).unwrap();
        store.insert(spacing("z-spacing", 4.0)).unwrap();

        let ids: Vec<_> = store.all().iter().map(|t| t.id.as_str().to_string()).collect();
        // Spacing sorts before FontFamily despite the ids.
        assert_eq!(ids, vec!["z-spacing", "a-family"]);
    }

    #[test]
    fn test_set_role_unknown_id() {
        let mut store = TokenStore::new();
        let missing = TokenId::new("nope").unwrap();
        let err = store.set_role(&missing, Some(Role::Primary)).unwrap_err();
        assert_eq!(err, TokenError::UnknownToken(missing));
    }

    #[test]
    fn test_remove_cleans_category_index() {
        let mut store = TokenStore::new();
        store.insert(spacing("spacing-0001", 4.0)).unwrap();
        let id = TokenId::new("spacing-0001").unwrap();

        store.remove(&id).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.categories().count(), 0);
        assert!(store.remove(&id).is_err());
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn test_duplicate_insert_rejected_in_release() {
        let mut store = TokenStore::new();
        store.insert(spacing("spacing-0001", 4.0)).unwrap();
        let err = store.insert(spacing("spacing-0001", 8.0)).unwrap_err();
        assert!(matches!(err, TokenError::InvariantViolation(_)));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "duplicate token id")]
    fn test_duplicate_insert_panics_in_debug() {
        let mut store = TokenStore::new();
        store.insert(spacing("spacing-0001", 4.0)).unwrap();
        let _ = store.insert(spacing("spacing-0001", 8.0));
    }
}
