//! Hierarchical JSON interchange document.
//!
//! Tokens are grouped by category. Each entry carries `$type`, `$value`,
//! `$description` and `$extensions`; structural references stay symbolic
//! as `{category.id}` strings under `$extensions.references`.

use serde_json::{json, Map, Value};

use super::{format_number, ExportError, ResolvedSnapshot, ResolvedToken};
use crate::types::{Category, ColorValue, TokenAttributes};

/// Render the interchange document.
pub fn render(snapshot: &ResolvedSnapshot) -> Result<String, ExportError> {
    let mut root = Map::new();
    root.insert(
        "$metadata".to_string(),
        json!({
            "schemaVersion": snapshot.schema_version,
            "batchId": snapshot.batch_id.to_string(),
            "snapshotId": snapshot.snapshot_id,
            "tokenCount": snapshot.tokens.len(),
        }),
    );

    for (category, tokens) in snapshot.by_category() {
        let group: Map<String, Value> = tokens
            .into_iter()
            .map(|token| (token.id.to_string(), entry(token)))
            .collect();
        root.insert(category.as_str().to_string(), Value::Object(group));
    }

    let mut out = serde_json::to_string_pretty(&Value::Object(root))?;
    out.push('\n');
    Ok(out)
}

/// `{category.id}` reference string.
pub fn reference(category: Category, id: &str) -> String {
    format!("{{{}.{}}}", category.as_str(), id)
}

fn entry(token: &ResolvedToken) -> Value {
    let references: Vec<Value> = token
        .references
        .iter()
        .map(|r| {
            let mut obj = json!({
                "kind": r.kind.to_string(),
                "token": reference(r.target_category, r.target.as_str()),
            });
            if !r.metadata.is_empty() {
                obj["metadata"] = json!(r.metadata);
            }
            obj
        })
        .collect();

    let mut extensions = json!({
        "confidence": token.confidence,
        "observations": token.observations,
        "sources": token.sources,
        "references": references,
    });
    if let Some(role) = token.role {
        extensions["role"] = json!(role.as_str());
    }

    json!({
        "$type": token_type(&token.value),
        "$value": token_value(&token.value),
        "$description": description(token),
        "$extensions": extensions,
    })
}

fn token_type(value: &TokenAttributes) -> &'static str {
    match value {
        TokenAttributes::Color(_) => "color",
        TokenAttributes::Spacing { .. } | TokenAttributes::Radius { .. } => "dimension",
        TokenAttributes::Shadow(_) => "shadow",
        TokenAttributes::FontFamily { .. } => "fontFamily",
        TokenAttributes::Typography(_) => "typography",
    }
}

fn token_value(value: &TokenAttributes) -> Value {
    match value {
        TokenAttributes::Color(color) => json!(color_hex(color)),
        TokenAttributes::Spacing { px } | TokenAttributes::Radius { px } => json!(dimension(*px)),
        TokenAttributes::Shadow(s) => json!({
            "color": color_hex(&s.color),
            "offsetX": dimension(s.offset_x),
            "offsetY": dimension(s.offset_y),
            "blur": dimension(s.blur),
            "spread": dimension(s.spread),
        }),
        TokenAttributes::FontFamily { family } => json!(family.trim()),
        TokenAttributes::Typography(t) => json!({
            "fontFamily": t.family.trim(),
            "fontSize": dimension(t.size),
            "fontWeight": t.weight.round() as i64,
            "lineHeight": format_number(t.line_height),
        }),
    }
}

fn description(token: &ResolvedToken) -> String {
    let sources = token.sources.len();
    let mut text = format!(
        "{} observed {} time{} across {} source{}",
        token.category,
        token.observations,
        if token.observations == 1 { "" } else { "s" },
        sources,
        if sources == 1 { "" } else { "s" },
    );
    if let Some(role) = token.role {
        text.push_str(&format!("; role: {role}"));
    }
    text
}

fn dimension(px: f64) -> String {
    format!("{}px", format_number(px))
}

fn color_hex(color: &ColorValue) -> String {
    color.to_hex()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{render, ExportFormat};
    use crate::library::TokenLibrary;
    use crate::types::{CanonicalToken, Edge, EdgeKind, Provenance, Role, TokenId};

    fn id(s: &str) -> TokenId {
        TokenId::new(s).unwrap()
    }

    fn parsed(library: &TokenLibrary) -> Value {
        serde_json::from_slice(&render(library, ExportFormat::Interchange).unwrap()).unwrap()
    }

    #[test]
    fn test_empty_document() {
        let doc = parsed(&TokenLibrary::new());
        let obj = doc.as_object().unwrap();
        assert_eq!(obj.len(), 1);
        assert_eq!(doc["$metadata"]["tokenCount"], 0);
        assert_eq!(doc["$metadata"]["schemaVersion"], crate::TOKEN_KERNEL_SCHEMA_VERSION);
    }

    #[test]
    fn test_grouping_and_references() {
        let mut library = TokenLibrary::new();
        let mut add = |name: &str, attributes: TokenAttributes| {
            let mut provenance = Provenance::new();
            provenance.record("a.png", 0.5);
            provenance.record("b.png", 0.5);
            library
                .insert_token(CanonicalToken::new(id(name), attributes, provenance, 0))
                .unwrap();
        };
        add("font-family-0001", TokenAttributes::FontFamily { family: "Inter".into() });
        add(
            "typography-0001",
            TokenAttributes::Typography(crate::types::TypographyValue {
                family: "Inter".into(),
                size: 14.0,
                weight: 400.0,
                line_height: 1.4,
            }),
        );
        library
            .insert_edge(Edge::new(id("typography-0001"), id("font-family-0001"), EdgeKind::Composition))
            .unwrap();
        library.set_role(&id("font-family-0001"), Role::Primary).unwrap();

        let doc = parsed(&library);
        let family = &doc["font-family"]["font-family-0001"];
        assert_eq!(family["$type"], "fontFamily");
        assert_eq!(family["$value"], "Inter");
        assert_eq!(family["$extensions"]["role"], "primary");
        assert_eq!(family["$extensions"]["sources"], json!(["a.png", "b.png"]));

        let style = &doc["typography"]["typography-0001"];
        assert_eq!(style["$value"]["fontSize"], "14px");
        assert_eq!(style["$extensions"]["references"][0]["token"], "{font-family.font-family-0001}");
        assert_eq!(style["$extensions"]["references"][0]["kind"], "composition");
    }
}
