//! TypeScript binding module.
//!
//! One `export const` per token with `as const`. Structural references are
//! identifier references to earlier declarations, so declarations follow
//! [`ResolvedSnapshot::dependency_order`]. When the references are cyclic
//! the module falls back to canonical order and names targets by id string.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;
use std::sync::OnceLock;

use regex_lite::Regex;

use super::{format_number, quote, ExportError, ResolvedSnapshot};
use crate::types::{TokenAttributes, TokenId};

/// Words that cannot name a binding in an ES module, which is strict mode
/// code. Sorted for binary search.
const RESERVED: &[&str] = &[
    "arguments", "await", "break", "case", "catch", "class", "const", "continue", "debugger",
    "default", "delete", "do", "else", "enum", "eval", "export", "extends", "false", "finally",
    "for", "function", "if", "implements", "import", "in", "instanceof", "interface", "let",
    "new", "null", "package", "private", "protected", "public", "return", "static", "super",
    "switch", "this", "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

/// Name of the exported map of every token.
const TOKENS_MAP: &str = "tokens";

fn separator() -> &'static Regex {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    SEPARATOR.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("separator pattern compiles"))
}

/// camelCase identifier for a token id.
pub fn identifier(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for (i, part) in separator().split(id).filter(|p| !p.is_empty()).enumerate() {
        if i == 0 {
            out.push_str(part);
        } else {
            let mut chars = part.chars();
            if let Some(first) = chars.next() {
                out.extend(first.to_uppercase());
                out.push_str(chars.as_str());
            }
        }
    }
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, 't');
    }
    if RESERVED.binary_search(&out.as_str()).is_ok() {
        out.push('_');
    }
    out
}

/// Unique identifiers for every token; collisions get a numeric suffix in
/// canonical order.
fn identifiers(snapshot: &ResolvedSnapshot) -> BTreeMap<&TokenId, String> {
    let mut used = BTreeSet::from([TOKENS_MAP.to_string()]);
    let mut names = BTreeMap::new();
    for token in &snapshot.tokens {
        let base = identifier(token.id.as_str());
        let mut name = base.clone();
        let mut n = 2;
        while !used.insert(name.clone()) {
            name = format!("{base}_{n}");
            n += 1;
        }
        names.insert(&token.id, name);
    }
    names
}

/// Render the module.
pub fn render(snapshot: &ResolvedSnapshot) -> Result<String, ExportError> {
    let names = identifiers(snapshot);
    let (order, linked) = match snapshot.dependency_order() {
        Some(order) => (order, true),
        None => {
            tracing::warn!(
                snapshot = %snapshot.snapshot_id,
                "structural references are cyclic, emitting references by id"
            );
            ((0..snapshot.tokens.len()).collect(), false)
        }
    };

    let mut out = String::new();
    writeln!(out, "// design tokens: snapshot {}", snapshot.snapshot_id)?;
    writeln!(out, "// schema {}, batch {}", snapshot.schema_version, snapshot.batch_id)?;

    for i in order {
        let token = &snapshot.tokens[i];
        let name = &names[&token.id];
        writeln!(out)?;
        writeln!(out, "export const {name} = {{")?;
        writeln!(out, "  id: {},", quote(token.id.as_str()))?;
        writeln!(out, "  category: {},", quote(token.category.as_str()))?;
        writeln!(out, "  value: {},", value(&token.value))?;
        if !token.references.is_empty() {
            let refs: Vec<String> = token
                .references
                .iter()
                .map(|r| match names.get(&r.target) {
                    Some(target) if linked => target.clone(),
                    _ => quote(r.target.as_str()),
                })
                .collect();
            writeln!(out, "  references: [{}],", refs.join(", "))?;
        }
        writeln!(out, "}} as const;")?;
    }

    writeln!(out)?;
    if snapshot.is_empty() {
        writeln!(out, "export type TokenName = never;")?;
        writeln!(out)?;
        writeln!(out, "export const {TOKENS_MAP} = {{}} as const;")?;
    } else {
        let union: Vec<String> = snapshot.tokens.iter().map(|t| quote(t.id.as_str())).collect();
        writeln!(out, "export type TokenName =")?;
        for member in &union {
            writeln!(out, "  | {member}")?;
        }
        out.truncate(out.trim_end().len());
        writeln!(out, ";")?;
        writeln!(out)?;
        writeln!(out, "export const {TOKENS_MAP} = {{")?;
        for token in &snapshot.tokens {
            writeln!(out, "  {}: {},", quote(token.id.as_str()), names[&token.id])?;
        }
        writeln!(out, "}} as const;")?;
    }
    Ok(out)
}

fn value(value: &TokenAttributes) -> String {
    match value {
        TokenAttributes::Color(color) => quote(&color.to_hex()),
        TokenAttributes::Spacing { px } | TokenAttributes::Radius { px } => format_number(*px),
        TokenAttributes::Shadow(s) => format!(
            "{{ offsetX: {}, offsetY: {}, blur: {}, spread: {}, color: {} }}",
            format_number(s.offset_x),
            format_number(s.offset_y),
            format_number(s.blur),
            format_number(s.spread),
            quote(&s.color.to_hex())
        ),
        TokenAttributes::FontFamily { family } => quote(family.trim()),
        TokenAttributes::Typography(t) => format!(
            "{{ fontFamily: {}, fontSize: {}, fontWeight: {}, lineHeight: {} }}",
            quote(t.family.trim()),
            format_number(t.size),
            format_number(t.weight.round()),
            format_number(t.line_height)
        ),
    }
}
