//! Browsable Markdown report.

use std::fmt::Write;

use super::css::css_value;
use super::{format_number, ExportError, ResolvedSnapshot};
use crate::library::stats::CONFIDENCE_BUCKETS;
use crate::library::LibraryStats;

/// Render the report.
pub fn render(snapshot: &ResolvedSnapshot, stats: &LibraryStats) -> Result<String, ExportError> {
    let mut out = String::new();
    writeln!(out, "# Design Token Report")?;
    writeln!(out)?;
    writeln!(out, "- Schema: `{}`", snapshot.schema_version)?;
    writeln!(out, "- Batch: `{}`", snapshot.batch_id)?;
    writeln!(out, "- Snapshot: `{}`", snapshot.snapshot_id)?;
    writeln!(out)?;

    writeln!(out, "## Summary")?;
    writeln!(out)?;
    writeln!(out, "| Metric | Value |")?;
    writeln!(out, "|---|---|")?;
    writeln!(out, "| Tokens | {} |", stats.token_count)?;
    writeln!(out, "| Edges | {} |", stats.edge_count)?;
    writeln!(out, "| Multi-source tokens | {} |", stats.multi_source_tokens)?;
    writeln!(out, "| Tokens with a role | {} |", stats.tokens_with_role)?;
    for (label, value) in [
        ("Min confidence", stats.confidence.min),
        ("Max confidence", stats.confidence.max),
        ("Mean confidence", stats.confidence.mean),
        ("Median confidence", stats.confidence.median),
    ] {
        writeln!(out, "| {label} | {} |", optional(value))?;
    }
    for (category, count) in &stats.counts_by_category {
        writeln!(out, "| {category} tokens | {count} |")?;
    }
    for (kind, count) in &stats.edges_by_kind {
        writeln!(out, "| {kind} edges | {count} |")?;
    }
    writeln!(out)?;

    if snapshot.is_empty() {
        writeln!(out, "_No tokens._")?;
        return Ok(out);
    }

    writeln!(out, "## Confidence Distribution")?;
    writeln!(out)?;
    writeln!(out, "| Range | Tokens |")?;
    writeln!(out, "|---|---|")?;
    for (i, count) in stats.confidence.buckets.iter().enumerate() {
        let lo = i as f64 / CONFIDENCE_BUCKETS as f64;
        let hi = (i + 1) as f64 / CONFIDENCE_BUCKETS as f64;
        let close = if i + 1 == CONFIDENCE_BUCKETS { ']' } else { ')' };
        writeln!(out, "| [{lo:.1}, {hi:.1}{close} | {count} |")?;
    }
    writeln!(out)?;

    for (category, tokens) in snapshot.by_category() {
        writeln!(out, "## {category}")?;
        writeln!(out)?;
        if let Some(top) = stats.top_representatives.get(&category) {
            let ids: Vec<String> = top.iter().map(|r| format!("`{}`", r.id)).collect();
            writeln!(out, "Top: {}", ids.join(", "))?;
            writeln!(out)?;
        }
        writeln!(out, "| Token | Value | Confidence | Sources | Role | References |")?;
        writeln!(out, "|---|---|---|---|---|---|")?;
        for token in tokens {
            let references: Vec<String> = token
                .references
                .iter()
                .map(|r| format!("{} `{}`", r.kind, r.target))
                .collect();
            writeln!(
                out,
                "| `{}` | `{}` | {} | {} | {} | {} |",
                token.id,
                css_value(&token.value).replace('|', "\\|"),
                format_number(token.confidence),
                token.sources.len(),
                token.role.map(|r| r.as_str()).unwrap_or("-"),
                if references.is_empty() { "-".to_string() } else { references.join(", ") },
            )?;
        }
        writeln!(out)?;
    }

    Ok(out)
}

fn optional(value: Option<f64>) -> String {
    value.map(format_number).unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use crate::export::{render, ExportFormat};
    use crate::library::TokenLibrary;
    use crate::types::{CanonicalToken, Edge, EdgeKind, Provenance, TokenAttributes, TokenId};

    fn report(library: &TokenLibrary) -> String {
        String::from_utf8(render(library, ExportFormat::Report).unwrap()).unwrap()
    }

    #[test]
    fn test_empty_report() {
        let out = report(&TokenLibrary::new());
        assert!(out.starts_with("# Design Token Report\n"));
        assert!(out.contains("| Tokens | 0 |"));
        assert!(out.contains("| Mean confidence | - |"));
        assert!(out.contains("_No tokens._"));
    }

    #[test]
    fn test_tables_and_relationships() {
        let mut library = TokenLibrary::new();
        for (name, px) in [("spacing-0001", 4.0), ("spacing-0002", 8.0)] {
            let mut provenance = Provenance::new();
            provenance.record("a", 0.5);
            library
                .insert_token(CanonicalToken::new(
                    TokenId::new(name).unwrap(),
                    TokenAttributes::Spacing { px },
                    provenance,
                    0,
                ))
                .unwrap();
        }
        library
            .insert_edge(Edge::new(
                TokenId::new("spacing-0002").unwrap(),
                TokenId::new("spacing-0001").unwrap(),
                EdgeKind::Dependency,
            ))
            .unwrap();

        let out = report(&library);
        assert!(out.contains("## spacing"));
        assert!(out.contains("| `spacing-0001` | `4px` | 0.5 | 1 | - | - |"));
        assert!(out.contains("| `spacing-0002` | `8px` | 0.5 | 1 | - | dependency `spacing-0001` |"));
        assert!(out.contains("| [0.5, 0.6) | 2 |"));
        assert!(out.contains("| dependency edges | 1 |"));
    }
}
