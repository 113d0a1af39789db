//! Flat CSS custom properties in a single `:root` block.

use std::fmt::Write;

use super::{format_number, ExportError, ExportOptions, ResolvedSnapshot};
use crate::types::{ColorValue, TokenAttributes};

/// Render the variable sheet.
pub fn render(snapshot: &ResolvedSnapshot, options: &ExportOptions) -> Result<String, ExportError> {
    let mut out = String::new();
    writeln!(out, "/* design tokens: snapshot {} */", snapshot.snapshot_id)?;
    writeln!(out, ":root {{")?;
    for token in &snapshot.tokens {
        writeln!(
            out,
            "  {}: {};",
            property_name(&options.css_prefix, token.id.as_str()),
            css_value(&token.value)
        )?;
    }
    writeln!(out, "}}")?;
    Ok(out)
}

/// Custom property name for a token id.
pub fn property_name(prefix: &str, id: &str) -> String {
    if prefix.is_empty() {
        format!("--{id}")
    } else {
        format!("--{prefix}-{id}")
    }
}

/// CSS rendering of a value.
pub(crate) fn css_value(value: &TokenAttributes) -> String {
    match value {
        TokenAttributes::Color(color) => color_value(color),
        TokenAttributes::Spacing { px } | TokenAttributes::Radius { px } => px_value(*px),
        TokenAttributes::Shadow(shadow) => format!(
            "{} {} {} {} {}",
            px_value(shadow.offset_x),
            px_value(shadow.offset_y),
            px_value(shadow.blur),
            px_value(shadow.spread),
            color_value(&shadow.color)
        ),
        TokenAttributes::FontFamily { family } => css_string(family.trim()),
        TokenAttributes::Typography(t) => format!(
            "{} {}/{} {}",
            format_number(t.weight.round()),
            px_value(t.size),
            format_number(t.line_height),
            css_string(t.family.trim())
        ),
    }
}

/// Quote a value as a CSS string. Control characters become hex escapes
/// (`\A ` for a newline); the trailing space ends the escape.
pub(crate) fn css_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            c if c.is_control() => out.push_str(&format!("\\{:X} ", u32::from(c))),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn px_value(px: f64) -> String {
    format!("{}px", format_number(px))
}

fn color_value(color: &ColorValue) -> String {
    color.to_hex()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{render_with, ExportFormat};
    use crate::library::TokenLibrary;
    use crate::types::{CanonicalToken, Provenance, ShadowValue, TokenId, TypographyValue};

    #[test]
    fn test_values() {
        assert_eq!(css_value(&TokenAttributes::Spacing { px: 8.0 }), "8px");
        assert_eq!(css_value(&TokenAttributes::Color(ColorValue::from_srgb8(255, 0, 0))), "#ff0000");
        assert_eq!(
            css_value(&TokenAttributes::Typography(TypographyValue {
                family: "Inter".into(),
                size: 16.0,
                weight: 600.0,
                line_height: 1.5,
            })),
            "600 16px/1.5 \"Inter\""
        );
        assert_eq!(
            css_value(&TokenAttributes::Shadow(ShadowValue {
                offset_x: 0.0,
                offset_y: 2.0,
                blur: 4.0,
                spread: 0.0,
                color: ColorValue::from_srgb8(0, 0, 0),
            })),
            "0px 2px 4px 0px #000000"
        );
    }

    #[test]
    fn test_family_escapes() {
        assert_eq!(
            css_value(&TokenAttributes::FontFamily { family: "Display\nCondensed".into() }),
            "\"Display\\A Condensed\""
        );
        assert_eq!(css_string("Say \"hi\"\\"), "\"Say \\\"hi\\\"\\\\\"");
        assert_eq!(css_string("Tab\there"), "\"Tab\\9 here\"");
    }

    #[test]
    fn test_empty_sheet() {
        let out = render_with(&TokenLibrary::new(), ExportFormat::VariableSheet, &ExportOptions::default()).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains(":root {\n}\n"));
    }

    #[test]
    fn test_prefixed_properties() {
        let mut library = TokenLibrary::new();
        let mut provenance = Provenance::new();
        provenance.record("a", 0.5);
        library
            .insert_token(CanonicalToken::new(
                TokenId::new("spacing-0001").unwrap(),
                TokenAttributes::Spacing { px: 12.5 },
                provenance,
                0,
            ))
            .unwrap();
        let options = ExportOptions::default().with_css_prefix("dt");
        let out = String::from_utf8(render_with(&library, ExportFormat::VariableSheet, &options).unwrap()).unwrap();
        assert!(out.contains("  --dt-spacing-0001: 12.5px;\n"));
    }
}
