//! Export adapters.
//!
//! Every format is a pure function of one [`ResolvedSnapshot`]:
//!
//! ```text
//! TokenLibrary ──▶ ResolvedSnapshot ──┬──▶ Interchange   (JSON, grouped by category)
//!                                     ├──▶ VariableSheet (CSS custom properties)
//!                                     ├──▶ TypedModule   (TypeScript consts)
//!                                     └──▶ Report        (Markdown)
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Tokens render in canonical order (category, then id)
//! - No timestamps or other ambient state reach the output
//! - Output is assembled in a buffer and only returned whole

pub mod css;
pub mod interchange;
pub mod report;
pub mod snapshot;
pub mod typescript;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::TokenError;
use crate::library::TokenLibrary;
use crate::policy::aggregation::DEFAULT_TOP_REPRESENTATIVES;

pub use snapshot::{ResolvedReference, ResolvedSnapshot, ResolvedToken};

/// Output format of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    /// Hierarchical JSON interchange document.
    Interchange,
    /// Flat CSS custom properties.
    VariableSheet,
    /// TypeScript module of typed constants.
    TypedModule,
    /// Human-readable Markdown report.
    Report,
}

impl ExportFormat {
    /// Every format, in declaration order.
    pub const ALL: [ExportFormat; 4] = [
        ExportFormat::Interchange,
        ExportFormat::VariableSheet,
        ExportFormat::TypedModule,
        ExportFormat::Report,
    ];

    /// Parse format from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "interchange" | "json" => Some(Self::Interchange),
            "variable_sheet" | "variable-sheet" | "css" => Some(Self::VariableSheet),
            "typed_module" | "typed-module" | "ts" | "typescript" => Some(Self::TypedModule),
            "report" | "md" | "markdown" => Some(Self::Report),
            _ => None,
        }
    }

    /// Canonical name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Interchange => "interchange",
            Self::VariableSheet => "variable_sheet",
            Self::TypedModule => "typed_module",
            Self::Report => "report",
        }
    }

    /// Conventional file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Interchange => "json",
            Self::VariableSheet => "css",
            Self::TypedModule => "ts",
            Self::Report => "md",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for export operations.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// JSON encoding failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// An alias could not be resolved while building the snapshot.
    #[error("Unresolvable alias: {0}")]
    UnresolvableAlias(#[from] TokenError),
    /// Text formatting failed.
    #[error("Format error: {0}")]
    Format(#[from] fmt::Error),
}

/// Adapter knobs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Prefix for CSS custom property names (`--{prefix}-{id}`); empty for none.
    #[serde(default)]
    pub css_prefix: String,
    /// Representatives per category listed in the report.
    #[serde(default = "default_top")]
    pub report_top_n: usize,
}

fn default_top() -> usize {
    DEFAULT_TOP_REPRESENTATIVES
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            css_prefix: String::new(),
            report_top_n: DEFAULT_TOP_REPRESENTATIVES,
        }
    }
}

impl ExportOptions {
    /// Set the CSS custom property prefix.
    pub fn with_css_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.css_prefix = prefix.into();
        self
    }

    /// Set how many representatives per category the report lists.
    pub fn with_report_top_n(mut self, n: usize) -> Self {
        self.report_top_n = n;
        self
    }
}

/// Render a library with default options.
pub fn render(library: &TokenLibrary, format: ExportFormat) -> Result<Vec<u8>, ExportError> {
    render_with(library, format, &ExportOptions::default())
}

/// Render a library.
pub fn render_with(
    library: &TokenLibrary,
    format: ExportFormat,
    options: &ExportOptions,
) -> Result<Vec<u8>, ExportError> {
    let snapshot = ResolvedSnapshot::build(library)?;
    let out = match format {
        ExportFormat::Interchange => interchange::render(&snapshot)?,
        ExportFormat::VariableSheet => css::render(&snapshot, options)?,
        ExportFormat::TypedModule => typescript::render(&snapshot)?,
        ExportFormat::Report => report::render(&snapshot, &library.stats(options.report_top_n))?,
    };
    tracing::debug!(
        format = %format,
        tokens = snapshot.tokens.len(),
        bytes = out.len(),
        snapshot = %snapshot.snapshot_id,
        "export rendered"
    );
    Ok(out.into_bytes())
}

/// Format a number with at most three decimals and no trailing zeros.
pub(crate) fn format_number(value: f64) -> String {
    let s = format!("{value:.3}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

/// Quote a value as a JavaScript string literal.
pub(crate) fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() || c == '\u{2028}' || c == '\u{2029}' => {
                out.push_str(&format!("\\u{{{:x}}}", u32::from(c)));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
