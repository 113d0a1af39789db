//! Per-category perceptual distance and merge strategies.
//!
//! Each [`Category`] maps to exactly one [`CategoryStrategy`] through an
//! exhaustive `match`, so adding a category fails to compile until it has a
//! metric and a merge rule. The aggregator only ever talks to this table.
//!
//! ## Units
//!
//! Distances share one scale so that a single threshold is meaningful:
//!
//! | Category    | Distance                                                        |
//! |-------------|-----------------------------------------------------------------|
//! | Color       | CIEDE2000 ΔE, combined with `100·|Δalpha|`                      |
//! | Spacing     | percent difference relative to the larger magnitude             |
//! | Radius      | percent difference relative to the larger magnitude             |
//! | Shadow      | max of per-component percent differences and the color ΔE       |
//! | FontFamily  | 0 when names match ignoring case, otherwise [`DISJOINT`]        |
//! | Typography  | [`DISJOINT`] across families, else max of numeric percentages   |
//!
//! All metrics are symmetric and return 0 for identical values.

pub mod ciede2000;

use crate::types::{Category, ColorValue, ShadowValue, TokenAttributes, TypographyValue};

pub use ciede2000::delta_e_2000;

/// Distance reported for values that can never be the same token.
pub const DISJOINT: f64 = f64::MAX;

/// Weight of an alpha difference relative to one ΔE unit.
const ALPHA_SCALE: f64 = 100.0;

/// Distance function over two attributes of the same category.
pub type DistanceFn = fn(&TokenAttributes, &TokenAttributes) -> f64;

/// Merge function: `(representative, representative_weight, observation, observation_weight)`.
pub type MergeFn = fn(&TokenAttributes, f64, &TokenAttributes, f64) -> TokenAttributes;

/// Distance and merge rule for one category.
#[derive(Debug, Clone, Copy)]
pub struct CategoryStrategy {
    /// Category this strategy applies to.
    pub category: Category,
    /// Perceptual distance.
    pub distance: DistanceFn,
    /// Confidence-weighted merge.
    pub merge: MergeFn,
}

static COLOR: CategoryStrategy = CategoryStrategy {
    category: Category::Color,
    distance: color_distance,
    merge: color_merge,
};

static SPACING: CategoryStrategy = CategoryStrategy {
    category: Category::Spacing,
    distance: length_distance,
    merge: length_merge,
};

static RADIUS: CategoryStrategy = CategoryStrategy {
    category: Category::Radius,
    distance: length_distance,
    merge: length_merge,
};

static SHADOW: CategoryStrategy = CategoryStrategy {
    category: Category::Shadow,
    distance: shadow_distance,
    merge: shadow_merge,
};

static FONT_FAMILY: CategoryStrategy = CategoryStrategy {
    category: Category::FontFamily,
    distance: family_distance,
    merge: keep_representative,
};

static TYPOGRAPHY: CategoryStrategy = CategoryStrategy {
    category: Category::Typography,
    distance: typography_distance,
    merge: typography_merge,
};

/// Look up the strategy for a category.
pub fn strategy(category: Category) -> &'static CategoryStrategy {
    match category {
        Category::Color => &COLOR,
        Category::Spacing => &SPACING,
        Category::Radius => &RADIUS,
        Category::Shadow => &SHADOW,
        Category::FontFamily => &FONT_FAMILY,
        Category::Typography => &TYPOGRAPHY,
    }
}

/// Distance between two attributes.
///
/// # Panics
///
/// Panics if the attributes belong to different categories. Callers group
/// by category first; reaching this is a defect.
pub fn distance(x: &TokenAttributes, y: &TokenAttributes) -> f64 {
    assert_same_category(x, y);
    (strategy(x.category()).distance)(x, y)
}

/// Confidence-weighted merge of an observation into a representative.
///
/// When the combined weight is zero the representative is kept as is.
///
/// # Panics
///
/// Panics if the attributes belong to different categories.
pub fn merge(rep: &TokenAttributes, rep_weight: f64, obs: &TokenAttributes, obs_weight: f64) -> TokenAttributes {
    assert_same_category(rep, obs);
    if rep_weight + obs_weight <= 0.0 {
        return rep.clone();
    }
    (strategy(rep.category()).merge)(rep, rep_weight, obs, obs_weight)
}

fn assert_same_category(x: &TokenAttributes, y: &TokenAttributes) {
    if x.category() != y.category() {
        cross_category(x, y);
    }
}

#[cold]
fn cross_category(x: &TokenAttributes, y: &TokenAttributes) -> ! {
    panic!(
        "cross-category comparison: {} vs {}",
        x.category(),
        y.category()
    )
}

/// Percent difference of two magnitudes relative to the larger one.
pub fn relative_difference(x: f64, y: f64) -> f64 {
    let scale = x.abs().max(y.abs());
    if scale == 0.0 || x == y {
        0.0
    } else {
        100.0 * (x - y).abs() / scale
    }
}

fn weighted(x: f64, wx: f64, y: f64, wy: f64) -> f64 {
    (x * wx + y * wy) / (wx + wy)
}

fn color_delta(x: &ColorValue, y: &ColorValue) -> f64 {
    delta_e_2000(x, y).hypot(ALPHA_SCALE * (x.alpha - y.alpha))
}

fn color_blend(x: &ColorValue, wx: f64, y: &ColorValue, wy: f64) -> ColorValue {
    ColorValue {
        l: weighted(x.l, wx, y.l, wy),
        a: weighted(x.a, wx, y.a, wy),
        b: weighted(x.b, wx, y.b, wy),
        alpha: weighted(x.alpha, wx, y.alpha, wy),
    }
}

fn same_family(x: &str, y: &str) -> bool {
    x.trim().eq_ignore_ascii_case(y.trim())
}

fn color_distance(x: &TokenAttributes, y: &TokenAttributes) -> f64 {
    match (x, y) {
        (TokenAttributes::Color(a), TokenAttributes::Color(b)) => color_delta(a, b),
        _ => cross_category(x, y),
    }
}

fn color_merge(x: &TokenAttributes, wx: f64, y: &TokenAttributes, wy: f64) -> TokenAttributes {
    match (x, y) {
        (TokenAttributes::Color(a), TokenAttributes::Color(b)) => {
            TokenAttributes::Color(color_blend(a, wx, b, wy))
        }
        _ => cross_category(x, y),
    }
}

fn length_distance(x: &TokenAttributes, y: &TokenAttributes) -> f64 {
    match (x, y) {
        (TokenAttributes::Spacing { px: a }, TokenAttributes::Spacing { px: b })
        | (TokenAttributes::Radius { px: a }, TokenAttributes::Radius { px: b }) => {
            relative_difference(*a, *b)
        }
        _ => cross_category(x, y),
    }
}

fn length_merge(x: &TokenAttributes, wx: f64, y: &TokenAttributes, wy: f64) -> TokenAttributes {
    match (x, y) {
        (TokenAttributes::Spacing { px: a }, TokenAttributes::Spacing { px: b }) => {
            TokenAttributes::Spacing { px: weighted(*a, wx, *b, wy) }
        }
        (TokenAttributes::Radius { px: a }, TokenAttributes::Radius { px: b }) => {
            TokenAttributes::Radius { px: weighted(*a, wx, *b, wy) }
        }
        _ => cross_category(x, y),
    }
}

fn shadow_distance(x: &TokenAttributes, y: &TokenAttributes) -> f64 {
    match (x, y) {
        (TokenAttributes::Shadow(a), TokenAttributes::Shadow(b)) => [
            relative_difference(a.offset_x, b.offset_x),
            relative_difference(a.offset_y, b.offset_y),
            relative_difference(a.blur, b.blur),
            relative_difference(a.spread, b.spread),
            color_delta(&a.color, &b.color),
        ]
        .into_iter()
        .fold(0.0, f64::max),
        _ => cross_category(x, y),
    }
}

fn shadow_merge(x: &TokenAttributes, wx: f64, y: &TokenAttributes, wy: f64) -> TokenAttributes {
    match (x, y) {
        (TokenAttributes::Shadow(a), TokenAttributes::Shadow(b)) => TokenAttributes::Shadow(ShadowValue {
            offset_x: weighted(a.offset_x, wx, b.offset_x, wy),
            offset_y: weighted(a.offset_y, wx, b.offset_y, wy),
            blur: weighted(a.blur, wx, b.blur, wy),
            spread: weighted(a.spread, wx, b.spread, wy),
            color: color_blend(&a.color, wx, &b.color, wy),
        }),
        _ => cross_category(x, y),
    }
}

fn family_distance(x: &TokenAttributes, y: &TokenAttributes) -> f64 {
    match (x, y) {
        (TokenAttributes::FontFamily { family: a }, TokenAttributes::FontFamily { family: b }) => {
            if same_family(a, b) {
                0.0
            } else {
                DISJOINT
            }
        }
        _ => cross_category(x, y),
    }
}

fn keep_representative(x: &TokenAttributes, _wx: f64, _y: &TokenAttributes, _wy: f64) -> TokenAttributes {
    x.clone()
}

fn typography_distance(x: &TokenAttributes, y: &TokenAttributes) -> f64 {
    match (x, y) {
        (TokenAttributes::Typography(a), TokenAttributes::Typography(b)) => {
            if !same_family(&a.family, &b.family) {
                return DISJOINT;
            }
            [
                relative_difference(a.size, b.size),
                relative_difference(a.weight, b.weight),
                relative_difference(a.line_height, b.line_height),
            ]
            .into_iter()
            .fold(0.0, f64::max)
        }
        _ => cross_category(x, y),
    }
}

fn typography_merge(x: &TokenAttributes, wx: f64, y: &TokenAttributes, wy: f64) -> TokenAttributes {
    match (x, y) {
        (TokenAttributes::Typography(a), TokenAttributes::Typography(b)) => {
            TokenAttributes::Typography(TypographyValue {
                family: a.family.clone(),
                size: weighted(a.size, wx, b.size, wy),
                weight: weighted(a.weight, wx, b.weight, wy),
                line_height: weighted(a.line_height, wx, b.line_height, wy),
            })
        }
        _ => cross_category(x, y),
    }
}
