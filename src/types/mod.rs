//! Core types for the token kernel.

pub mod token;
pub mod attributes;
pub mod candidate;
pub mod edge;

pub use token::{TokenId, Category, Role, Provenance, CanonicalToken, combine_confidences};
pub use attributes::{TokenAttributes, ColorValue, ShadowValue, TypographyValue};
pub use candidate::RawCandidate;
pub use edge::{Edge, EdgeKind};
