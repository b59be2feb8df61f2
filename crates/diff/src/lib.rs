//! Structural diffing of JSON-like values.
//!
//! This crate holds the pure parts of the reconciliation diff: value
//! predicates, the subset elision transform, the structural diff tree
//! and the renderers that turn a tree into text. Nothing here performs I/O.

pub mod elide;
pub mod render;
pub mod tree;
pub mod value;
pub mod yaml;

pub use elide::elide;
pub use render::{AsciiRenderer, DiffRenderer, RenderError, UnifiedRenderer};
pub use tree::{Change, Delta, DiffTree, Op, PathSegment};
pub use value::{is_empty, values_equal};
