//! HTML post-processing: visual-element normalization and print composition.

mod compose;
mod normalize;

pub use compose::{compose, compose_preview, PRINT_STYLESHEET};
pub use normalize::{normalize, VisualKind, CAPTION_CLASS, KIND_ATTR, VISUAL_CLASS};
