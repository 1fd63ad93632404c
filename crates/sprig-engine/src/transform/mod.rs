//! 2D affine transforms and the per-frame transform stack.
//!
//! Every primitive draw resolves its placement through [`apply_transform`]
//! before emitting vertices and restores the stack with
//! [`apply_transform_after`] once the vertices are written.

mod matrix;
mod options;
mod stack;

pub use matrix::Transform;
pub use options::{apply_transform, apply_transform_after, Origin, TransformHook, TransformOptions};
pub use stack::{TransformError, TransformStack};
