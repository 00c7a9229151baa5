//! Profile patch engine
//!
//! Profiles modify the raw configuration document with ordered add,
//! remove and replace operations before variables are resolved.

mod operation;
pub mod path;

pub use operation::{apply_patches, Op, Operation};
pub use path::transform_path;
