//! Common types shared across the SafeView crates.

pub mod error;
pub mod geometry;

pub use error::{SafeViewError, SafeViewResult};
pub use geometry::{Point, Rect, Size};
