//! Collision primitives
//!
//! - `Aabb`: offset-aware box with inclusive bounds, used everywhere
//! - `geom`: segment/circle tests for the few places that need more than boxes

pub mod aabb;
pub mod geom;

pub use aabb::Aabb;
pub use geom::{Segment, segment_intersects_rect, circle_intersects_rect, circles_overlap};
