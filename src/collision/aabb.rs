//! Axis-Aligned Bounding Box
//!
//! An `Aabb` is anchored to a logical position plus an offset, so the
//! box's top-left corner does not have to match the entity's position
//! (entities are usually centered, boxes are not).
//!
//! `right` and `bottom` are inclusive: a 16px wide box starting at 0
//! covers pixels 0..=15. Tile tests rely on this.

use macroquad::math::Vec2;
use serde::{Serialize, Deserialize};

/// Axis-aligned rectangle with inclusive right/bottom bounds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Aabb {
    /// Top-left x (position.x - xoffset)
    pub x: f32,
    /// Top-left y (position.y - yoffset)
    pub y: f32,
    pub xoffset: f32,
    pub yoffset: f32,
    pub width: f32,
    pub height: f32,
    pub half_width: f32,
    pub half_height: f32,
    pub left: f32,
    pub top: f32,
    /// Inclusive: left + width - 1
    pub right: f32,
    /// Inclusive: top + height - 1
    pub bottom: f32,
}

impl Aabb {
    /// Create a box anchored at `position`, shifted back by `offset`.
    ///
    /// Right/bottom are clamped to zero on construction only, so an empty
    /// box at the origin does not report negative bounds.
    pub fn create(position: Vec2, offset: Vec2, width: f32, height: f32) -> Self {
        let x = position.x - offset.x;
        let y = position.y - offset.y;
        Self {
            x,
            y,
            xoffset: offset.x,
            yoffset: offset.y,
            width,
            height,
            half_width: width * 0.5,
            half_height: height * 0.5,
            left: x,
            top: y,
            right: (x + width - 1.0).max(0.0),
            bottom: (y + height - 1.0).max(0.0),
        }
    }

    /// Move the box to follow `position`. Width and height are untouched.
    pub fn update(&mut self, position: Vec2) {
        self.x = position.x - self.xoffset;
        self.y = position.y - self.yoffset;
        self.update_bounds();
    }

    /// Recompute the bounds from `x`/`y` only, ignoring the offsets.
    /// Use after setting `x`/`y` directly.
    pub fn update_bounds(&mut self) {
        self.left = self.x;
        self.top = self.y;
        self.right = self.left + self.width - 1.0;
        self.bottom = self.top + self.height - 1.0;
    }

    /// Widen the box to integer bounds: floor left/top, ceil right/bottom.
    ///
    /// Destructive. Only apply to a disposable copy (see [`Aabb::rounded`]).
    pub fn round_out(&mut self) {
        self.x = self.x.floor();
        self.y = self.y.floor();
        self.left = self.left.floor();
        self.top = self.top.floor();
        self.right = self.right.ceil();
        self.bottom = self.bottom.ceil();
        self.width = self.right - self.left + 1.0;
        self.height = self.bottom - self.top + 1.0;
        self.half_width = self.width * 0.5;
        self.half_height = self.height * 0.5;
    }

    /// Rounded-out copy, leaving `self` untouched.
    pub fn rounded(&self) -> Self {
        let mut copy = *self;
        copy.round_out();
        copy
    }

    /// Copy every field from another box.
    pub fn copy_from(&mut self, other: &Aabb) {
        *self = *other;
    }

    /// Inclusive point test.
    pub fn has_point(&self, p: Vec2) -> bool {
        !(p.x < self.x || p.y < self.y || p.x > self.right || p.y > self.bottom)
    }

    /// The four corners: top-left, top-right, bottom-left, bottom-right.
    pub fn points(&self) -> [Vec2; 4] {
        [
            Vec2::new(self.left, self.top),
            Vec2::new(self.right, self.top),
            Vec2::new(self.left, self.bottom),
            Vec2::new(self.right, self.bottom),
        ]
    }

    /// Separating-axis overlap test on the inclusive bounds.
    /// Touching edges count as a collision.
    pub fn is_collide(&self, other: &Aabb) -> bool {
        let to_left = self.right < other.left;
        let to_top = self.bottom < other.top;
        let to_right = self.left > other.right;
        let to_bottom = self.top > other.bottom;
        !(to_left || to_top || to_right || to_bottom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_applies_offset() {
        let a = Aabb::create(Vec2::new(20.0, 30.0), Vec2::new(4.0, 6.0), 8.0, 12.0);
        assert_eq!(a.x, 16.0);
        assert_eq!(a.y, 24.0);
        assert_eq!(a.right, 23.0);
        assert_eq!(a.bottom, 35.0);
        assert_eq!(a.half_width, 4.0);
    }

    #[test]
    fn test_create_clamps_empty_box() {
        let a = Aabb::create(Vec2::ZERO, Vec2::ZERO, 0.0, 0.0);
        assert_eq!(a.right, 0.0);
        assert_eq!(a.bottom, 0.0);
    }

    #[test]
    fn test_update_keeps_bounds_invariant() {
        let mut a = Aabb::create(Vec2::ZERO, Vec2::new(8.0, 8.0), 16.0, 16.0);
        for p in [Vec2::new(3.5, -2.25), Vec2::new(100.0, 40.0), Vec2::new(-7.0, 0.75)] {
            a.update(p);
            assert_eq!(a.left, a.x);
            assert_eq!(a.top, a.y);
            assert_eq!(a.right, a.left + a.width - 1.0);
            assert_eq!(a.bottom, a.top + a.height - 1.0);
            assert_eq!(a.width, 16.0);
        }
    }

    #[test]
    fn test_update_bounds_ignores_offset() {
        let mut a = Aabb::create(Vec2::ZERO, Vec2::new(8.0, 8.0), 4.0, 4.0);
        a.x = 10.0;
        a.y = 20.0;
        a.update_bounds();
        assert_eq!((a.left, a.top, a.right, a.bottom), (10.0, 20.0, 13.0, 23.0));
    }

    #[test]
    fn test_round_out() {
        let a = Aabb::create(Vec2::new(1.5, 2.25), Vec2::ZERO, 4.0, 4.0);
        let r = a.rounded();
        assert_eq!(r.left, 1.0);
        assert_eq!(r.top, 2.0);
        assert_eq!(r.right, 5.0);
        assert_eq!(r.bottom, 6.0);
        assert_eq!(r.width, 5.0);
        assert_eq!(r.height, 5.0);
        // receiver untouched
        assert_eq!(a.left, 1.5);
    }

    #[test]
    fn test_is_collide_symmetric() {
        let boxes = [
            Aabb::create(Vec2::new(0.0, 0.0), Vec2::ZERO, 16.0, 16.0),
            Aabb::create(Vec2::new(15.0, 15.0), Vec2::ZERO, 4.0, 4.0),
            Aabb::create(Vec2::new(16.0, 0.0), Vec2::ZERO, 4.0, 4.0),
            Aabb::create(Vec2::new(-3.5, 8.0), Vec2::ZERO, 4.0, 1.0),
            Aabb::create(Vec2::new(40.0, 40.0), Vec2::ZERO, 2.0, 2.0),
        ];
        for a in &boxes {
            for b in &boxes {
                assert_eq!(a.is_collide(b), b.is_collide(a));
            }
        }
    }

    #[test]
    fn test_is_collide_inclusive_edges() {
        let a = Aabb::create(Vec2::ZERO, Vec2::ZERO, 16.0, 16.0);
        let touching = Aabb::create(Vec2::new(15.0, 0.0), Vec2::ZERO, 4.0, 4.0);
        let apart = Aabb::create(Vec2::new(16.0, 0.0), Vec2::ZERO, 4.0, 4.0);
        assert!(a.is_collide(&touching));
        assert!(!a.is_collide(&apart));
    }

    #[test]
    fn test_has_point_inclusive() {
        let a = Aabb::create(Vec2::ZERO, Vec2::ZERO, 10.0, 10.0);
        assert!(a.has_point(Vec2::new(0.0, 0.0)));
        assert!(a.has_point(Vec2::new(9.0, 9.0)));
        assert!(!a.has_point(Vec2::new(9.5, 0.0)));
        assert!(!a.has_point(Vec2::new(-0.1, 5.0)));
    }
}
