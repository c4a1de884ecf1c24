//! Small geometry tests used alongside the AABB primitive.
//!
//! Everything here is axis-aligned: rectangles are `macroquad::math::Rect`
//! (exclusive right/bottom, unlike [`super::Aabb`]).

use macroquad::math::{Rect, Vec2};

/// A line segment between two points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: Vec2,
    pub end: Vec2,
}

impl Segment {
    pub fn new(start: Vec2, end: Vec2) -> Self {
        Self { start, end }
    }
}

/// True if the two segments cross or touch.
pub fn segments_intersect(a: &Segment, b: &Segment) -> bool {
    let r = a.end - a.start;
    let s = b.end - b.start;
    let denom = r.perp_dot(s);
    let qp = b.start - a.start;

    if denom.abs() < f32::EPSILON {
        // Parallel: only intersect when collinear and overlapping
        if qp.perp_dot(r).abs() > f32::EPSILON {
            return false;
        }
        let rr = r.dot(r);
        if rr < f32::EPSILON {
            return (a.start - b.start).length_squared() < f32::EPSILON;
        }
        let t0 = qp.dot(r) / rr;
        let t1 = t0 + s.dot(r) / rr;
        let (lo, hi) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };
        return hi >= 0.0 && lo <= 1.0;
    }

    let t = qp.perp_dot(s) / denom;
    let u = qp.perp_dot(r) / denom;
    (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u)
}

/// True if the segment has an endpoint inside `rect` or crosses one of its edges.
pub fn segment_intersects_rect(seg: &Segment, rect: &Rect) -> bool {
    let contains = |p: Vec2| p.x >= rect.x && p.x <= rect.right() && p.y >= rect.y && p.y <= rect.bottom();
    if contains(seg.start) || contains(seg.end) {
        return true;
    }

    let tl = Vec2::new(rect.x, rect.y);
    let tr = Vec2::new(rect.right(), rect.y);
    let bl = Vec2::new(rect.x, rect.bottom());
    let br = Vec2::new(rect.right(), rect.bottom());

    [
        Segment::new(tl, tr),
        Segment::new(tr, br),
        Segment::new(br, bl),
        Segment::new(bl, tl),
    ]
    .iter()
    .any(|edge| segments_intersect(seg, edge))
}

/// Circle vs rectangle overlap (closest-point test).
pub fn circle_intersects_rect(center: Vec2, radius: f32, rect: &Rect) -> bool {
    if radius <= 0.0 {
        return false;
    }
    let closest = Vec2::new(
        center.x.clamp(rect.x, rect.right()),
        center.y.clamp(rect.y, rect.bottom()),
    );
    (center - closest).length_squared() <= radius * radius
}

/// Circle vs circle overlap. Touching counts.
pub fn circles_overlap(a: Vec2, ra: f32, b: Vec2, rb: f32) -> bool {
    let r = ra + rb;
    (a - b).length_squared() <= r * r
}
