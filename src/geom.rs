//! Stateless 2D geometry kernel
//!
//! Pure functions over `glam::DVec2`. Angles cross the public surface in
//! degrees (the section/rebar domain speaks degrees); radians stay internal.
//! Degenerate inputs (coincident points, parallel lines) come back as `None`
//! or a documented fallback - nothing in here panics or returns NaN.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::consts::GEOM_EPS;

/// Distance between two points
#[inline]
pub fn distance(p1: DVec2, p2: DVec2) -> f64 {
    p1.distance(p2)
}

/// Heading of p1 -> p2 in degrees, quadrant-corrected.
///
/// Uses asin of the normalized rise plus an x-sign check, so results land in
/// (-90, 270]. Coincident points yield 0.
pub fn angle_deg(p1: DVec2, p2: DVec2) -> f64 {
    let len = distance(p1, p2);
    if len == 0.0 {
        return 0.0;
    }
    let angle = ((p2.y - p1.y) / len).asin().to_degrees();
    if p2.x - p1.x < 0.0 { 180.0 - angle } else { angle }
}

/// Interior angle at vertex `p2` of the corner p1-p2-p3, in degrees [0, 180].
///
/// Undefined for zero-length rays; callers must guard. The dot ratio is
/// clamped so floating-point overshoot never produces NaN.
pub fn inner_angle(p1: DVec2, p2: DVec2, p3: DVec2) -> f64 {
    let d12 = distance(p1, p2);
    let d23 = distance(p3, p2);
    let dot = (p1 - p2).dot(p3 - p2);
    (dot / (d12 * d23)).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Chamfer a corner: the two points set back by `setback` along each edge
/// from the shared vertex `p2`. Returns `None` when either edge is degenerate.
pub fn chamfer(p1: DVec2, p2: DVec2, p3: DVec2, setback: f64) -> Option<(DVec2, DVec2)> {
    let d1 = distance(p1, p2);
    let d2 = distance(p3, p2);
    if d1 <= GEOM_EPS || d2 <= GEOM_EPS {
        return None;
    }
    let a = p2 + (p1 - p2) * (setback / d1);
    let b = p2 + (p3 - p2) * (setback / d2);
    Some((a, b))
}

/// A fillet arc replacing the corner p1-p2-p3
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Fillet {
    /// Arc center
    pub center: DVec2,
    pub radius: f64,
    /// Start angle in degrees; the arc sweeps counterclockwise to `end_angle_deg`
    pub start_angle_deg: f64,
    /// End angle in degrees, normalized so it exceeds the start by at most 180
    pub end_angle_deg: f64,
    /// Tangent point on edge p1-p2
    pub start: DVec2,
    /// Tangent point on edge p2-p3
    pub end: DVec2,
}

impl Fillet {
    /// Point on the arc at parameter t in [0, 1]
    pub fn point_at(&self, t: f64) -> DVec2 {
        let ang = self.start_angle_deg + (self.end_angle_deg - self.start_angle_deg) * t;
        self.center + crate::unit_from_deg(ang) * self.radius
    }
}

/// Fillet the corner p1-p2-p3 with the given radius.
///
/// Tangent length is `radius / tan(half interior angle)`; the center sits on
/// the corner bisector at `sqrt(tangent_len^2 + radius^2)` from the vertex.
/// Start/end angles are ordered with the turn direction so the swept arc is
/// counterclockwise-increasing and never exceeds 180 degrees.
///
/// Returns `None` for degenerate edges or a straight/reflex corner.
pub fn fillet(p1: DVec2, p2: DVec2, p3: DVec2, radius: f64) -> Option<Fillet> {
    let d1 = distance(p1, p2);
    let d2 = distance(p3, p2);
    if d1 <= GEOM_EPS || d2 <= GEOM_EPS {
        return None;
    }
    let half = inner_angle(p1, p2, p3) / 2.0;
    let tan_half = half.to_radians().tan();
    if tan_half.abs() <= GEOM_EPS {
        return None;
    }
    let tangent_len = radius / tan_half;

    let t1 = p2 + (p1 - p2) * (tangent_len / d1);
    let t2 = p2 + (p3 - p2) * (tangent_len / d2);

    // Chord midpoint lies on the bisector; push out to the center distance
    let mid = (t1 + t2) / 2.0;
    let diag = distance(p2, mid);
    if diag <= GEOM_EPS {
        return None;
    }
    let center = p2 + (mid - p2) * ((tangent_len * tangent_len + radius * radius).sqrt() / diag);

    // Left turn sweeps start->end from t1; right turn from t2
    let cross = (p2 - p1).perp_dot(p3 - p2);
    let (start_angle, mut end_angle, start, end) = if cross >= 0.0 {
        (angle_deg(center, t1), angle_deg(center, t2), t1, t2)
    } else {
        (angle_deg(center, t2), angle_deg(center, t1), t2, t1)
    };
    if end_angle <= start_angle {
        end_angle += 360.0;
    }

    Some(Fillet {
        center,
        radius,
        start_angle_deg: start_angle,
        end_angle_deg: end_angle,
        start,
        end,
    })
}

/// Parallel offset of the line p1-p2 by a signed perpendicular distance.
///
/// Point order is canonicalized first (vertical lines bottom-to-top, all
/// others left-to-right) so the result does not depend on input ordering.
/// Positive offsets displace to the left of the canonical travel direction:
/// `offset_line((0,0), (10,0), 5)` is the segment `(0,5)-(10,5)`.
pub fn offset_line(p1: DVec2, p2: DVec2, offset: f64) -> (DVec2, DVec2) {
    let (start, end, travel_deg) = if (p2.x - p1.x).abs() <= GEOM_EPS {
        // Vertical: heading is exactly 90, no asin precision loss
        let (s, e) = if p2.y <= p1.y { (p2, p1) } else { (p1, p2) };
        (s, e, 90.0)
    } else if (p2.y - p1.y).abs() <= GEOM_EPS {
        let (s, e) = if p2.x <= p1.x { (p2, p1) } else { (p1, p2) };
        (s, e, 0.0)
    } else {
        let (s, e) = if p2.x <= p1.x { (p2, p1) } else { (p1, p2) };
        (s, e, angle_deg(s, e))
    };

    let shift_deg = if offset >= 0.0 {
        travel_deg + 90.0
    } else {
        travel_deg - 90.0
    };
    let shift = crate::unit_from_deg(shift_deg) * offset.abs();
    (start + shift, end + shift)
}

/// Intersection of two infinite lines, each given by two points.
///
/// Determinant method; returns `None` when the lines are parallel (absolute
/// determinant below 1e-10).
pub fn line_intersect(p11: DVec2, p12: DVec2, p21: DVec2, p22: DVec2) -> Option<DVec2> {
    let d1 = p12 - p11;
    let d2 = p22 - p21;
    let denom = d2.y * d1.x - d2.x * d1.y;
    if denom.abs() <= GEOM_EPS {
        return None;
    }
    let t = (d2.x * (p11.y - p21.y) + d2.y * (p21.x - p11.x)) / denom;
    Some(p11 + d1 * t)
}

/// Rotate `p` about `pivot` by an angle in degrees. Zero is the identity.
pub fn rotate_point(p: DVec2, pivot: DVec2, angle_deg: f64) -> DVec2 {
    if angle_deg == 0.0 {
        return p;
    }
    let (sin, cos) = angle_deg.to_radians().sin_cos();
    let d = p - pivot;
    DVec2::new(d.x * cos - d.y * sin, d.x * sin + d.y * cos) + pivot
}

/// A ray-versus-segment hit
#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    pub point: DVec2,
    /// Distance from the ray origin (in units of `dir`'s length)
    pub dist: f64,
}

/// Cast a ray from `origin` along `dir` against the finite segment a-b.
///
/// `dir` is expected to be a unit vector so `dist` is a real distance.
/// Returns `None` for a parallel ray, a hit behind the origin, or a hit
/// outside the segment.
pub fn ray_hit(origin: DVec2, dir: DVec2, a: DVec2, b: DVec2) -> Option<RayHit> {
    let edge = b - a;
    let denom = dir.perp_dot(edge);
    if denom.abs() <= GEOM_EPS {
        return None;
    }
    let diff = a - origin;
    let t = diff.perp_dot(edge) / denom;
    let s = diff.perp_dot(dir) / denom;
    if t < 0.0 || !(0.0..=1.0).contains(&s) {
        return None;
    }
    Some(RayHit {
        point: origin + dir * t,
        dist: t,
    })
}

/// Perpendicular projection of `point` onto the infinite line through
/// `origin` with unit direction `dir`
#[inline]
pub fn project_onto_line(point: DVec2, origin: DVec2, dir: DVec2) -> DVec2 {
    origin + dir * (point - origin).dot(dir)
}
