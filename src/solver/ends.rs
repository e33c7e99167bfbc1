//! End-condition resolution
//!
//! After finalization the bar's two extremities are trimmed by their
//! configured rules. FIT stretches the extremity along the wall the segment
//! settled against; RAY casts past the extremity at whatever stands in the
//! bar's way. Both share the offset convention: positive offsets lengthen
//! the bar past the resolved point, negative ones pull it short.

use glam::DVec2;

use crate::config::SolverConfig;
use crate::geom::{project_onto_line, ray_hit};
use crate::section::{CoverTable, Wall};

use super::state::{EndRule, EndRuleKind, RebarShape, Segment};

/// Which extremity of the bar a rule applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extremity {
    Begin,
    End,
}

pub(crate) fn apply_end_rules(
    shape: &mut RebarShape,
    walls: &[Wall],
    covers: &CoverTable,
    cfg: &SolverConfig,
) {
    if shape.segments.is_empty() {
        return;
    }
    if let Some(rule) = shape.begin_rule {
        apply_rule(&mut shape.segments[0], Extremity::Begin, rule, walls, covers, cfg);
    }
    if let Some(rule) = shape.end_rule {
        let n = shape.segments.len();
        apply_rule(&mut shape.segments[n - 1], Extremity::End, rule, walls, covers, cfg);
    }
}

fn apply_rule(
    seg: &mut Segment,
    side: Extremity,
    rule: EndRule,
    walls: &[Wall],
    covers: &CoverTable,
    cfg: &SolverConfig,
) {
    match rule.kind {
        EndRuleKind::Fit => apply_fit(seg, side, rule.offset, covers),
        EndRuleKind::Ray => apply_ray(seg, side, rule.offset, walls, covers, cfg),
    }
}

/// Stretch the extremity to the far end of the contacted wall.
///
/// Of the wall's two cover-adjusted endpoints, the one farther from the
/// *opposite* end of the segment is chosen - the far end of the wall relative
/// to the bar's anchored side, independent of the wall's stored point order.
/// That point is projected onto the segment's infinite line and the extremity
/// placed `offset` outward from the projection. A segment that never recorded
/// a contact wall is left unchanged.
fn apply_fit(seg: &mut Segment, side: Extremity, offset: f64, covers: &CoverTable) {
    let Some(wall) = seg.contact_wall else {
        log::debug!("FIT rule skipped: segment has no contact wall");
        return;
    };
    let (a, b) = wall.covered(covers.get(wall.tag));
    let opposite = match side {
        Extremity::Begin => seg.p2,
        Extremity::End => seg.p1,
    };
    let far = if a.distance_squared(opposite) >= b.distance_squared(opposite) {
        a
    } else {
        b
    };
    let projected = project_onto_line(far, seg.p1, seg.dir);
    match side {
        Extremity::Begin => seg.p1 = projected - seg.dir * offset,
        Extremity::End => seg.p2 = projected + seg.dir * offset,
    }
    seg.resync();
}

/// Cast past the extremity along the bar and stop `offset` beyond the nearest
/// covered wall.
///
/// The cast origin is advanced `ray_skip` past the extremity so the surface
/// the bar already rests on cannot produce a zero-distance hit. Walls are
/// cover-shifted exactly as in the gravity raycast, so oblique hits carry the
/// same pull-back. No hit leaves the extremity unchanged.
fn apply_ray(
    seg: &mut Segment,
    side: Extremity,
    offset: f64,
    walls: &[Wall],
    covers: &CoverTable,
    cfg: &SolverConfig,
) {
    let (extremity, cast) = match side {
        Extremity::Begin => (seg.p1, -seg.dir),
        Extremity::End => (seg.p2, seg.dir),
    };
    let origin = extremity + cast * cfg.ray_skip;

    let mut best: Option<(f64, DVec2)> = None;
    for wall in walls {
        let (a, b) = wall.covered(covers.get(wall.tag));
        if let Some(hit) = ray_hit(origin, cast, a, b) {
            if best.map_or(true, |(d, _)| hit.dist < d) {
                best = Some((hit.dist, hit.point));
            }
        }
    }
    let Some((_, point)) = best else {
        log::debug!("RAY rule found no wall past the extremity");
        return;
    };

    match side {
        Extremity::Begin => seg.p1 = point + cast * offset,
        Extremity::End => seg.p2 = point + cast * offset,
    }
    seg.resync();
}
