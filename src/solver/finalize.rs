//! Shape finalization
//!
//! Runs once, after every segment has settled: adjacent segment lines are
//! intersected and their shared endpoints welded to the corner. Kinds with
//! free terminal legs then re-derive each open endpoint from the angle the
//! converged nodes actually achieved, re-extending from the welded corner at
//! the original nominal length - bar length is preserved exactly while the
//! terminal legs track whatever surface slope they settled against.

use crate::consts::DIR_EPS;
use crate::geom::line_intersect;

use super::state::RebarShape;

pub(crate) fn finalize(shape: &mut RebarShape) {
    // Weld every interior corner to the intersection of the two settled
    // lines. Parallel neighbors (degenerate input) keep their endpoints.
    for i in 0..shape.segments.len().saturating_sub(1) {
        let a = &shape.segments[i];
        let b = &shape.segments[i + 1];
        if let Some(corner) = line_intersect(a.p1, a.p2, b.p1, b.p2) {
            shape.segments[i].p2 = corner;
            shape.segments[i + 1].p1 = corner;
        }
    }

    if !shape.terminal_tracking || shape.segments.len() < 2 {
        return;
    }

    // Begin leg: corner end (p2) is welded, free end re-extends backwards
    // along the achieved node direction
    let first = &mut shape.segments[0];
    let spread = first.nodes[first.nodes.len() - 1].pos - first.nodes[0].pos;
    if spread.length() > DIR_EPS {
        let dir = spread.normalize();
        first.dir = dir;
        first.p1 = first.p2 - dir * first.initial_len;
    }

    // End leg: corner end (p1) is welded, free end re-extends forward
    let n = shape.segments.len();
    let last = &mut shape.segments[n - 1];
    let spread = last.nodes[last.nodes.len() - 1].pos - last.nodes[0].pos;
    if spread.length() > DIR_EPS {
        let dir = spread.normalize();
        last.dir = dir;
        last.p2 = last.p1 + dir * last.initial_len;
    }
}

#[cfg(test)]
mod tests {
    use glam::DVec2;

    use super::*;
    use crate::config::SolverConfig;
    use crate::solver::shapes::{ShapeKind, ShapeParams};
    use crate::solver::state::{Segment, SegmentState};

    fn settled(p1: DVec2, p2: DVec2, normal: DVec2) -> Segment {
        Segment::new(p1, p2, normal, SegmentState::Settled, &[0.4, 0.6])
    }

    #[test]
    fn test_corner_weld() {
        let params = ShapeParams::new(
            DVec2::ZERO,
            &[('A', 300.0), ('B', 400.0), ('C', 350.0)],
        );
        let mut shape = ShapeKind::OpenStirrup
            .build(&params, &SolverConfig::default())
            .unwrap();

        // Slide the bottom run down as if it settled 10 lower; the legs'
        // vertical lines still intersect it
        shape.segments[1].p1.y -= 10.0;
        shape.segments[1].p2.y -= 10.0;
        finalize(&mut shape);

        let bottom = &shape.segments[1];
        assert_eq!(shape.segments[0].p2, bottom.p1);
        assert_eq!(bottom.p2, shape.segments[2].p1);
        // Corners landed on the moved bottom line at the legs' x positions
        assert!((bottom.p1.y - (0.0 - 10.0)).abs() < 1e-9);
        assert!((bottom.p1.x - (-200.0)).abs() < 1e-9);
    }

    #[test]
    fn test_terminal_tracking_preserves_length_and_node_angle() {
        // Two settled segments: a sloped begin leg meeting a horizontal run
        let mut leg = settled(
            DVec2::new(-100.0, 100.0),
            DVec2::new(0.0, 0.0),
            DVec2::new(0.0, 1.0),
        );
        // Nodes converged against a 30-degree surface instead of the nominal 45
        let achieved = crate::unit_from_deg(-30.0);
        leg.nodes[0].pos = DVec2::new(-80.0, 0.0) - achieved * 10.0;
        leg.nodes[1].pos = DVec2::new(-80.0, 0.0) + achieved * 10.0;
        let nominal_len = leg.initial_len;

        let run = settled(
            DVec2::new(0.0, 0.0),
            DVec2::new(300.0, 0.0),
            DVec2::new(0.0, -1.0),
        );

        let cfg = SolverConfig::default();
        let params = ShapeParams::new(DVec2::ZERO, &[('A', 1000.0)]);
        let mut shape = ShapeKind::Straight.build(&params, &cfg).unwrap();
        shape.terminal_tracking = true;
        shape.segments = vec![leg, run];

        finalize(&mut shape);

        let leg = &shape.segments[0];
        // Free end re-derived: nominal length kept exactly...
        assert!((leg.p1.distance(leg.p2) - nominal_len).abs() < 1e-9);
        // ...along the achieved 30-degree node direction, anchored at the corner
        assert!((crate::geom::angle_deg(leg.p1, leg.p2) - (-30.0)).abs() < 1e-9);
        assert_eq!(leg.p2, shape.segments[1].p1);
    }
}
