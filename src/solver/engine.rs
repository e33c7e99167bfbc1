//! Convergence engine
//!
//! One call to [`tick`] advances a shape by one relaxation step: every
//! Fitting segment's nodes cast along the segment normal for the nearest
//! qualifying wall, accumulate velocity toward the cover-adjusted hit, and
//! integrate with damping. Segments settle strictly in order; once the last
//! one settles the shape is finalized, end-trimmed, and becomes Formed.
//!
//! A shape whose segments never find an opposing wall never settles. The
//! bounded [`solve`] driver caps the tick count and parks such shapes in the
//! Stalled state instead of spinning forever.

use glam::DVec2;

use crate::config::SolverConfig;
use crate::consts::{DIR_EPS, GEOM_EPS};
use crate::error::FitError;
use crate::geom::ray_hit;
use crate::section::{CoverTable, Wall};

use super::ends::apply_end_rules;
use super::finalize::finalize;
use super::state::{RebarShape, Segment, SegmentState, ShapeState};

/// A cover-adjusted wall hit found for one node
#[derive(Debug, Clone, Copy)]
pub struct Target {
    pub point: DVec2,
    pub wall: Wall,
}

/// Cast from `origin` along `cast` and return the nearest qualifying wall hit.
///
/// Walls whose normals do not oppose the cast direction (dot above
/// `opposite_threshold`) are discarded. Each remaining wall is shifted into
/// the section by its tag's cover before intersection, so the along-cast
/// offset is `cover / cos(incidence)` and the true perpendicular clearance to
/// the wall equals the cover at any incidence angle. Walls shorter than
/// `min_wall_span` are extended about their midpoint first.
pub fn gravity_target(
    origin: DVec2,
    cast: DVec2,
    walls: &[Wall],
    covers: &CoverTable,
    cfg: &SolverConfig,
) -> Option<Target> {
    let mut best: Option<(f64, Target)> = None;
    for wall in walls {
        if wall.normal.dot(cast) > cfg.opposite_threshold {
            continue;
        }
        let (mut a, mut b) = wall.covered(covers.get(wall.tag));
        let len = a.distance(b);
        if len > GEOM_EPS && len < cfg.min_wall_span {
            let mid = (a + b) / 2.0;
            let u = (b - a) / len;
            a = mid - u * (cfg.min_wall_span / 2.0);
            b = mid + u * (cfg.min_wall_span / 2.0);
        }
        if let Some(hit) = ray_hit(origin, cast, a, b) {
            if best.map_or(true, |(d, _)| hit.dist < d) {
                best = Some((
                    hit.dist,
                    Target {
                        point: hit.point,
                        wall: *wall,
                    },
                ));
            }
        }
    }
    best.map(|(_, t)| t)
}

/// Advance a shape by one relaxation tick. Formed and Stalled shapes are
/// untouched.
pub fn tick(shape: &mut RebarShape, walls: &[Wall], covers: &CoverTable, cfg: &SolverConfig) {
    if shape.state.is_terminal() {
        return;
    }

    let mut debug_points = Vec::new();
    let mut all_settled = true;

    for idx in 0..shape.segments.len() {
        let prev_settled = idx == 0 || shape.segments[idx - 1].state == SegmentState::Settled;
        let seg = &mut shape.segments[idx];

        if seg.state == SegmentState::Waiting {
            all_settled = false;
            if prev_settled {
                seg.state = SegmentState::Fitting;
            }
            // Unlocked segments begin seeking on the next tick
            continue;
        }

        if seg.state != SegmentState::Fitting {
            continue;
        }
        all_settled = false;

        let mut energy = 0.0;
        let mut max_pos_error: f64 = 0.0;
        let mut valid_targets = 0;

        for node in &mut seg.nodes {
            if let Some(target) = gravity_target(node.pos, seg.normal, walls, covers, cfg) {
                valid_targets += 1;
                debug_points.push(target.point);
                seg.contact_wall = Some(target.wall);

                let delta = target.point - node.pos;
                max_pos_error = max_pos_error.max(delta.length());
                node.vel += delta * cfg.gravity_gain;
            }
            node.vel *= cfg.damping;
            node.pos += node.vel;
            energy += node.vel.x.abs() + node.vel.y.abs();
        }

        if valid_targets == seg.nodes.len()
            && energy < cfg.converge_threshold
            && max_pos_error < cfg.settle_tolerance
        {
            seg.state = SegmentState::Settled;
            restore_segment_line(seg);
            log::debug!(
                "segment {idx} settled (energy {energy:.4}, max error {max_pos_error:.4})"
            );
        }
    }

    shape.debug_points = debug_points;

    if all_settled {
        finalize(shape);
        apply_end_rules(shape, walls, covers, cfg);
        shape.state = ShapeState::Formed;
        log::debug!("shape {} formed", shape.kind.name());
    }
}

/// Drive a shape until it forms, up to `max_ticks`. On exhaustion the shape is
/// parked in the Stalled terminal state and an error is returned. Returns the
/// number of ticks consumed on success.
pub fn solve(
    shape: &mut RebarShape,
    walls: &[Wall],
    covers: &CoverTable,
    cfg: &SolverConfig,
    max_ticks: u32,
) -> Result<u32, FitError> {
    for t in 0..max_ticks {
        tick(shape, walls, covers, cfg);
        if shape.state == ShapeState::Formed {
            return Ok(t + 1);
        }
    }
    shape.state = ShapeState::Stalled;
    log::warn!(
        "shape {} stalled after {max_ticks} ticks",
        shape.kind.name()
    );
    Err(FitError::Stalled { ticks: max_ticks })
}

/// Rebuild a settled segment's straight line from its node positions: center
/// on the node midpoint, keep the nominal length, and flip the derived
/// direction if it opposes the prior one (the node pair is 180-degree
/// ambiguous).
fn restore_segment_line(seg: &mut Segment) {
    let first = seg.nodes[0].pos;
    let last = seg.nodes[seg.nodes.len() - 1].pos;
    let mid = (first + last) / 2.0;

    let spread = last - first;
    let dist = spread.length();
    let mut dir = if dist > DIR_EPS {
        spread / dist
    } else {
        seg.dir
    };
    if dir.dot(seg.dir) < 0.0 {
        dir = -dir;
    }

    seg.dir = dir;
    let half = seg.initial_len / 2.0;
    seg.p1 = mid - dir * half;
    seg.p2 = mid + dir * half;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::CoverTag;
    use crate::solver::shapes::{ShapeKind, ShapeParams};

    /// Counterclockwise square section, interior (0,0)-(400,400)
    fn square_walls() -> Vec<Wall> {
        let n = [
            DVec2::new(0.0, 0.0),
            DVec2::new(400.0, 0.0),
            DVec2::new(400.0, 400.0),
            DVec2::new(0.0, 400.0),
        ];
        vec![
            Wall::from_edge(n[0], n[1], CoverTag::Outer).unwrap(),
            Wall::from_edge(n[1], n[2], CoverTag::Outer).unwrap(),
            Wall::from_edge(n[2], n[3], CoverTag::Top).unwrap(),
            Wall::from_edge(n[3], n[0], CoverTag::Outer).unwrap(),
        ]
    }

    #[test]
    fn test_gravity_target_perpendicular_cover() {
        let walls = square_walls();
        let covers = CoverTable::uniform(50.0);
        let cfg = SolverConfig::default();

        // Straight-down cast from mid-section onto the bottom wall
        let target = gravity_target(
            DVec2::new(200.0, 200.0),
            DVec2::new(0.0, -1.0),
            &walls,
            &covers,
            &cfg,
        )
        .unwrap();
        // Perpendicular distance from the target to the uncovered wall line
        // is exactly the cover
        assert!((target.point.y - 50.0).abs() < 1e-9);
        assert!((target.point.x - 200.0).abs() < 1e-9);
        assert_eq!(target.wall.tag, CoverTag::Outer);
    }

    #[test]
    fn test_gravity_target_oblique_pullback() {
        let walls = square_walls();
        let covers = CoverTable::uniform(50.0);
        let cfg = SolverConfig::default();

        // Tilt the bottom cast 20 degrees off vertical; the gate still admits
        // the bottom wall (dot = -cos 20 = -0.94 < -0.9)
        let cast = crate::unit_from_deg(-90.0 + 20.0);
        let target =
            gravity_target(DVec2::new(200.0, 200.0), cast, &walls, &covers, &cfg).unwrap();
        // The hit sits on the shifted line, so its perpendicular clearance to
        // the real wall equals the cover regardless of incidence
        assert!((target.point.y - 50.0).abs() < 1e-9);
        // But the along-cast pull-back exceeds the cover: cover / cos(20)
        let along = 150.0 / 20.0_f64.to_radians().cos();
        let dist = DVec2::new(200.0, 200.0).distance(target.point);
        assert!((dist - along).abs() < 1e-9);
    }

    #[test]
    fn test_gravity_target_opposition_gate() {
        let walls = square_walls();
        let covers = CoverTable::uniform(50.0);
        let cfg = SolverConfig::default();

        // Casting down must never target the top wall even though the ray's
        // backward extension would reach it; and casting 45 degrees off
        // rejects every wall (no dot below -0.9)
        let cast = crate::unit_from_deg(-45.0);
        assert!(gravity_target(DVec2::new(200.0, 200.0), cast, &walls, &covers, &cfg).is_none());
    }

    #[test]
    fn test_short_wall_extension_makes_narrow_faces_hittable() {
        // A 100-long ledge far to the side of the cast origin
        let ledge = Wall::from_edge(
            DVec2::new(300.0, 0.0),
            DVec2::new(400.0, 0.0),
            CoverTag::Outer,
        )
        .unwrap();
        let covers = CoverTable::uniform(10.0);
        let cfg = SolverConfig::default();

        // Origin is left of the ledge span; only the min_wall_span extension
        // (to 500 about the midpoint at x=350) brings it under the ray
        let target = gravity_target(
            DVec2::new(150.0, 100.0),
            DVec2::new(0.0, -1.0),
            &[ledge],
            &covers,
            &cfg,
        )
        .unwrap();
        assert!((target.point.y - 10.0).abs() < 1e-9);

        let mut tight = cfg.clone();
        tight.min_wall_span = 0.0;
        assert!(
            gravity_target(
                DVec2::new(150.0, 100.0),
                DVec2::new(0.0, -1.0),
                &[ledge],
                &covers,
                &tight,
            )
            .is_none()
        );
    }

    #[test]
    fn test_straight_bar_settles_at_cover() {
        let walls = square_walls();
        let covers = CoverTable::uniform(50.0);
        let cfg = SolverConfig::default();

        let params = ShapeParams::new(DVec2::new(200.0, 200.0), &[('A', 300.0)]);
        let mut shape = ShapeKind::Straight.build(&params, &cfg).unwrap();
        solve(&mut shape, &walls, &covers, &cfg, 500).unwrap();

        assert_eq!(shape.state, ShapeState::Formed);
        let seg = &shape.segments[0];
        // Settled perpendicular distance from the bottom wall equals the cover
        assert!((seg.p1.y - 50.0).abs() < cfg.settle_tolerance);
        assert!((seg.p2.y - 50.0).abs() < cfg.settle_tolerance);
        // Nominal length is preserved exactly by the line restore
        assert!((seg.p1.distance(seg.p2) - 300.0).abs() < 1e-9);
        // The bottom wall was recorded for end fitting
        assert_eq!(seg.contact_wall.unwrap().tag, CoverTag::Outer);
    }

    #[test]
    fn test_segments_settle_strictly_in_order() {
        let walls = square_walls();
        let covers = CoverTable::uniform(40.0);
        let cfg = SolverConfig::default();

        let params = ShapeParams::new(
            DVec2::new(200.0, 60.0),
            &[('A', 200.0), ('B', 320.0), ('C', 200.0)],
        );
        let mut shape = ShapeKind::OpenStirrup.build(&params, &cfg).unwrap();

        for _ in 0..2000 {
            tick(&mut shape, &walls, &covers, &cfg);
            // A later segment may leave Waiting only after its predecessor
            // has settled
            for i in 1..shape.segments.len() {
                if shape.segments[i].state != SegmentState::Waiting {
                    assert_eq!(shape.segments[i - 1].state, SegmentState::Settled);
                }
            }
            if shape.state == ShapeState::Formed {
                break;
            }
        }
        assert_eq!(shape.state, ShapeState::Formed);
    }

    #[test]
    fn test_stirrup_snaps_to_section_corners() {
        let walls = square_walls();
        let covers = CoverTable::uniform(40.0);
        let cfg = SolverConfig::default();

        // Leg dims consistent with the covered section: width 320 = 400 - 2*40
        let params = ShapeParams::new(
            DVec2::new(200.0, 60.0),
            &[('A', 200.0), ('B', 320.0), ('C', 200.0)],
        );
        let mut shape = ShapeKind::OpenStirrup.build(&params, &cfg).unwrap();
        solve(&mut shape, &walls, &covers, &cfg, 2000).unwrap();

        let tol = 2.0 * cfg.settle_tolerance;
        // Bottom run rests on the bottom cover line, corners meet the side
        // cover lines
        let bottom = &shape.segments[1];
        assert!((bottom.p1.y - 40.0).abs() < tol);
        assert!((bottom.p1.x - 40.0).abs() < tol);
        assert!((bottom.p2.x - 360.0).abs() < tol);
        // Corner snap welds adjacent endpoints together exactly
        assert_eq!(shape.segments[0].p2, bottom.p1);
        assert_eq!(bottom.p2, shape.segments[2].p1);
    }

    #[test]
    fn test_end_rules_applied_on_forming() {
        use crate::solver::state::EndRule;

        let walls = square_walls();
        let covers = CoverTable::uniform(40.0);
        let cfg = SolverConfig::default();

        let mut params = ShapeParams::new(DVec2::new(200.0, 100.0), &[('A', 300.0)]);
        params.begin_rule = Some(EndRule::parse("RAY", 25.0).unwrap());
        params.end_rule = Some(EndRule::parse("FIT", 10.0).unwrap());
        let mut shape = ShapeKind::Straight.build(&params, &cfg).unwrap();
        solve(&mut shape, &walls, &covers, &cfg, 500).unwrap();

        let seg = &shape.segments[0];
        // RAY: covered left face at x = 40, then 25 beyond the hit
        assert!((seg.p1.x - 15.0).abs() < 1e-6);
        // FIT: far covered endpoint of the bottom wall projects to x = 400,
        // then 10 beyond
        assert!((seg.p2.x - 410.0).abs() < 1e-6);
        // Bar still rests at the bottom cover
        assert!((seg.p1.y - 40.0).abs() < 1.5);
        assert!((seg.p1.y - seg.p2.y).abs() < 1e-9);
        // Nominal length rewritten from the trimmed extremities: the base
        // span (360) grew by exactly the two configured offsets
        assert!((seg.initial_len - 395.0).abs() < 1e-6);
    }

    #[test]
    fn test_formed_tick_is_idempotent() {
        let walls = square_walls();
        let covers = CoverTable::uniform(50.0);
        let cfg = SolverConfig::default();

        let params = ShapeParams::new(DVec2::new(200.0, 200.0), &[('A', 300.0)]);
        let mut shape = ShapeKind::Straight.build(&params, &cfg).unwrap();
        solve(&mut shape, &walls, &covers, &cfg, 500).unwrap();

        let frozen = shape.polyline();
        for _ in 0..10 {
            tick(&mut shape, &walls, &covers, &cfg);
        }
        assert_eq!(shape.polyline(), frozen);
        assert_eq!(shape.state, ShapeState::Formed);
    }

    #[test]
    fn test_no_opposing_wall_stalls() {
        // Only a top wall; a downward-casting bar never finds a target
        let top = Wall::from_edge(
            DVec2::new(400.0, 400.0),
            DVec2::new(0.0, 400.0),
            CoverTag::Top,
        )
        .unwrap();
        let covers = CoverTable::uniform(50.0);
        let cfg = SolverConfig::default();

        let params = ShapeParams::new(DVec2::new(200.0, 200.0), &[('A', 300.0)]);
        let mut shape = ShapeKind::Straight.build(&params, &cfg).unwrap();

        let err = solve(&mut shape, &[top], &covers, &cfg, 200).unwrap_err();
        assert_eq!(err, FitError::Stalled { ticks: 200 });
        assert_eq!(shape.state, ShapeState::Stalled);

        // Stalled is terminal: further ticking changes nothing
        let frozen = shape.clone();
        tick(&mut shape, &[top], &covers, &cfg);
        assert_eq!(shape.polyline(), frozen.polyline());
    }

    #[test]
    fn test_debug_points_rebuilt_each_tick() {
        let walls = square_walls();
        let covers = CoverTable::uniform(50.0);
        let cfg = SolverConfig::default();

        let params = ShapeParams::new(DVec2::new(200.0, 200.0), &[('A', 300.0)]);
        let mut shape = ShapeKind::Straight.build(&params, &cfg).unwrap();

        tick(&mut shape, &walls, &covers, &cfg);
        // One target per node
        assert_eq!(shape.debug_points.len(), cfg.node_ratios.len());
        solve(&mut shape, &walls, &covers, &cfg, 500).unwrap();
        tick(&mut shape, &walls, &covers, &cfg);
        // Terminal shapes stop reporting
        assert_eq!(shape.debug_points.len(), 0);
    }

    #[test]
    fn test_solved_shape_round_trips_through_serde() {
        let walls = square_walls();
        let covers = CoverTable::uniform(50.0);
        let cfg = SolverConfig::default();

        let params = ShapeParams::new(DVec2::new(200.0, 200.0), &[('A', 300.0)]);
        let mut shape = ShapeKind::Straight.build(&params, &cfg).unwrap();
        solve(&mut shape, &walls, &covers, &cfg, 500).unwrap();

        let json = serde_json::to_string(&shape).unwrap();
        let back: RebarShape = serde_json::from_str(&json).unwrap();
        assert_eq!(back.state, ShapeState::Formed);
        assert_eq!(back.polyline(), shape.polyline());
    }
}
