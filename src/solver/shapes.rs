//! Shape kinds and the generic polyline generator
//!
//! Every supported rebar shape is a declarative table: a start heading, a run
//! of legs (dimension key, relative turn, normal side), an anchor that lands
//! on the requested center, and whether the finalizer should let the terminal
//! legs track the surface angle they settled against. One builder walks any
//! table; there is no per-shape construction code.

use std::collections::HashMap;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::config::SolverConfig;
use crate::error::FitError;
use crate::geom::rotate_point;
use crate::{left_perp, unit_from_deg};

use super::state::{EndRule, RebarShape, Segment, SegmentState, ShapeState};

/// One leg of a shape table
#[derive(Debug, Clone, Copy)]
struct LegSpec {
    /// Key into the caller's dimension map
    dim: char,
    /// Turn relative to the previous leg (leg 0: relative to the start
    /// heading), degrees, counterclockwise positive
    turn_deg: f64,
    /// Which side of travel the outward normal sits on: +1 left, -1 right
    normal_sign: f64,
}

const fn leg(dim: char, turn_deg: f64, normal_sign: f64) -> LegSpec {
    LegSpec {
        dim,
        turn_deg,
        normal_sign,
    }
}

/// Reference point the generator drops onto the requested center
#[derive(Debug, Clone, Copy)]
enum Anchor {
    /// Midpoint of the given segment
    MidSegment(usize),
}

/// Declarative description of one shape kind
struct ShapeTable {
    name: &'static str,
    start_angle_deg: f64,
    legs: &'static [LegSpec],
    anchor: Anchor,
    terminal_tracking: bool,
}

/// The supported shape kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapeKind {
    /// A single straight bar (dimension A)
    Straight,
    /// U-stirrup open at the top: left leg down, bottom run, right leg up
    /// (dimensions A, B, C; industry code 21)
    OpenStirrup,
    /// Z-shaped slab tie with hooked terminal legs
    /// (dimensions A..E; industry code 44)
    ZTie,
}

impl ShapeKind {
    fn table(&self) -> ShapeTable {
        match self {
            ShapeKind::Straight => ShapeTable {
                name: "Straight",
                start_angle_deg: 0.0,
                legs: &const { [leg('A', 0.0, -1.0)] },
                anchor: Anchor::MidSegment(0),
                terminal_tracking: false,
            },
            ShapeKind::OpenStirrup => ShapeTable {
                name: "OpenStirrup",
                start_angle_deg: -90.0,
                legs: &const { [leg('A', 0.0, -1.0), leg('B', 90.0, -1.0), leg('C', 90.0, -1.0)] },
                anchor: Anchor::MidSegment(1),
                terminal_tracking: false,
            },
            ShapeKind::ZTie => ShapeTable {
                name: "ZTie",
                start_angle_deg: 0.0,
                legs: &const {
                    [
                        leg('A', 0.0, 1.0),
                        leg('B', -90.0, -1.0),
                        leg('C', 90.0, -1.0),
                        leg('D', 90.0, -1.0),
                        leg('E', -90.0, 1.0),
                    ]
                },
                anchor: Anchor::MidSegment(2),
                terminal_tracking: true,
            },
        }
    }

    pub fn name(&self) -> &'static str {
        self.table().name
    }

    /// Build a shape of this kind, ready for ticking.
    ///
    /// The first segment starts Fitting, the rest wait their turn; the shape
    /// comes back in the Converging state.
    pub fn build(self, params: &ShapeParams, cfg: &SolverConfig) -> Result<RebarShape, FitError> {
        let table = self.table();
        let mut shape = RebarShape {
            kind: self,
            center: params.center,
            rotation_deg: params.rotation_deg,
            segments: Vec::with_capacity(table.legs.len()),
            state: ShapeState::Assembling,
            begin_rule: params.begin_rule,
            end_rule: params.end_rule,
            terminal_tracking: table.terminal_tracking,
            debug_points: Vec::new(),
        };

        // Accumulate turns into a polyline from the origin
        let mut heading = table.start_angle_deg;
        let mut cursor = DVec2::ZERO;
        let mut vertices = vec![cursor];
        let mut headings = Vec::with_capacity(table.legs.len());
        for (i, leg) in table.legs.iter().enumerate() {
            let turn = params
                .turn_overrides
                .get(i)
                .copied()
                .flatten()
                .unwrap_or(leg.turn_deg);
            heading += turn;
            headings.push(heading);

            let len = *params.dims.get(&leg.dim).ok_or(FitError::MissingDim {
                kind: table.name,
                key: leg.dim,
            })?;
            if len <= 0.0 {
                return Err(FitError::InvalidDim {
                    key: leg.dim,
                    value: len,
                });
            }
            cursor += unit_from_deg(heading) * len;
            vertices.push(cursor);
        }

        // Re-anchor so the reference point lands exactly on the center
        let anchor = match table.anchor {
            Anchor::MidSegment(i) => (vertices[i] + vertices[i + 1]) / 2.0,
        };
        let shift = params.center - anchor;
        for v in &mut vertices {
            *v += shift;
        }

        // One rigid rotation about the center; normals rotate as free vectors
        for (i, leg) in table.legs.iter().enumerate() {
            let sign = params
                .normal_overrides
                .get(i)
                .copied()
                .flatten()
                .unwrap_or(leg.normal_sign);
            let normal = left_perp(unit_from_deg(headings[i])) * sign;

            let p1 = rotate_point(vertices[i], params.center, params.rotation_deg);
            let p2 = rotate_point(vertices[i + 1], params.center, params.rotation_deg);
            let normal = rotate_point(normal, DVec2::ZERO, params.rotation_deg);

            let state = if i == 0 {
                SegmentState::Fitting
            } else {
                SegmentState::Waiting
            };
            shape
                .segments
                .push(Segment::new(p1, p2, normal, state, &cfg.node_ratios));
        }

        shape.state = ShapeState::Converging;
        Ok(shape)
    }
}

/// Construction parameters for [`ShapeKind::build`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShapeParams {
    pub center: DVec2,
    /// Named leg lengths, already resolved to numbers (symbolic dimension
    /// expressions are an external pre-pass)
    pub dims: HashMap<char, f64>,
    /// Rigid rotation about the center, degrees
    pub rotation_deg: f64,
    /// Per-joint relative-turn replacements, indexed by leg
    pub turn_overrides: Vec<Option<f64>>,
    /// Per-segment normal-side replacements (+1 left of travel, -1 right)
    pub normal_overrides: Vec<Option<f64>>,
    pub begin_rule: Option<EndRule>,
    pub end_rule: Option<EndRule>,
}

impl ShapeParams {
    /// Params with the given center and dims, everything else default
    pub fn new(center: DVec2, dims: &[(char, f64)]) -> Self {
        Self {
            center,
            dims: dims.iter().copied().collect(),
            ..Self::default()
        }
    }
}
