//! Shape and segment state
//!
//! All state the solver mutates lives here. A `RebarShape` owns its segments,
//! each segment owns its sample nodes, and every lifecycle transition is
//! one-way: segments move Waiting -> Fitting -> Settled, shapes end at Formed
//! (or Stalled) and ignore everything afterwards.

use std::str::FromStr;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::error::FitError;
use crate::section::Wall;

/// Lifecycle of a single segment, irreversible left to right
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentState {
    /// Parked until the previous segment settles
    Waiting,
    /// Nodes are actively seeking a wall target
    Fitting,
    /// Converged; endpoints rebuilt from the node line
    Settled,
}

/// Lifecycle of a whole shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapeState {
    /// Generator is still emitting segments
    Assembling,
    /// Segments are settling one after another
    Converging,
    /// Finalized and end-trimmed; terminal, all further mutation is a no-op
    Formed,
    /// Tick budget ran out before every segment settled; terminal
    Stalled,
}

impl ShapeState {
    /// Terminal states accept no further mutation
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, ShapeState::Formed | ShapeState::Stalled)
    }
}

/// A simulated sample point on a segment
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Node {
    pub pos: DVec2,
    pub vel: DVec2,
}

impl Node {
    pub fn at(pos: DVec2) -> Self {
        Self {
            pos,
            vel: DVec2::ZERO,
        }
    }
}

/// One straight piece of a multi-part rebar shape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub p1: DVec2,
    pub p2: DVec2,
    /// Sample nodes driving convergence, at fixed ratios along p1 -> p2
    pub nodes: Vec<Node>,
    /// Cast direction for wall seeking; fixed at generation, rotated rigidly
    /// with the shape, never re-derived from the endpoints
    pub normal: DVec2,
    /// Unit direction p1 -> p2
    pub dir: DVec2,
    /// Nominal bar length; preserved through settling, rewritten only by an
    /// end rule
    pub initial_len: f64,
    pub state: SegmentState,
    /// Last wall any node targeted; needed by the FIT end rule
    pub contact_wall: Option<Wall>,
}

impl Segment {
    /// Build a segment with nodes sampled at the given ratios along p1 -> p2
    pub fn new(p1: DVec2, p2: DVec2, normal: DVec2, state: SegmentState, ratios: &[f64]) -> Self {
        let initial_len = p1.distance(p2);
        let nodes = ratios
            .iter()
            .map(|&r| Node::at(p1 + (p2 - p1) * r))
            .collect();
        Self {
            p1,
            p2,
            nodes,
            normal,
            dir: (p2 - p1) / initial_len,
            initial_len,
            state,
            contact_wall: None,
        }
    }

    /// Recompute the cached direction and nominal length from the endpoints,
    /// after an end rule moves one of them
    pub fn resync(&mut self) {
        self.initial_len = self.p1.distance(self.p2);
        if self.initial_len > crate::consts::GEOM_EPS {
            self.dir = (self.p2 - self.p1) / self.initial_len;
        }
    }
}

/// The two end-condition rule kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndRuleKind {
    /// Snap to the far cover-adjusted endpoint of the contacted wall,
    /// projected onto the segment line
    Fit,
    /// Raycast past the extremity against the covered wall set
    Ray,
}

impl FromStr for EndRuleKind {
    type Err = FitError;

    fn from_str(s: &str) -> Result<Self, FitError> {
        match s.to_ascii_uppercase().as_str() {
            "FIT" => Ok(EndRuleKind::Fit),
            "RAY" => Ok(EndRuleKind::Ray),
            _ => Err(FitError::UnknownEndRule(s.to_string())),
        }
    }
}

/// An end rule plus its signed length offset.
///
/// Positive offsets lengthen the bar: the extremity lands `offset` past the
/// resolved point, measured outward along the bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EndRule {
    pub kind: EndRuleKind,
    pub offset: f64,
}

impl EndRule {
    pub fn new(kind: EndRuleKind, offset: f64) -> Self {
        Self { kind, offset }
    }

    /// Parse a textual rule ("FIT"/"RAY", case-insensitive) with its offset
    pub fn parse(kind: &str, offset: f64) -> Result<Self, FitError> {
        Ok(Self::new(kind.parse()?, offset))
    }
}

/// A multi-segment rebar shape moving through its placement lifecycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebarShape {
    pub kind: super::ShapeKind,
    /// Anchor the generator centered the shape on
    pub center: DVec2,
    /// Rigid rotation applied at generation, degrees
    pub rotation_deg: f64,
    /// Segments in settle order; the order never changes after generation
    pub segments: Vec<Segment>,
    pub state: ShapeState,
    pub begin_rule: Option<EndRule>,
    pub end_rule: Option<EndRule>,
    /// Whether the finalizer re-derives the free terminal endpoints from the
    /// achieved node angles (kinds with open hook ends)
    pub terminal_tracking: bool,
    /// Wall targets found this tick, for diagnostics/rendering only
    #[serde(skip)]
    pub debug_points: Vec<DVec2>,
}

impl RebarShape {
    /// Final polyline endpoints, for the caller/renderer
    pub fn polyline(&self) -> Vec<(DVec2, DVec2)> {
        self.segments.iter().map(|s| (s.p1, s.p2)).collect()
    }

    /// True once every segment has settled
    pub fn all_settled(&self) -> bool {
        self.segments
            .iter()
            .all(|s| s.state == SegmentState::Settled)
    }
}
