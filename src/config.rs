//! Solver tuning
//!
//! Every constant the convergence loop consumes lives in one immutable value
//! that the caller passes into each tick. Nothing in the solver reads ambient
//! state, so two shapes can be driven with different tunings side by side.

use serde::{Deserialize, Serialize};

/// Tuning for the convergence engine and end resolver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Velocity gained per tick toward a node's target, as a fraction of the
    /// remaining error (explicit Euler, no mass)
    pub gravity_gain: f64,
    /// Per-tick velocity retention factor, must be < 1 for convergence
    pub damping: f64,
    /// A segment settles once the summed |vx|+|vy| over its nodes drops below this
    pub converge_threshold: f64,
    /// ...and every node sits within this absolute distance of its target
    pub settle_tolerance: f64,
    /// Sample positions along a segment where nodes are spawned, as ratios of
    /// its length. Two samples are enough to recover position and angle.
    pub node_ratios: [f64; 2],
    /// A wall qualifies as a target only when its normal dotted with the cast
    /// direction falls below this (walls must face the cast to oppose it)
    pub opposite_threshold: f64,
    /// Walls shorter than this are extended symmetrically about their midpoint
    /// before raycasting, so narrow faces stay hittable
    pub min_wall_span: f64,
    /// How far past an extremity a RAY end rule starts its cast, keeping the
    /// bar's own resting surface out of the hit set
    pub ray_skip: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            gravity_gain: 0.1,
            damping: 0.8,
            converge_threshold: 0.5,
            settle_tolerance: 1.0,
            node_ratios: [0.4, 0.6],
            opposite_threshold: -0.9,
            min_wall_span: 500.0,
            ray_skip: 0.1,
        }
    }
}
