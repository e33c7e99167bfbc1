//! Rebar Fit - automatic placement of multi-segment rebar shapes in 2D sections
//!
//! Core modules:
//! - `geom`: Stateless 2D geometry kernel (distances, angles, fillets, intersections)
//! - `section`: Wall records, cover lookup, and the geometric outline builder
//! - `config`: Explicit solver tuning passed into every tick
//! - `solver`: Shape model, convergence engine, finalizer, and end-rule resolver
//!
//! A caller builds a `Vec<Wall>` (one per boundary face of the cross-section),
//! constructs a [`solver::RebarShape`] through [`solver::ShapeKind::build`], and
//! drives it with [`solver::tick`] or the bounded [`solver::solve`] until the
//! shape reports [`solver::ShapeState::Formed`].

pub mod config;
pub mod error;
pub mod geom;
pub mod section;
pub mod solver;

pub use config::SolverConfig;
pub use error::FitError;
pub use section::{CoverTable, CoverTag, Wall};
pub use solver::{EndRule, EndRuleKind, RebarShape, ShapeKind, ShapeParams, ShapeState, solve, tick};

use glam::DVec2;

/// Shared numeric constants
pub mod consts {
    /// Absolute epsilon for near-singular determinants and axis-aligned checks
    pub const GEOM_EPS: f64 = 1e-10;
    /// Below this node spread the settled direction falls back to the prior one
    pub const DIR_EPS: f64 = 0.01;
}

/// Unit vector for a heading in degrees
#[inline]
pub fn unit_from_deg(angle_deg: f64) -> DVec2 {
    DVec2::from_angle(angle_deg.to_radians())
}

/// Counterclockwise perpendicular (left of travel) of a vector
#[inline]
pub fn left_perp(v: DVec2) -> DVec2 {
    DVec2::new(-v.y, v.x)
}
