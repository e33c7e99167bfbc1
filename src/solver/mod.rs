//! The placement solver
//!
//! Pure and deterministic: fixed logic per tick, no clocks, no randomness,
//! no I/O. Independent shapes share nothing mutable - the wall set is
//! read-only - so separate shapes may be ticked in any order or in parallel.
//! Within one shape, segments settle strictly in their generation order.

pub mod ends;
pub mod engine;
pub mod finalize;
pub mod shapes;
pub mod state;

pub use engine::{Target, gravity_target, solve, tick};
pub use shapes::{ShapeKind, ShapeParams};
pub use state::{
    EndRule, EndRuleKind, Node, RebarShape, Segment, SegmentState, ShapeState,
};
