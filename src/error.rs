//! Crate error type

use thiserror::Error;

/// Errors surfaced by shape construction, configuration, and the solve driver
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    /// A shape kind referenced a leg dimension the caller did not supply
    #[error("missing dimension '{key}' for shape kind {kind}")]
    MissingDim { kind: &'static str, key: char },

    /// A supplied leg dimension was zero or negative
    #[error("dimension '{key}' must be positive, got {value}")]
    InvalidDim { key: char, value: f64 },

    /// An end-rule string was neither FIT nor RAY
    #[error("unknown end rule '{0}' (expected FIT or RAY)")]
    UnknownEndRule(String),

    /// The convergence loop exhausted its tick budget before every segment
    /// settled; the shape has been parked in the Stalled state
    #[error("shape failed to settle within {ticks} ticks")]
    Stalled { ticks: u32 },

    /// Outline node, corner-spec, and tag lists must be the same length
    #[error("outline arrays disagree in length: {nodes} nodes, {specs} specs, {tags} tags")]
    OutlineMismatch {
        nodes: usize,
        specs: usize,
        tags: usize,
    },
}
