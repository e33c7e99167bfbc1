//! Section boundary data: walls, cover lookup, and the outline builder
//!
//! A `Wall` is one straight face of the concrete cross-section. The solver
//! treats the wall list as read-only; nothing in this crate mutates a wall
//! after construction. Parsing textual section descriptions is out of scope -
//! callers hand over point paths or ready-made wall lists.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::consts::GEOM_EPS;
use crate::error::FitError;
use crate::geom::{self, Fillet};
use crate::left_perp;

/// Cover category of a wall face.
///
/// The clearance a bar must keep from a face depends on where the face sits,
/// not on the face itself, so walls carry a tag and the per-section
/// [`CoverTable`] resolves it to a distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CoverTag {
    Top,
    #[default]
    Outer,
    Inner,
}

/// Per-section cover lookup, one distance per tag
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoverTable {
    pub top: f64,
    pub outer: f64,
    pub inner: f64,
}

impl CoverTable {
    pub fn new(top: f64, outer: f64, inner: f64) -> Self {
        Self { top, outer, inner }
    }

    /// Same cover on every face
    pub fn uniform(cover: f64) -> Self {
        Self::new(cover, cover, cover)
    }

    #[inline]
    pub fn get(&self, tag: CoverTag) -> f64 {
        match tag {
            CoverTag::Top => self.top,
            CoverTag::Outer => self.outer,
            CoverTag::Inner => self.inner,
        }
    }
}

/// One straight boundary face of the section
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wall {
    pub p1: DVec2,
    pub p2: DVec2,
    /// Unit normal of the face, pointing off the concrete into the section
    /// interior - the side a bar approaches from
    pub normal: DVec2,
    pub tag: CoverTag,
}

impl Wall {
    pub fn new(p1: DVec2, p2: DVec2, normal: DVec2, tag: CoverTag) -> Self {
        Self { p1, p2, normal, tag }
    }

    /// Build a wall from an edge traversed counterclockwise around the
    /// section, deriving the interior-facing normal as the left perpendicular
    /// of p1 -> p2. Returns `None` for a degenerate edge.
    pub fn from_edge(p1: DVec2, p2: DVec2, tag: CoverTag) -> Option<Self> {
        let len = p1.distance(p2);
        if len <= GEOM_EPS {
            return None;
        }
        Some(Self::new(p1, p2, left_perp((p2 - p1) / len), tag))
    }

    /// Wall endpoints shifted into the section by `cover` along the normal
    #[inline]
    pub fn covered(&self, cover: f64) -> (DVec2, DVec2) {
        (self.p1 + self.normal * cover, self.p2 + self.normal * cover)
    }
}

/// Corner treatment for the outline builder
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum CornerSpec {
    /// Sharp corner, edges meet at the node
    #[default]
    None,
    /// Straight cut set back along each edge
    Chamfer { setback: f64 },
    /// Tangent arc of the given radius
    Fillet { radius: f64 },
}

impl CornerSpec {
    /// How far this corner trims each incident edge back from the node
    fn trim(&self, prev: DVec2, node: DVec2, next: DVec2) -> f64 {
        match *self {
            CornerSpec::None => 0.0,
            CornerSpec::Chamfer { setback } => setback,
            CornerSpec::Fillet { radius } => {
                let tan_half = (geom::inner_angle(prev, node, next) / 2.0).to_radians().tan();
                if tan_half.abs() <= GEOM_EPS {
                    0.0
                } else {
                    radius / tan_half
                }
            }
        }
    }
}

/// Walls plus fillet arcs produced by [`build_outline`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Outline {
    pub walls: Vec<Wall>,
    /// Arcs replacing filleted corners, for display sampling
    pub arcs: Vec<Fillet>,
}

/// Build the wall list for one closed path of the section boundary.
///
/// `nodes` are the path vertices in counterclockwise order; `specs[i]` is the
/// treatment of the corner at `nodes[i]` and `tags[i]` the cover tag of the
/// edge leaving `nodes[i]`. Each edge is shortened by its corners' trim
/// lengths; edges consumed entirely by their corner treatments emit no wall.
pub fn build_outline(
    nodes: &[DVec2],
    specs: &[CornerSpec],
    tags: &[CoverTag],
) -> Result<Outline, FitError> {
    if nodes.len() != specs.len() || nodes.len() != tags.len() {
        return Err(FitError::OutlineMismatch {
            nodes: nodes.len(),
            specs: specs.len(),
            tags: tags.len(),
        });
    }

    let n = nodes.len();
    let mut outline = Outline::default();
    if n < 3 {
        return Ok(outline);
    }

    let trims: Vec<f64> = (0..n)
        .map(|i| {
            let prev = nodes[(i + n - 1) % n];
            let next = nodes[(i + 1) % n];
            specs[i].trim(prev, nodes[i], next)
        })
        .collect();

    for i in 0..n {
        let j = (i + 1) % n;
        let p1 = nodes[i];
        let p2 = nodes[j];
        let len = p1.distance(p2);
        // Edge swallowed by its corner treatments
        if len <= trims[i] + trims[j] + 0.1 {
            continue;
        }
        let u = (p2 - p1) / len;
        let start = p1 + u * trims[i];
        let end = p2 - u * trims[j];
        if let Some(wall) = Wall::from_edge(start, end, tags[i]) {
            outline.walls.push(wall);
        }

        if let CornerSpec::Fillet { radius } = specs[j] {
            let next = nodes[(j + 1) % n];
            if let Some(arc) = geom::fillet(p1, p2, next, radius) {
                outline.arcs.push(arc);
            }
        }
    }

    Ok(outline)
}
