use crate::element::{FH, HH, VH};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // Parameters.
    #[error("missing required parameter `{0}`")]
    MissingParameter(&'static str),
    #[error("normalization factor `{0}` must be strictly positive, got {1}")]
    NonPositiveNormFactor(&'static str, f64),
    // Dataset construction.
    #[error("halfedge references vertex index {0} outside the vertex table")]
    InvalidVertex(u32),
    #[error("halfedge references face index {0} outside the face table")]
    InvalidFace(u32),
    #[error("table `{0}` has {1} rows, expected {2}")]
    MismatchedTableLengths(&'static str, usize, usize),
    // Topology.
    #[error("two halfedges share the (source, target, face) triple starting at {0}")]
    DuplicateHalfedge(VH),
    #[error("halfedges of face {0} do not form a single closed cycle")]
    BrokenFaceLoop(FH),
    #[error("face {0} has, or would be left with, fewer than three sides")]
    DegenerateFace(FH),
    #[error("halfedge {0} lies on the tissue border")]
    BorderHalfedge(HH),
    #[error("face {0} is dead")]
    DeadFace(FH),
    #[error("face {0} has no pair of non-adjacent interior edges to split")]
    NoDivisionAxis(FH),
    #[error("halfedge index {0} out of bounds")]
    InvalidHalfedge(u32),
}
