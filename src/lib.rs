/*!
This is a vertex model library for the mechanics of epithelial sheets,
inspired by [tyssue](https://github.com/DamCB/tyssue). A tissue is a polygonal
mesh of cells; the mechanical state is an energy functional over the mesh
geometry, and morphogenesis is driven by gradient descent punctuated by
discrete topology changes.

# Overview

+ The tissue is stored as a [`Sheet`]: arena-indexed tables of vertices,
  halfedges and faces, addressed by the handle types [`VH`], [`HH`], [`FH`]
  and [`CH`]. Every cell boundary is a closed counter-clockwise cycle of
  halfedges; interior walls are represented twice, once per adjacent cell.

+ Geometry is a pluggable collaborator. A [`Geometry`] implementation, such as
  the quasi 2D [`PlanarGeometry`], refreshes the derived columns of the tables
  after positions move or the topology changes: edge lengths, face areas,
  perimeters, centers and pseudo volumes.

+ The mechanical model follows Farhadifar et al: line tension on the cell
  walls, a volumetric elasticity per cell and a perimeter contractility per
  cell, with an optional elastic anchoring of the tissue border. Parameters
  are specified dimensionless in a [`ModelSpec`] and scaled to physical units
  with [`ModelSpec::dimensionalize`]; [`compute_energy`] and
  [`compute_gradient`] evaluate the normalized functional and its spatial
  derivative.

+ Topology changes are rare, discrete events between descent steps:
  [`Sheet::type1_transition`] exchanges the neighbors across a cell junction
  and [`Sheet::cell_division`] splits a cell in two. Cells leave the tissue by
  being marked [`FaceStatus::Dead`] rather than by removal, so row indices
  stay stable for a recorded [`History`].
*/

mod check;
mod element;
mod error;
mod geometry;
mod history;
mod lattice;
mod macros;
mod model;
mod sheet;
mod topology;
mod units;

pub use element::{CH, FH, FaceStatus, HH, Handle, VH};
pub use error::Error;
pub use geometry::{Geometry, PlanarGeometry};
pub use history::{Columns, EdgeColumn, FaceColumn, Frame, History, VertColumn};
pub use lattice::{hexagonal_sheet, interior_junctions};
pub use model::{
    EnergyTerms, GradientTerms, compute_energy, compute_gradient, energy_terms, gradient_terms,
};
pub use sheet::{Dataset, FaceData, HalfedgeData, Settings, Sheet, VertexData};
pub use units::{DimEdgeSpec, DimFaceSpec, DimModelSpec, EdgeSpec, FaceSpec, ModelSpec};
