use crate::{
    element::{CH, FaceStatus, FH, HH, Handle, VH},
    error::Error,
};
use glam::DVec3;
use std::ops::AddAssign;

/**
 * One row of the vertex table of a [`Dataset`].
 */
#[derive(Copy, Clone, Debug)]
pub struct VertexData {
    pub pos: DVec3,
    pub is_active: bool,
    pub at_border: bool,
}

impl Default for VertexData {
    fn default() -> Self {
        VertexData {
            pos: DVec3::ZERO,
            is_active: true,
            at_border: false,
        }
    }
}

/**
 * One row of the halfedge table of a [`Dataset`]. A halfedge is a directed
 * boundary segment going from `srce` to `trgt`, owned by `face`. Anchor
 * tethers are the only halfedges without an owning face.
 */
#[derive(Copy, Clone, Debug)]
pub struct HalfedgeData {
    pub srce: u32,
    pub trgt: u32,
    pub face: Option<u32>,
    pub cell: Option<u32>,
}

/**
 * One row of the face table of a [`Dataset`].
 */
#[derive(Copy, Clone, Debug)]
pub struct FaceData {
    pub is_alive: bool,
}

impl Default for FaceData {
    fn default() -> Self {
        FaceData { is_alive: true }
    }
}

/**
 * The bundle of named tables a [`Sheet`] is constructed from. Datasets come
 * from external loaders; this crate owns no file format.
 */
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    pub vert: Vec<VertexData>,
    pub edge: Vec<HalfedgeData>,
    pub face: Vec<FaceData>,
}

pub(crate) struct VertTable {
    pub(crate) pos: Vec<DVec3>,
    pub(crate) active: Vec<bool>,
    pub(crate) anchor: Vec<bool>,
    pub(crate) at_border: Vec<bool>,
    pub(crate) height: Vec<f64>,
}

impl VertTable {
    pub(crate) fn push(&mut self, pos: DVec3, active: bool, anchor: bool, at_border: bool) -> VH {
        let vi = self.pos.len() as u32;
        self.pos.push(pos);
        self.active.push(active);
        self.anchor.push(anchor);
        self.at_border.push(at_border);
        self.height.push(0.0);
        vi.into()
    }
}

/**
 * Anchoring is an explicit optional capability. When enabled, every halfedge
 * carries an anchor flag and an anchor elasticity.
 */
pub(crate) struct AnchorFields {
    pub(crate) is_anchor: Vec<bool>,
    pub(crate) elasticity: Vec<f64>,
}

pub(crate) struct EdgeTable {
    pub(crate) srce: Vec<VH>,
    pub(crate) trgt: Vec<VH>,
    pub(crate) face: Vec<Option<FH>>,
    pub(crate) cell: Vec<Option<CH>>,
    pub(crate) length: Vec<f64>,
    pub(crate) sub_area: Vec<f64>,
    pub(crate) line_tension: Vec<f64>,
    pub(crate) anchors: Option<AnchorFields>,
}

impl EdgeTable {
    /// Appends a halfedge row, keeping the anchor columns in sync when the
    /// capability is enabled.
    pub(crate) fn push(
        &mut self,
        srce: VH,
        trgt: VH,
        face: Option<FH>,
        cell: Option<CH>,
        line_tension: f64,
    ) -> HH {
        let hi = self.srce.len() as u32;
        self.srce.push(srce);
        self.trgt.push(trgt);
        self.face.push(face);
        self.cell.push(cell);
        self.length.push(0.0);
        self.sub_area.push(0.0);
        self.line_tension.push(line_tension);
        if let Some(anchors) = &mut self.anchors {
            anchors.is_anchor.push(false);
            anchors.elasticity.push(0.0);
        }
        hi.into()
    }
}

pub(crate) struct FaceTable {
    pub(crate) status: Vec<FaceStatus>,
    pub(crate) center: Vec<DVec3>,
    pub(crate) area: Vec<f64>,
    pub(crate) perimeter: Vec<f64>,
    pub(crate) volume: Vec<f64>,
    pub(crate) vol_elasticity: Vec<f64>,
    pub(crate) prefered_vol: Vec<f64>,
    pub(crate) contractility: Vec<f64>,
}

impl FaceTable {
    pub(crate) fn push(
        &mut self,
        status: FaceStatus,
        vol_elasticity: f64,
        prefered_vol: f64,
        contractility: f64,
    ) -> FH {
        let fi = self.status.len() as u32;
        self.status.push(status);
        self.center.push(DVec3::ZERO);
        self.area.push(0.0);
        self.perimeter.push(0.0);
        self.volume.push(0.0);
        self.vol_elasticity.push(vol_elasticity);
        self.prefered_vol.push(prefered_vol);
        self.contractility.push(contractility);
        fi.into()
    }
}

/**
 * Normalization constants derived by
 * [`ModelSpec::dimensionalize`](crate::units::ModelSpec::dimensionalize).
 * Energies are reported in units of `nrj_norm_factor`, gradients in units of
 * `grad_norm_factor`.
 */
#[derive(Copy, Clone, Debug)]
pub struct Settings {
    pub grad_norm_factor: f64,
    pub nrj_norm_factor: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            grad_norm_factor: 1.0,
            nrj_norm_factor: 1.0,
        }
    }
}

/**
 * An epithelial sheet mesh: indexed tables of vertices, halfedges and faces.
 *
 * The tables are arena-indexed struct-of-arrays storage. Relations are
 * expressed as integer handles; broadcasting a per-face or per-vertex column
 * onto halfedges is an index join ([`Sheet::upcast_face`] and friends), and
 * attributing per-halfedge values back to vertices is a group-by-id reduction
 * ([`Sheet::sum_as_srce`], [`Sheet::sum_as_trgt`]).
 *
 * The sheet exclusively owns its tables. Derived geometric columns (lengths,
 * areas, volumes, heights) are recomputed by a
 * [`Geometry`](crate::geometry::Geometry) implementation; they go stale after
 * positions move or topology changes.
 */
pub struct Sheet {
    pub(crate) verts: VertTable,
    pub(crate) edges: EdgeTable,
    pub(crate) faces: FaceTable,
    pub(crate) settings: Settings,
}

impl Sheet {
    /// Builds a sheet from a bundle of named tables.
    ///
    /// Validates every id reference and the structural invariants before
    /// returning; a bad dataset never produces a sheet.
    pub fn from_dataset(dataset: Dataset) -> Result<Sheet, Error> {
        let nv = dataset.vert.len() as u32;
        let nf = dataset.face.len() as u32;
        for row in &dataset.edge {
            if row.srce >= nv {
                return Err(Error::InvalidVertex(row.srce));
            }
            if row.trgt >= nv {
                return Err(Error::InvalidVertex(row.trgt));
            }
            if let Some(face) = row.face {
                if face >= nf {
                    return Err(Error::InvalidFace(face));
                }
            }
        }
        let sheet = Sheet {
            verts: VertTable {
                pos: dataset.vert.iter().map(|v| v.pos).collect(),
                active: dataset.vert.iter().map(|v| v.is_active).collect(),
                anchor: vec![false; dataset.vert.len()],
                at_border: dataset.vert.iter().map(|v| v.at_border).collect(),
                height: vec![0.0; dataset.vert.len()],
            },
            edges: EdgeTable {
                srce: dataset.edge.iter().map(|e| e.srce.into()).collect(),
                trgt: dataset.edge.iter().map(|e| e.trgt.into()).collect(),
                face: dataset.edge.iter().map(|e| e.face.map(FH::from)).collect(),
                cell: dataset.edge.iter().map(|e| e.cell.map(CH::from)).collect(),
                length: vec![0.0; dataset.edge.len()],
                sub_area: vec![0.0; dataset.edge.len()],
                line_tension: vec![0.0; dataset.edge.len()],
                anchors: None,
            },
            faces: FaceTable {
                status: dataset
                    .face
                    .iter()
                    .map(|f| {
                        if f.is_alive {
                            FaceStatus::Alive
                        } else {
                            FaceStatus::Dead
                        }
                    })
                    .collect(),
                center: vec![DVec3::ZERO; dataset.face.len()],
                area: vec![0.0; dataset.face.len()],
                perimeter: vec![0.0; dataset.face.len()],
                volume: vec![0.0; dataset.face.len()],
                vol_elasticity: vec![0.0; dataset.face.len()],
                prefered_vol: vec![0.0; dataset.face.len()],
                contractility: vec![0.0; dataset.face.len()],
            },
            settings: Settings::default(),
        };
        sheet.check()?;
        Ok(sheet)
    }

    pub fn num_vertices(&self) -> usize {
        self.verts.pos.len()
    }

    pub fn num_halfedges(&self) -> usize {
        self.edges.srce.len()
    }

    pub fn num_faces(&self) -> usize {
        self.faces.status.len()
    }

    pub fn vertices(&self) -> impl Iterator<Item = VH> {
        (0..(self.num_vertices() as u32)).map(|i| i.into())
    }

    pub fn halfedges(&self) -> impl Iterator<Item = HH> {
        (0..(self.num_halfedges() as u32)).map(|i| i.into())
    }

    pub fn faces(&self) -> impl Iterator<Item = FH> {
        (0..(self.num_faces() as u32)).map(|i| i.into())
    }

    pub fn srce(&self, h: HH) -> VH {
        self.edges.srce[h.index() as usize]
    }

    pub fn trgt(&self, h: HH) -> VH {
        self.edges.trgt[h.index() as usize]
    }

    pub fn face(&self, h: HH) -> Option<FH> {
        self.edges.face[h.index() as usize]
    }

    pub fn cell(&self, h: HH) -> Option<CH> {
        self.edges.cell[h.index() as usize]
    }

    pub fn position(&self, v: VH) -> DVec3 {
        self.verts.pos[v.index() as usize]
    }

    pub fn set_position(&mut self, v: VH, pos: DVec3) {
        self.verts.pos[v.index() as usize] = pos;
    }

    pub fn positions(&self) -> &[DVec3] {
        &self.verts.pos
    }

    /// Mutable access to the vertex positions, for external minimizers.
    /// Derived geometry goes stale after writes; re-run
    /// [`Geometry::update_all`](crate::geometry::Geometry::update_all).
    pub fn positions_mut(&mut self) -> &mut [DVec3] {
        &mut self.verts.pos
    }

    pub fn is_active(&self, v: VH) -> bool {
        self.verts.active[v.index() as usize]
    }

    pub fn is_anchor_vertex(&self, v: VH) -> bool {
        self.verts.anchor[v.index() as usize]
    }

    pub fn at_border(&self, v: VH) -> bool {
        self.verts.at_border[v.index() as usize]
    }

    pub fn height(&self, v: VH) -> f64 {
        self.verts.height[v.index() as usize]
    }

    pub fn length(&self, h: HH) -> f64 {
        self.edges.length[h.index() as usize]
    }

    pub fn sub_area(&self, h: HH) -> f64 {
        self.edges.sub_area[h.index() as usize]
    }

    pub fn line_tension(&self, h: HH) -> f64 {
        self.edges.line_tension[h.index() as usize]
    }

    pub fn status(&self, f: FH) -> FaceStatus {
        self.faces.status[f.index() as usize]
    }

    pub fn set_status(&mut self, f: FH, status: FaceStatus) {
        self.faces.status[f.index() as usize] = status;
    }

    pub fn center(&self, f: FH) -> DVec3 {
        self.faces.center[f.index() as usize]
    }

    pub fn area(&self, f: FH) -> f64 {
        self.faces.area[f.index() as usize]
    }

    pub fn perimeter(&self, f: FH) -> f64 {
        self.faces.perimeter[f.index() as usize]
    }

    pub fn volume(&self, f: FH) -> f64 {
        self.faces.volume[f.index() as usize]
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    /// Whether the anchoring capability is enabled on this sheet.
    pub fn has_anchors(&self) -> bool {
        self.edges.anchors.is_some()
    }

    pub fn is_anchor_halfedge(&self, h: HH) -> bool {
        match &self.edges.anchors {
            Some(anchors) => anchors.is_anchor[h.index() as usize],
            None => false,
        }
    }

    /// A halfedge participates in the mechanics when its owning face is alive.
    pub fn is_live_halfedge(&self, h: HH) -> bool {
        match self.face(h) {
            Some(f) => self.status(f).is_alive(),
            None => false,
        }
    }

    /// Finds the halfedge going from `from` to `to`, if any. The directed
    /// (source, target) pair is unique across the table.
    pub fn find_halfedge(&self, from: VH, to: VH) -> Option<HH> {
        self.halfedges()
            .find(|h| self.srce(*h) == from && self.trgt(*h) == to)
    }

    /// The halfedge running opposite to `h`, owned by the face on the other
    /// side. `None` on the tissue border.
    pub fn opposite(&self, h: HH) -> Option<HH> {
        self.find_halfedge(self.trgt(h), self.srce(h))
    }

    /// The halfedge following `h` along the boundary cycle of its owning
    /// face.
    pub fn next_in_face(&self, h: HH) -> Result<HH, Error> {
        let f = self.face(h).ok_or(Error::BorderHalfedge(h))?;
        let v = self.trgt(h);
        self.halfedges()
            .find(|n| self.face(*n) == Some(f) && self.srce(*n) == v)
            .ok_or(Error::BrokenFaceLoop(f))
    }

    /// The halfedges owned by face `f`, in table order.
    pub fn face_halfedges(&self, f: FH) -> impl Iterator<Item = HH> + use<'_> {
        self.halfedges().filter(move |h| self.face(*h) == Some(f))
    }

    /// The boundary cycle of face `f`, ordered head-to-tail starting from the
    /// lowest-index halfedge.
    ///
    /// Fails with [`Error::BrokenFaceLoop`] if the face's halfedges do not
    /// chain into a single closed cycle, or [`Error::DegenerateFace`] if the
    /// face has fewer than three sides.
    pub fn face_cycle(&self, f: FH) -> Result<Vec<HH>, Error> {
        let members: Vec<HH> = self.face_halfedges(f).collect();
        if members.len() < 3 {
            return Err(Error::DegenerateFace(f));
        }
        let start = members[0];
        let mut cycle = Vec::with_capacity(members.len());
        let mut h = start;
        loop {
            cycle.push(h);
            if cycle.len() > members.len() {
                return Err(Error::BrokenFaceLoop(f));
            }
            h = self.next_in_face(h)?;
            if h == start {
                break;
            }
        }
        if cycle.len() != members.len() {
            // A second disjoint cycle claims this face.
            return Err(Error::BrokenFaceLoop(f));
        }
        Ok(cycle)
    }

    /// The number of sides of face `f`.
    pub fn face_valence(&self, f: FH) -> usize {
        self.face_halfedges(f).count()
    }

    /// Broadcasts a per-face column onto the halfedges referencing each face.
    /// Faceless halfedges (anchor tethers) receive the default value.
    pub fn upcast_face<T: Copy + Default>(&self, per_face: &[T]) -> Vec<T> {
        self.edges
            .face
            .iter()
            .map(|f| match f {
                Some(f) => per_face[f.index() as usize],
                None => T::default(),
            })
            .collect()
    }

    /// Broadcasts a per-vertex column onto halfedges through their source.
    pub fn upcast_srce<T: Copy>(&self, per_vert: &[T]) -> Vec<T> {
        self.edges
            .srce
            .iter()
            .map(|v| per_vert[v.index() as usize])
            .collect()
    }

    /// Broadcasts a per-vertex column onto halfedges through their target.
    pub fn upcast_trgt<T: Copy>(&self, per_vert: &[T]) -> Vec<T> {
        self.edges
            .trgt
            .iter()
            .map(|v| per_vert[v.index() as usize])
            .collect()
    }

    /// Sums per-halfedge values onto each halfedge's source vertex. The
    /// reduction is a group-by-id sum; no ordering is assumed.
    pub fn sum_as_srce<T>(&self, per_edge: &[T]) -> Vec<T>
    where
        T: Copy + Default + AddAssign,
    {
        let mut out = vec![T::default(); self.num_vertices()];
        for (v, value) in self.edges.srce.iter().zip(per_edge.iter()) {
            out[v.index() as usize] += *value;
        }
        out
    }

    /// Sums per-halfedge values onto each halfedge's target vertex.
    pub fn sum_as_trgt<T>(&self, per_edge: &[T]) -> Vec<T>
    where
        T: Copy + Default + AddAssign,
    {
        let mut out = vec![T::default(); self.num_vertices()];
        for (v, value) in self.edges.trgt.iter().zip(per_edge.iter()) {
            out[v.index() as usize] += *value;
        }
        out
    }

    /// Tethers every border vertex to a fixed anchor vertex and enables the
    /// anchoring capability.
    ///
    /// Each anchor is a new inactive vertex placed on top of its border
    /// partner, connected by a faceless halfedge flagged `is_anchor`. This is
    /// a setup-phase operation; run it before applying the model parameters
    /// so the anchor elasticity column gets filled. Idempotent: already
    /// tethered vertices are skipped.
    pub fn create_anchors(&mut self) {
        if self.edges.anchors.is_none() {
            self.edges.anchors = Some(AnchorFields {
                is_anchor: vec![false; self.num_halfedges()],
                elasticity: vec![0.0; self.num_halfedges()],
            });
        }
        let tethered: Vec<VH> = self
            .halfedges()
            .filter(|h| self.is_anchor_halfedge(*h))
            .map(|h| self.srce(h))
            .collect();
        let border: Vec<VH> = self
            .vertices()
            .filter(|v| self.at_border(*v) && !tethered.contains(v))
            .collect();
        for v in border {
            let pos = self.position(v);
            let anchor = self.verts.push(pos, false, true, false);
            let h = self.edges.push(v, anchor, None, None, 0.0);
            let anchors = self.edges.anchors.as_mut().expect("capability enabled");
            anchors.is_anchor[h.index() as usize] = true;
        }
    }

    /// Resets every anchor vertex onto its border partner, releasing the
    /// elastic tension stored in the tethers.
    pub fn relax_anchors(&mut self) {
        for h in 0..self.num_halfedges() as u32 {
            let h: HH = h.into();
            if self.is_anchor_halfedge(h) {
                let pos = self.position(self.srce(h));
                self.set_position(self.trgt(h), pos);
            }
        }
    }
}
