use crate::{
    element::Handle,
    sheet::Sheet,
};
use glam::DVec3;

/**
 * Geometry recomputation and geometric derivatives consumed by the energy
 * engine.
 *
 * Implementations recompute the derived columns of a [`Sheet`] from vertex
 * positions and expose the per-halfedge / per-vertex derivatives the gradient
 * construction is chained from. The engine itself never differentiates
 * positions directly; it only combines these primitives.
 */
pub trait Geometry {
    /// Recomputes the derived geometric columns in place: vertex heights,
    /// halfedge lengths and sub-areas, face centers, areas, perimeters and
    /// volumes. Must be re-run after positions move or topology changes,
    /// before the next energy or gradient evaluation.
    fn update_all(&self, sheet: &mut Sheet);

    /// Per-halfedge derivative of the halfedge length with respect to its
    /// source vertex. The derivative with respect to the target is the
    /// negation.
    fn length_grad(&self, sheet: &Sheet) -> Vec<DVec3> {
        sheet
            .halfedges()
            .map(|h| {
                let d = sheet.position(sheet.srce(h)) - sheet.position(sheet.trgt(h));
                let l = d.length();
                if l > 0.0 { d / l } else { DVec3::ZERO }
            })
            .collect()
    }

    /// Per-halfedge derivatives of the halfedge sub-area with respect to the
    /// source and target vertices. Zero for faceless halfedges.
    fn area_grad(&self, sheet: &Sheet) -> (Vec<DVec3>, Vec<DVec3>);

    /// Per-vertex derivative of the vertex height.
    fn height_grad(&self, sheet: &Sheet) -> Vec<DVec3>;
}

/**
 * Planar sheet geometry.
 *
 * The tissue lies in the xy plane; the height of a vertex is its z coordinate
 * measured from a basal plane `basal_shift` below the origin. Face sub-areas
 * are signed shoelace triangles about the face center (counter-clockwise
 * boundaries give positive areas), and the face volume is the height-weighted
 * sub-area sum `Σ height(srce) · sub_area`.
 *
 * Face centers are held fixed when differentiating sub-areas. The resulting
 * gradient is exact whenever the heights across a face are uniform, the
 * center terms of a closed boundary summing to zero.
 */
#[derive(Copy, Clone, Debug)]
pub struct PlanarGeometry {
    pub basal_shift: f64,
}

impl Default for PlanarGeometry {
    fn default() -> Self {
        PlanarGeometry { basal_shift: 1.0 }
    }
}

impl Geometry for PlanarGeometry {
    fn update_all(&self, sheet: &mut Sheet) {
        let nv = sheet.num_vertices();
        let ne = sheet.num_halfedges();
        let nf = sheet.num_faces();
        for v in 0..nv {
            sheet.verts.height[v] = sheet.verts.pos[v].z + self.basal_shift;
        }
        for h in 0..ne {
            let s = sheet.edges.srce[h].index() as usize;
            let t = sheet.edges.trgt[h].index() as usize;
            sheet.edges.length[h] = sheet.verts.pos[s].distance(sheet.verts.pos[t]);
        }
        // Face centers are the means of the boundary vertices. Every boundary
        // vertex is the source of exactly one halfedge of the face.
        let mut sums = vec![DVec3::ZERO; nf];
        let mut counts = vec![0u32; nf];
        for h in 0..ne {
            if let Some(f) = sheet.edges.face[h] {
                let f = f.index() as usize;
                sums[f] += sheet.verts.pos[sheet.edges.srce[h].index() as usize];
                counts[f] += 1;
            }
        }
        for f in 0..nf {
            sheet.faces.center[f] = if counts[f] > 0 {
                sums[f] / counts[f] as f64
            } else {
                DVec3::ZERO
            };
        }
        sheet.faces.area.fill(0.0);
        sheet.faces.perimeter.fill(0.0);
        sheet.faces.volume.fill(0.0);
        for h in 0..ne {
            let Some(f) = sheet.edges.face[h] else {
                sheet.edges.sub_area[h] = 0.0;
                continue;
            };
            let f = f.index() as usize;
            let c = sheet.faces.center[f];
            let rs = sheet.verts.pos[sheet.edges.srce[h].index() as usize] - c;
            let rt = sheet.verts.pos[sheet.edges.trgt[h].index() as usize] - c;
            let sub_area = 0.5 * (rs.x * rt.y - rs.y * rt.x);
            sheet.edges.sub_area[h] = sub_area;
            sheet.faces.area[f] += sub_area;
            sheet.faces.perimeter[f] += sheet.edges.length[h];
            sheet.faces.volume[f] +=
                sheet.verts.height[sheet.edges.srce[h].index() as usize] * sub_area;
        }
    }

    fn area_grad(&self, sheet: &Sheet) -> (Vec<DVec3>, Vec<DVec3>) {
        let ne = sheet.num_halfedges();
        let mut grad_srce = vec![DVec3::ZERO; ne];
        let mut grad_trgt = vec![DVec3::ZERO; ne];
        for h in 0..ne {
            let Some(f) = sheet.edges.face[h] else {
                continue;
            };
            let c = sheet.faces.center[f.index() as usize];
            let rs = sheet.verts.pos[sheet.edges.srce[h].index() as usize] - c;
            let rt = sheet.verts.pos[sheet.edges.trgt[h].index() as usize] - c;
            grad_srce[h] = 0.5 * DVec3::new(rt.y, -rt.x, 0.0);
            grad_trgt[h] = 0.5 * DVec3::new(-rs.y, rs.x, 0.0);
        }
        (grad_srce, grad_trgt)
    }

    fn height_grad(&self, sheet: &Sheet) -> Vec<DVec3> {
        vec![DVec3::Z; sheet.num_vertices()]
    }
}
