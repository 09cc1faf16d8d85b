use crate::{
    error::Error,
    sheet::{Dataset, FaceData, HalfedgeData, Sheet, VertexData},
};
use glam::DVec3;
use std::collections::{HashMap, HashSet};

/// Builds a patch of `nx` by `ny` regular unit hexagonal cells in the xy
/// plane at z = 0.
///
/// Cells are pointy-top hexagons laid out in offset rows; corners shared
/// between neighboring cells are merged, and every face boundary runs
/// counter-clockwise. Vertices touching the outside of the patch are flagged
/// `at_border`. Derived geometry is left for a
/// [`Geometry`](crate::geometry::Geometry) pass.
///
/// Corner deduplication works on an exact integer grid: corner positions are
/// integer multiples of (√3/2, 1/2), so shared corners collapse without any
/// floating point tolerance.
pub fn hexagonal_sheet(nx: usize, ny: usize) -> Result<Sheet, Error> {
    assert!(nx > 0 && ny > 0, "The patch must contain at least one cell");
    // Corner offsets around a cell center, counter-clockwise from the
    // 30-degree corner, in grid units.
    const DX: [i64; 6] = [1, 0, -1, -1, 0, 1];
    const DY: [i64; 6] = [1, 2, 1, -1, -2, -1];
    let ux = 3.0f64.sqrt() / 2.0;
    let uy = 0.5f64;
    let mut corner_ids: HashMap<(i64, i64), u32> = HashMap::new();
    let mut vert: Vec<VertexData> = Vec::new();
    let mut edge: Vec<HalfedgeData> = Vec::new();
    let mut face: Vec<FaceData> = Vec::new();
    for r in 0..ny as i64 {
        for q in 0..nx as i64 {
            let (cx, cy) = (2 * q + (r & 1), 3 * r);
            let fi = face.len() as u32;
            face.push(FaceData::default());
            let corners: Vec<u32> = (0..6)
                .map(|k| {
                    let key = (cx + DX[k], cy + DY[k]);
                    *corner_ids.entry(key).or_insert_with(|| {
                        let vi = vert.len() as u32;
                        vert.push(VertexData {
                            pos: DVec3::new(key.0 as f64 * ux, key.1 as f64 * uy, 0.0),
                            is_active: true,
                            at_border: false,
                        });
                        vi
                    })
                })
                .collect();
            for k in 0..6 {
                edge.push(HalfedgeData {
                    srce: corners[k],
                    trgt: corners[(k + 1) % 6],
                    face: Some(fi),
                    cell: None,
                });
            }
        }
    }
    // A vertex is on the patch border when one of its halfedges has no
    // opposite.
    let pairs: HashSet<(u32, u32)> = edge.iter().map(|e| (e.srce, e.trgt)).collect();
    for e in &edge {
        if !pairs.contains(&(e.trgt, e.srce)) {
            vert[e.srce as usize].at_border = true;
            vert[e.trgt as usize].at_border = true;
        }
    }
    Sheet::from_dataset(Dataset { vert, edge, face })
}

/// The vertices shared by exactly three live hexagons, i.e. the interior
/// junctions of a hexagonal patch. Useful to pick fixture vertices whose
/// whole neighborhood lies inside the tissue.
pub fn interior_junctions(sheet: &Sheet) -> Vec<crate::VH> {
    sheet
        .vertices()
        .filter(|v| {
            let faces: Vec<_> = sheet
                .halfedges()
                .filter(|h| sheet.srce(*h) == *v)
                .filter_map(|h| sheet.face(h))
                .collect();
            faces.len() == 3 && faces.iter().all(|f| sheet.face_valence(*f) == 6)
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::{hexagonal_sheet, interior_junctions};
    use crate::{
        geometry::{Geometry, PlanarGeometry},
        macros::assert_f64_eq,
    };

    #[test]
    fn t_single_hexagon() {
        let sheet = hexagonal_sheet(1, 1).expect("Cannot build lattice");
        assert_eq!(sheet.num_faces(), 1);
        assert_eq!(sheet.num_vertices(), 6);
        assert_eq!(sheet.num_halfedges(), 6);
        assert!(sheet.vertices().all(|v| sheet.at_border(v)));
        let mut sheet = sheet;
        PlanarGeometry::default().update_all(&mut sheet);
        // Regular unit hexagon.
        assert_f64_eq!(sheet.area(0.into()), 1.5 * 3.0f64.sqrt(), 1e-12);
        assert_f64_eq!(sheet.perimeter(0.into()), 6.0, 1e-12);
    }

    #[test]
    fn t_patch_is_consistent() {
        let sheet = hexagonal_sheet(4, 4).expect("Cannot build lattice");
        assert_eq!(sheet.num_faces(), 16);
        assert_eq!(sheet.num_halfedges(), 96);
        sheet.check().expect("Lattice must pass the invariant check");
        for f in sheet.faces() {
            assert_eq!(sheet.face_valence(f), 6);
        }
        // Neighboring cells share edges: strictly fewer than 6 vertices per
        // cell once merged.
        assert!(sheet.num_vertices() < 96);
        // Interior junctions exist and are not border vertices.
        let junctions = interior_junctions(&sheet);
        assert!(!junctions.is_empty());
        assert!(junctions.iter().all(|v| !sheet.at_border(*v)));
    }

    #[test]
    fn t_shared_edges_have_opposites() {
        let sheet = hexagonal_sheet(2, 1).expect("Cannot build lattice");
        assert_eq!(sheet.num_faces(), 2);
        let shared: Vec<_> = sheet
            .halfedges()
            .filter(|h| sheet.opposite(*h).is_some())
            .collect();
        // One shared wall between the two cells.
        assert_eq!(shared.len(), 2);
        let h = shared[0];
        let oh = sheet.opposite(h).expect("Shared wall has an opposite");
        assert_ne!(sheet.face(h), sheet.face(oh));
    }
}
