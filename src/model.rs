use crate::{
    element::Handle,
    geometry::Geometry,
    sheet::Sheet,
};
use glam::DVec3;

/**
 * The normalized energy contributions of the sheet, one entry per term of the
 * functional. The anchor entry is present only on sheets with the anchoring
 * capability.
 */
#[derive(Copy, Clone, Debug)]
pub struct EnergyTerms {
    pub tension: f64,
    pub elastic: f64,
    pub contractile: f64,
    pub anchor: Option<f64>,
}

impl EnergyTerms {
    pub fn total(&self) -> f64 {
        self.tension + self.elastic + self.contractile + self.anchor.unwrap_or(0.0)
    }
}

/**
 * Raw per-halfedge gradient contributions, before aggregation onto vertices.
 * Useful to test each term of the functional in isolation.
 */
pub struct GradientTerms {
    pub tension: Vec<DVec3>,
    pub contractile: Vec<DVec3>,
    pub elastic_srce: Vec<DVec3>,
    pub elastic_trgt: Vec<DVec3>,
    pub anchor: Option<Vec<DVec3>>,
}

/// Computes the normalized energy terms of the sheet.
///
/// Only live faces and their boundary halfedges contribute to the tension,
/// elastic and contractile terms. The anchor term runs over all halfedges and
/// is skipped entirely when the sheet has no anchoring capability. Every term
/// is divided by `nrj_norm_factor`.
pub fn energy_terms(sheet: &Sheet) -> EnergyTerms {
    let norm = sheet.settings().nrj_norm_factor;
    let mut tension = 0.0;
    for h in sheet.halfedges().filter(|h| sheet.is_live_halfedge(*h)) {
        tension += sheet.line_tension(h) * sheet.length(h) / 2.0;
    }
    let mut elastic = 0.0;
    let mut contractile = 0.0;
    for f in sheet.faces().filter(|f| sheet.status(*f).is_alive()) {
        let fi = f.index() as usize;
        let dv = sheet.faces.volume[fi] - sheet.faces.prefered_vol[fi];
        elastic += 0.5 * sheet.faces.vol_elasticity[fi] * dv * dv;
        let p = sheet.faces.perimeter[fi];
        contractile += 0.5 * sheet.faces.contractility[fi] * p * p;
    }
    let anchor = sheet.edges.anchors.as_ref().map(|anchors| {
        sheet
            .halfedges()
            .filter(|h| anchors.is_anchor[h.index() as usize])
            .map(|h| {
                let l = sheet.length(h);
                0.5 * anchors.elasticity[h.index() as usize] * l * l
            })
            .sum::<f64>()
            / norm
    });
    EnergyTerms {
        tension: tension / norm,
        elastic: elastic / norm,
        contractile: contractile / norm,
        anchor,
    }
}

/// The total normalized mechanical energy of the sheet.
pub fn compute_energy(sheet: &Sheet) -> f64 {
    energy_terms(sheet).total()
}

/// Computes the raw per-halfedge gradient contributions of every term.
///
/// Each contribution is built from the geometric derivatives by the chain
/// rule: the length gradient carries the tension, contractile and anchor
/// terms; the area and height gradients carry the volumetric elastic term,
/// split into a source-side and a target-side part. The height gradient has
/// no target-side part in this formulation, the volume being the
/// source-height weighted sub-area sum.
pub fn gradient_terms<G: Geometry>(sheet: &Sheet, geom: &G) -> GradientTerms {
    let ne = sheet.num_halfedges();
    let grad_l = geom.length_grad(sheet);
    let mut tension = vec![DVec3::ZERO; ne];
    let mut contractile = vec![DVec3::ZERO; ne];
    for h in sheet.halfedges() {
        let hi = h.index() as usize;
        let Some(f) = sheet.face(h) else {
            continue;
        };
        if !sheet.status(f).is_alive() {
            continue;
        }
        let fi = f.index() as usize;
        tension[hi] = grad_l[hi] * sheet.edges.line_tension[hi];
        // d(0.5 γ P²)/dx = γ P dP/dx, with dP/dx summed over the boundary.
        contractile[hi] =
            grad_l[hi] * sheet.faces.contractility[fi] * sheet.faces.perimeter[fi];
    }
    // Per-face elastic force magnitude K (V - V0), zero on dead faces.
    let force: Vec<f64> = sheet
        .faces()
        .map(|f| {
            let fi = f.index() as usize;
            if sheet.status(f).is_alive() {
                sheet.faces.vol_elasticity[fi]
                    * (sheet.faces.volume[fi] - sheet.faces.prefered_vol[fi])
            } else {
                0.0
            }
        })
        .collect();
    let force = sheet.upcast_face(&force);
    let edge_height = sheet.upcast_srce(&sheet.verts.height);
    let (grad_a_srce, grad_a_trgt) = geom.area_grad(sheet);
    let grad_h = sheet.upcast_srce(&geom.height_grad(sheet));
    let mut elastic_srce = vec![DVec3::ZERO; ne];
    let mut elastic_trgt = vec![DVec3::ZERO; ne];
    for hi in 0..ne {
        elastic_srce[hi] = force[hi]
            * (edge_height[hi] * grad_a_srce[hi] + sheet.edges.sub_area[hi] * grad_h[hi]);
        elastic_trgt[hi] = force[hi] * (edge_height[hi] * grad_a_trgt[hi]);
    }
    let anchor = sheet.edges.anchors.as_ref().map(|anchors| {
        (0..ne)
            .map(|hi| {
                if anchors.is_anchor[hi] {
                    grad_l[hi] * anchors.elasticity[hi] * sheet.edges.length[hi]
                } else {
                    DVec3::ZERO
                }
            })
            .collect()
    });
    GradientTerms {
        tension,
        contractile,
        elastic_srce,
        elastic_trgt,
        anchor,
    }
}

/// Computes the normalized spatial energy gradient, one vector per vertex.
///
/// Halfedge contributions are aggregated onto vertices by group-by-id sums.
/// The tension term aggregates as (sum as source − sum as target) / 2; every
/// physical edge is visited from both endpoints with opposing sign, hence
/// the halving. The contractile term aggregates as sum as source − sum as
/// target, the elastic source/target parts onto their respective vertex
/// roles, and the anchor term onto source vertices only. Inactive vertices
/// receive exactly zero. The result is divided by `grad_norm_factor`.
///
/// Moving vertices along the negative gradient decreases the energy to first
/// order.
pub fn compute_gradient<G: Geometry>(sheet: &Sheet, geom: &G) -> Vec<DVec3> {
    let terms = gradient_terms(sheet, geom);
    let t_srce = sheet.sum_as_srce(&terms.tension);
    let t_trgt = sheet.sum_as_trgt(&terms.tension);
    let c_srce = sheet.sum_as_srce(&terms.contractile);
    let c_trgt = sheet.sum_as_trgt(&terms.contractile);
    let e_srce = sheet.sum_as_srce(&terms.elastic_srce);
    let e_trgt = sheet.sum_as_trgt(&terms.elastic_trgt);
    let a_srce = terms.anchor.as_ref().map(|a| sheet.sum_as_srce(a));
    let norm = sheet.settings().grad_norm_factor;
    sheet
        .vertices()
        .map(|v| {
            if !sheet.is_active(v) {
                return DVec3::ZERO;
            }
            let vi = v.index() as usize;
            let mut g = (t_srce[vi] - t_trgt[vi]) / 2.0 + c_srce[vi] - c_trgt[vi]
                + e_srce[vi]
                + e_trgt[vi];
            if let Some(a) = &a_srce {
                g += a[vi];
            }
            g / norm
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::{compute_energy, compute_gradient, energy_terms, gradient_terms};
    use crate::{
        element::{Handle, VH},
        geometry::{Geometry, PlanarGeometry},
        lattice::{hexagonal_sheet, interior_junctions},
        macros::assert_f64_eq,
        sheet::Sheet,
        units::ModelSpec,
    };
    use glam::DVec3;

    fn unit_spec() -> ModelSpec {
        let mut spec = ModelSpec::default();
        spec.face.vol_elasticity = Some(1.0);
        spec.face.prefered_area = Some(1.0);
        spec.face.prefered_height = Some(1.0);
        spec.face.contractility = Some(0.04);
        spec.edge.line_tension = Some(0.12);
        spec
    }

    fn model_sheet(nx: usize, ny: usize) -> (Sheet, PlanarGeometry) {
        let mut sheet = hexagonal_sheet(nx, ny).expect("Cannot build lattice");
        let geom = PlanarGeometry::default();
        unit_spec()
            .dimensionalize()
            .expect("Cannot dimensionalize")
            .apply(&mut sheet);
        geom.update_all(&mut sheet);
        (sheet, geom)
    }

    #[test]
    fn t_energy_terms_signs() {
        let (sheet, _) = model_sheet(3, 3);
        let terms = energy_terms(&sheet);
        assert!(terms.elastic >= 0.0);
        assert!(terms.contractile >= 0.0);
        assert!(terms.anchor.is_none(), "No anchoring capability requested");
        assert_f64_eq!(terms.total(), compute_energy(&sheet), 1e-12);
    }

    #[test]
    fn t_single_hexagon_energy() {
        let (sheet, _) = model_sheet(1, 1);
        let terms = energy_terms(&sheet);
        let area = 1.5 * 3.0f64.sqrt();
        // All six edges are border edges, visited once.
        assert_f64_eq!(terms.tension, 0.12 * 6.0 / 2.0, 1e-12);
        assert_f64_eq!(terms.contractile, 0.5 * 0.04 * 36.0, 1e-12);
        assert_f64_eq!(terms.elastic, 0.5 * (area - 1.0) * (area - 1.0), 1e-12);
    }

    #[test]
    fn t_dead_faces_do_not_contribute() {
        let (mut sheet, geom) = model_sheet(2, 1);
        let e2 = compute_energy(&sheet);
        sheet.set_status(1.into(), crate::FaceStatus::Dead);
        geom.update_all(&mut sheet);
        let e1 = compute_energy(&sheet);
        assert!(e1 < e2, "Killing a face must remove its terms");
        // The lone live face matches a single-cell patch.
        let (single, _) = model_sheet(1, 1);
        assert_f64_eq!(e1, compute_energy(&single), 1e-12);
    }

    #[test]
    fn t_anchor_energy_capability() {
        let (mut sheet, geom) = model_sheet(2, 2);
        sheet.create_anchors();
        unit_spec()
            .dimensionalize()
            .expect("Cannot dimensionalize")
            .apply(&mut sheet);
        geom.update_all(&mut sheet);
        let terms = energy_terms(&sheet);
        // Anchor elasticity was not specified, and relaxed tethers have zero
        // length anyway.
        assert_f64_eq!(terms.anchor.expect("Capability enabled"), 0.0, 1e-12);
        // Stretch one border vertex away from its anchor.
        let mut spec = unit_spec();
        spec.edge.anchor_elasticity = Some(10.0);
        spec.dimensionalize()
            .expect("Cannot dimensionalize")
            .apply(&mut sheet);
        let v: VH = sheet
            .vertices()
            .find(|v| sheet.at_border(*v))
            .expect("Border vertex exists");
        let pos = sheet.position(v) + DVec3::new(0.25, 0.0, 0.0);
        sheet.set_position(v, pos);
        geom.update_all(&mut sheet);
        let terms = energy_terms(&sheet);
        assert_f64_eq!(
            terms.anchor.expect("Capability enabled"),
            0.5 * 10.0 * 0.25 * 0.25,
            1e-12
        );
    }

    #[test]
    fn t_components_cover_all_halfedges() {
        let (sheet, geom) = model_sheet(2, 2);
        let terms = gradient_terms(&sheet, &geom);
        assert_eq!(terms.tension.len(), sheet.num_halfedges());
        assert_eq!(terms.contractile.len(), sheet.num_halfedges());
        assert_eq!(terms.elastic_srce.len(), sheet.num_halfedges());
        assert_eq!(terms.elastic_trgt.len(), sheet.num_halfedges());
        assert!(terms.anchor.is_none());
    }

    #[test]
    fn t_inactive_vertices_get_zero() {
        let (mut sheet, geom) = model_sheet(2, 2);
        let v: VH = 0.into();
        sheet.verts.active[0] = false;
        let grad = compute_gradient(&sheet, &geom);
        assert_eq!(grad[v.index() as usize], DVec3::ZERO);
    }

    #[test]
    fn t_gradient_matches_finite_differences() {
        let (mut sheet, geom) = model_sheet(3, 3);
        let grad = compute_gradient(&sheet, &geom);
        let delta = 1e-6;
        // Unit spec: both norm factors are one, so the finite difference of
        // the normalized energy compares directly.
        for v in [0usize, 3, 7] {
            for axis in 0..3 {
                let pos = sheet.verts.pos[v];
                let mut probe = |sign: f64| -> f64 {
                    let mut p = pos;
                    p[axis] += sign * delta;
                    sheet.verts.pos[v] = p;
                    geom.update_all(&mut sheet);
                    compute_energy(&sheet)
                };
                let fd = (probe(1.0) - probe(-1.0)) / (2.0 * delta);
                sheet.verts.pos[v] = pos;
                geom.update_all(&mut sheet);
                assert_f64_eq!(grad[v][axis], fd, 1e-6, (v, axis));
            }
        }
    }

    #[test]
    fn t_interior_junction_is_balanced() {
        // Every interior junction of a regular patch is a three-fold
        // symmetric point; the in-plane gradient cancels there regardless of
        // the parameter values.
        let (sheet, geom) = model_sheet(4, 4);
        let grad = compute_gradient(&sheet, &geom);
        let junctions = interior_junctions(&sheet);
        assert!(!junctions.is_empty());
        for v in junctions {
            let g = grad[v.index() as usize];
            assert_f64_eq!(g.x, 0.0, 1e-9, v);
            assert_f64_eq!(g.y, 0.0, 1e-9, v);
        }
    }

    #[test]
    fn t_descent_step_decreases_energy() {
        let (mut sheet, geom) = model_sheet(3, 3);
        let e0 = compute_energy(&sheet);
        let grad = compute_gradient(&sheet, &geom);
        let eta = 1e-3;
        for v in 0..sheet.num_vertices() {
            let step = grad[v] * eta;
            sheet.verts.pos[v] -= step;
        }
        geom.update_all(&mut sheet);
        let e1 = compute_energy(&sheet);
        assert!(
            e1 < e0,
            "A small step along the negative gradient must decrease energy: {e1} >= {e0}"
        );
    }
}
