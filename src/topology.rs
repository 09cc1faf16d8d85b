/*!
Topology changing operations: the type 1 transition that exchanges cell
neighbors across a junction, and cell division that splits a face in two.

Both operations validate all their preconditions before touching any table, so
a failed call leaves the sheet exactly as it was. Both leave the derived
geometric columns stale; run
[`Geometry::update_all`](crate::geometry::Geometry::update_all) afterwards.
*/

use crate::{
    element::{FH, FaceStatus, HH, Handle, VH},
    error::Error,
    sheet::Sheet,
};
use log::debug;

impl Sheet {
    /// Performs a type 1 transition on the junction carried by `h`.
    ///
    /// The edge rotates in place: the two faces sharing it lose a side and
    /// drift apart, while the two faces meeting it at its endpoints gain a
    /// side and become neighbors. Exactly six halfedges are relinked; no row
    /// is created or removed, and `h` keeps its endpoints while changing its
    /// owning face.
    ///
    /// Fails with [`Error::BorderHalfedge`] when the junction touches the
    /// tissue border, [`Error::DeadFace`] when either sharing face is dead,
    /// and [`Error::DegenerateFace`] when either sharing face is a triangle
    /// that the flip would reduce below three sides.
    pub fn type1_transition(&mut self, h: HH) -> Result<(), Error> {
        let fb = self.face(h).ok_or(Error::BorderHalfedge(h))?;
        let oh = self.opposite(h).ok_or(Error::BorderHalfedge(h))?;
        let fd = self.face(oh).ok_or(Error::BorderHalfedge(oh))?;
        if !self.status(fb).is_alive() {
            return Err(Error::DeadFace(fb));
        }
        if !self.status(fd).is_alive() {
            return Err(Error::DeadFace(fd));
        }
        if self.face_valence(fb) < 4 {
            return Err(Error::DegenerateFace(fb));
        }
        if self.face_valence(fd) < 4 {
            return Err(Error::DegenerateFace(fd));
        }
        let nb = self.next_in_face(h)?;
        let nd = self.next_in_face(oh)?;
        // The inbound halfedges of the two faces about to gain the junction.
        let a_in = self.opposite(nd).ok_or(Error::BorderHalfedge(nd))?;
        let c_in = self.opposite(nb).ok_or(Error::BorderHalfedge(nb))?;
        let fa = self.face(a_in).ok_or(Error::BorderHalfedge(a_in))?;
        let fc = self.face(c_in).ok_or(Error::BorderHalfedge(c_in))?;
        let (v0, v1) = (self.srce(h), self.trgt(h));
        debug!("type 1 transition on {h} between {v0} and {v1}");
        self.edges.face[h.index() as usize] = Some(fc);
        self.edges.face[oh.index() as usize] = Some(fa);
        self.edges.srce[nb.index() as usize] = v0;
        self.edges.srce[nd.index() as usize] = v1;
        self.edges.trgt[a_in.index() as usize] = v1;
        self.edges.trgt[c_in.index() as usize] = v0;
        debug_assert!(self.check().is_ok());
        Ok(())
    }

    /// Divides face `f` in two along the axis joining the midpoints of the
    /// most distant pair of non-adjacent interior edges.
    ///
    /// The two chosen edges are split at their midpoints, introducing the
    /// vertices returned alongside the daughter face, and a membrane edge
    /// pair joins the two new vertices. The daughter inherits the mother's
    /// mechanical parameters; with `halve_prefered` the prefered volume of
    /// both is halved, so the tissue's total target volume is conserved. New
    /// halfedges copy the line tension of the edge they split off from.
    ///
    /// Adds exactly one face, two vertices and six halfedges. Fails with
    /// [`Error::DeadFace`] on a dead face and [`Error::NoDivisionAxis`] when
    /// fewer than two non-adjacent edges of the face have an opposite.
    pub fn cell_division(
        &mut self,
        f: FH,
        halve_prefered: bool,
    ) -> Result<(FH, VH, VH), Error> {
        if !self.status(f).is_alive() {
            return Err(Error::DeadFace(f));
        }
        let cycle = self.face_cycle(f)?;
        let n = cycle.len();
        let midpoint = |sheet: &Sheet, h: HH| {
            (sheet.position(sheet.srce(h)) + sheet.position(sheet.trgt(h))) / 2.0
        };
        let mut best: Option<(usize, usize, f64)> = None;
        for p in 0..n {
            if self.opposite(cycle[p]).is_none() {
                continue;
            }
            for q in (p + 2)..n {
                if p == 0 && q == n - 1 {
                    // Adjacent through the wrap-around.
                    continue;
                }
                if self.opposite(cycle[q]).is_none() {
                    continue;
                }
                let dist = midpoint(self, cycle[p]).distance(midpoint(self, cycle[q]));
                if best.is_none_or(|(_, _, d)| dist > d) {
                    best = Some((p, q, dist));
                }
            }
        }
        let Some((p, q, _)) = best else {
            return Err(Error::NoDivisionAxis(f));
        };
        let (ha, hb) = (cycle[p], cycle[q]);
        let oa = self.opposite(ha).ok_or(Error::BorderHalfedge(ha))?;
        let ob = self.opposite(hb).ok_or(Error::BorderHalfedge(hb))?;
        let (sa, ta) = (self.srce(ha), self.trgt(ha));
        let (sb, tb) = (self.srce(hb), self.trgt(hb));
        debug!("dividing {f} between {ha} and {hb}");
        let (mid_a, mid_b) = (midpoint(self, ha), midpoint(self, hb));
        let wa = self.verts.push(mid_a, true, false, false);
        let wb = self.verts.push(mid_b, true, false, false);
        let fi = f.index() as usize;
        let (kv, v0, gamma) = (
            self.faces.vol_elasticity[fi],
            self.faces.prefered_vol[fi],
            self.faces.contractility[fi],
        );
        let f2 = self.faces.push(FaceStatus::Alive, kv, v0, gamma);
        if halve_prefered {
            self.faces.prefered_vol[fi] /= 2.0;
            self.faces.prefered_vol[f2.index() as usize] /= 2.0;
        }
        // Split both chosen edges at the new vertices, on both sides.
        let (cell, tension_a) = (self.cell(ha), self.line_tension(ha));
        let (cell_b, tension_b) = (self.cell(hb), self.line_tension(hb));
        let (oa_face, oa_cell, oa_tension) =
            (self.face(oa), self.cell(oa), self.line_tension(oa));
        let (ob_face, ob_cell, ob_tension) =
            (self.face(ob), self.cell(ob), self.line_tension(ob));
        self.edges.trgt[ha.index() as usize] = wa;
        self.edges.push(wa, ta, Some(f), cell, tension_a);
        self.edges.trgt[oa.index() as usize] = wa;
        self.edges.push(wa, sa, oa_face, oa_cell, oa_tension);
        self.edges.trgt[hb.index() as usize] = wb;
        self.edges.push(wb, tb, Some(f2), cell_b, tension_b);
        self.edges.trgt[ob.index() as usize] = wb;
        self.edges.push(wb, sb, ob_face, ob_cell, ob_tension);
        // The membrane pair separating the daughters.
        self.edges.push(wb, wa, Some(f), cell, tension_a);
        self.edges.push(wa, wb, Some(f2), cell, tension_a);
        // Hand the far arc of the mother's cycle over to the daughter.
        for h in cycle[(q + 1)..].iter().chain(cycle[..p].iter()) {
            self.edges.face[h.index() as usize] = Some(f2);
        }
        self.edges.face[ha.index() as usize] = Some(f2);
        debug_assert_eq!(self.face_valence(f), q - p + 2);
        debug_assert_eq!(self.face_valence(f2), n - (q - p) + 2);
        debug_assert!(self.check().is_ok());
        Ok((f2, wa, wb))
    }
}
