use crate::{
    element::{Handle, VH},
    error::Error,
    sheet::Sheet,
};
use std::collections::HashSet;

impl Sheet {
    /// Verifies the structural invariants of the sheet.
    ///
    /// Checked invariants: every halfedge references vertices and faces inside
    /// the tables; the (source, target, face) triple and the directed
    /// (source, target) pair are unique across halfedges; the halfedges of
    /// every live face chain into exactly one closed cycle of at least three
    /// sides. Dead faces are skipped; their rows are retained storage.
    pub fn check(&self) -> Result<(), Error> {
        let nv = self.num_vertices() as u32;
        let nf = self.num_faces() as u32;
        let mut triples: HashSet<(u32, u32, u32)> = HashSet::with_capacity(self.num_halfedges());
        let mut pairs: HashSet<(u32, u32)> = HashSet::with_capacity(self.num_halfedges());
        for h in self.halfedges() {
            let s = self.srce(h).index();
            let t = self.trgt(h).index();
            if s >= nv {
                return Err(Error::InvalidVertex(s));
            }
            if t >= nv {
                return Err(Error::InvalidVertex(t));
            }
            let f = match self.face(h) {
                Some(f) if f.index() >= nf => return Err(Error::InvalidFace(f.index())),
                Some(f) => f.index(),
                // Sentinel for anchor tethers; they still take part in the
                // uniqueness checks.
                None => u32::MAX,
            };
            if !triples.insert((s, t, f)) || !pairs.insert((s, t)) {
                return Err(Error::DuplicateHalfedge(VH::from(s)));
            }
        }
        for f in self.faces().filter(|f| self.status(*f).is_alive()) {
            self.face_cycle(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::{
        element::Handle,
        error::Error,
        sheet::test::two_quads,
    };

    #[test]
    fn t_two_quads_check() {
        let sheet = two_quads();
        sheet.check().expect("Freshly built sheet must pass");
    }

    #[test]
    fn t_check_rejects_broken_loop() {
        let mut sheet = two_quads();
        // Point one boundary halfedge of f0 at the wrong target.
        let h = sheet
            .find_halfedge(0.into(), 1.into())
            .expect("Cannot find halfedge");
        sheet.edges.trgt[h.index() as usize] = 5.into();
        assert!(matches!(
            sheet.check(),
            Err(Error::BrokenFaceLoop(_)) | Err(Error::DuplicateHalfedge(_))
        ));
    }

    #[test]
    fn t_check_rejects_duplicate_triple() {
        let mut sheet = two_quads();
        let h = sheet
            .find_halfedge(0.into(), 1.into())
            .expect("Cannot find halfedge");
        let srce = sheet.srce(h);
        let trgt = sheet.trgt(h);
        let face = sheet.face(h);
        sheet.edges.push(srce, trgt, face, None, 0.0);
        assert!(matches!(sheet.check(), Err(Error::DuplicateHalfedge(_))));
    }

    #[test]
    fn t_check_skips_dead_faces() {
        let mut sheet = two_quads();
        sheet.set_status(0.into(), crate::FaceStatus::Dead);
        // Break the dead face's loop; check must not complain.
        let h = sheet
            .find_halfedge(3.into(), 0.into())
            .expect("Cannot find halfedge");
        sheet.edges.face[h.index() as usize] = None;
        sheet.check().expect("Dead faces are not validated");
    }
}
