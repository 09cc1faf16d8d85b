use crate::{
    error::Error,
    sheet::{Settings, Sheet},
};
use serde::{Deserialize, Serialize};

/**
 * Dimensionless face parameters of the model specification.
 */
#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceSpec {
    pub vol_elasticity: Option<f64>,
    pub prefered_area: Option<f64>,
    pub prefered_height: Option<f64>,
    pub contractility: Option<f64>,
}

/**
 * Dimensionless halfedge parameters of the model specification. The anchor
 * elasticity is only meaningful on sheets with the anchoring capability.
 */
#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeSpec {
    pub line_tension: Option<f64>,
    pub anchor_elasticity: Option<f64>,
}

/**
 * Dimensionless mechanical parameters, typically deserialized from a
 * parameter file. All required entries must be present before the
 * specification can be dimensionalized.
 */
#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSpec {
    pub face: FaceSpec,
    pub edge: EdgeSpec,
}

#[derive(Copy, Clone, Debug)]
pub struct DimFaceSpec {
    pub vol_elasticity: f64,
    pub prefered_vol: f64,
    pub contractility: f64,
}

#[derive(Copy, Clone, Debug)]
pub struct DimEdgeSpec {
    pub line_tension: f64,
    pub anchor_elasticity: Option<f64>,
}

/**
 * Physically scaled mechanical parameters together with the derived
 * normalization constants. Produced by [`ModelSpec::dimensionalize`]; apply
 * to a sheet with [`DimModelSpec::apply`].
 */
#[derive(Copy, Clone, Debug)]
pub struct DimModelSpec {
    pub face: DimFaceSpec,
    pub edge: DimEdgeSpec,
    pub settings: Settings,
}

impl ModelSpec {
    /// Scales the dimensionless parameters by the volumetric elasticity and
    /// the prefered area and height, and derives the normalization constants.
    ///
    /// Pure: the input specification is left untouched. Fails with
    /// [`Error::MissingParameter`] if a required entry is absent, and with
    /// [`Error::NonPositiveNormFactor`] if the derived constants are not
    /// strictly positive; either would poison every later energy evaluation
    /// through the normalization divisions.
    pub fn dimensionalize(&self) -> Result<DimModelSpec, Error> {
        let kv = self
            .face
            .vol_elasticity
            .ok_or(Error::MissingParameter("face.vol_elasticity"))?;
        let a0 = self
            .face
            .prefered_area
            .ok_or(Error::MissingParameter("face.prefered_area"))?;
        let h0 = self
            .face
            .prefered_height
            .ok_or(Error::MissingParameter("face.prefered_height"))?;
        let gamma = self
            .face
            .contractility
            .ok_or(Error::MissingParameter("face.contractility"))?;
        let lambda = self
            .edge
            .line_tension
            .ok_or(Error::MissingParameter("edge.line_tension"))?;
        let grad_norm_factor = kv * a0.powf(1.5) * h0 * h0;
        let nrj_norm_factor = kv * (a0 * h0) * (a0 * h0);
        if !(grad_norm_factor > 0.0) {
            return Err(Error::NonPositiveNormFactor(
                "grad_norm_factor",
                grad_norm_factor,
            ));
        }
        if !(nrj_norm_factor > 0.0) {
            return Err(Error::NonPositiveNormFactor(
                "nrj_norm_factor",
                nrj_norm_factor,
            ));
        }
        Ok(DimModelSpec {
            face: DimFaceSpec {
                vol_elasticity: kv,
                prefered_vol: a0 * h0,
                contractility: gamma * kv * a0 * h0 * h0,
            },
            edge: DimEdgeSpec {
                line_tension: lambda * kv * a0.powf(1.5) * h0 * h0,
                anchor_elasticity: self.edge.anchor_elasticity.map(|ka| ka * kv * a0 * h0 * h0),
            },
            settings: Settings {
                grad_norm_factor,
                nrj_norm_factor,
            },
        })
    }
}

impl DimModelSpec {
    /// Broadcasts the scaled parameters into the mesh columns and stores the
    /// normalization constants in the sheet settings.
    ///
    /// The anchor elasticity is written only when the sheet carries the
    /// anchoring capability; its absence is a capability flag, not an error.
    pub fn apply(&self, sheet: &mut Sheet) {
        sheet.faces.vol_elasticity.fill(self.face.vol_elasticity);
        sheet.faces.prefered_vol.fill(self.face.prefered_vol);
        sheet.faces.contractility.fill(self.face.contractility);
        sheet.edges.line_tension.fill(self.edge.line_tension);
        if let (Some(anchors), Some(ka)) =
            (&mut sheet.edges.anchors, self.edge.anchor_elasticity)
        {
            anchors.elasticity.fill(ka);
        }
        sheet.settings = self.settings;
    }
}

#[cfg(test)]
mod test {
    use super::ModelSpec;
    use crate::{error::Error, macros::assert_f64_eq};

    fn spec(kv: f64, a0: f64, h0: f64, gamma: f64, lambda: f64) -> ModelSpec {
        let mut spec = ModelSpec::default();
        spec.face.vol_elasticity = Some(kv);
        spec.face.prefered_area = Some(a0);
        spec.face.prefered_height = Some(h0);
        spec.face.contractility = Some(gamma);
        spec.edge.line_tension = Some(lambda);
        spec
    }

    #[test]
    fn t_unit_scales_are_identity() {
        let dim = spec(1.0, 1.0, 1.0, 0.12, 0.04)
            .dimensionalize()
            .expect("Cannot dimensionalize");
        assert_f64_eq!(dim.face.contractility, 0.12);
        assert_f64_eq!(dim.edge.line_tension, 0.04);
        assert_f64_eq!(dim.face.prefered_vol, 1.0);
        assert_f64_eq!(dim.settings.grad_norm_factor, 1.0);
        assert_f64_eq!(dim.settings.nrj_norm_factor, 1.0);
    }

    #[test]
    fn t_scaling_formulas() {
        let (kv, a0, h0) = (2.0, 4.0, 3.0);
        let mut raw = spec(kv, a0, h0, 0.1, 0.2);
        raw.edge.anchor_elasticity = Some(0.5);
        let dim = raw.dimensionalize().expect("Cannot dimensionalize");
        assert_f64_eq!(dim.face.contractility, 0.1 * kv * a0 * h0 * h0, 1e-12);
        assert_f64_eq!(dim.face.prefered_vol, a0 * h0, 1e-12);
        assert_f64_eq!(dim.edge.line_tension, 0.2 * kv * a0.powf(1.5) * h0 * h0, 1e-12);
        assert_f64_eq!(
            dim.edge.anchor_elasticity.expect("Anchor parameter present"),
            0.5 * kv * a0 * h0 * h0,
            1e-12
        );
        assert_f64_eq!(
            dim.settings.grad_norm_factor,
            kv * a0.powf(1.5) * h0 * h0,
            1e-12
        );
        assert_f64_eq!(
            dim.settings.nrj_norm_factor,
            kv * (a0 * h0) * (a0 * h0),
            1e-12
        );
    }

    #[test]
    fn t_missing_parameter() {
        let mut raw = spec(1.0, 1.0, 1.0, 0.1, 0.1);
        raw.face.contractility = None;
        assert!(matches!(
            raw.dimensionalize(),
            Err(Error::MissingParameter("face.contractility"))
        ));
    }

    #[test]
    fn t_non_positive_factor() {
        assert!(matches!(
            spec(0.0, 1.0, 1.0, 0.1, 0.1).dimensionalize(),
            Err(Error::NonPositiveNormFactor("grad_norm_factor", _))
        ));
        assert!(matches!(
            spec(1.0, -1.0, 1.0, 0.1, 0.1).dimensionalize(),
            Err(Error::NonPositiveNormFactor(_, _))
        ));
    }

    #[test]
    fn t_spec_deserializes_with_defaults() {
        let raw: ModelSpec = serde_json::from_str(
            r#"{"face": {"vol_elasticity": 1.0, "prefered_area": 1.0,
                "prefered_height": 1.0, "contractility": 0.04},
                "edge": {"line_tension": 0.12}}"#,
        )
        .expect("Cannot parse parameter file");
        assert!(raw.edge.anchor_elasticity.is_none());
        let dim = raw.dimensionalize().expect("Cannot dimensionalize");
        assert_f64_eq!(dim.face.contractility, 0.04);
        assert!(dim.edge.anchor_elasticity.is_none());
    }
}
