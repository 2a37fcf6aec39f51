//! BESSt formula selector
//!
//! Derives net corneal power from measured front/back radii and central
//! thickness with Gaussian thick-lens optics, then dispatches to Hoffer Q or
//! SRK/T.
//!
//! Dispatch rule: short eyes (AL ≤ 22.0 mm) and eyes whose SRK/T sagittal
//! geometry would be undefined for the derived K go to Hoffer Q. Everything
//! else goes to SRK/T.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::formulas::{hoffer_q, srk_t};
use super::geometry::{
    axial_length_correction, corneal_power, corneal_radius, corneal_width, sagittal_discriminant,
};
use super::{nonzero, FormulaError};
use crate::types::{Formula, IolPower};

const AIR_INDEX: f64 = 1.0;
const AQUEOUS_INDEX: f64 = 1.336;
/// Fictitious index of a virgin cornea.
const VIRGIN_CORNEA_INDEX: f64 = 1.3265;
/// Index increment per micrometre of central corneal thickness.
const CCT_INDEX_PER_UM: f64 = 0.000_022;

/// AL at or below which BESSt always uses Hoffer Q (mm).
pub const BESST_SHORT_EYE_MM: f64 = 22.0;

/// Corneal power derived by BESSt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BesstCornealPower {
    /// CCT- and power-band-adjusted corneal index.
    pub adjusted_index: f64,
    /// Net power with the adjusted index; this is what the formulas consume.
    pub k: f64,
    /// Net power with the virgin-cornea index. Diagnostic only.
    pub virgin_k: f64,
}

/// Which formula BESSt dispatched to, and why.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BesstDispatch {
    /// AL ≤ 22.0 mm.
    HofferQShortEye,
    /// SRK/T sagittal discriminant negative for the BESSt K.
    HofferQInvalidGeometry,
    SrkT,
}

impl BesstDispatch {
    pub fn formula(&self) -> Formula {
        match self {
            Self::HofferQShortEye | Self::HofferQInvalidGeometry => Formula::HofferQ,
            Self::SrkT => Formula::SrkT,
        }
    }
}

/// Corneal index adjusted for CCT and the converted front-surface power band.
fn adjusted_index(front_radius_mm: f64, cct_um: f64) -> f64 {
    let n_cct = VIRGIN_CORNEA_INDEX + cct_um * CCT_INDEX_PER_UM;
    let k_conv = corneal_power(front_radius_mm);

    if k_conv < 37.5 {
        n_cct + 0.017
    } else if k_conv < 41.44 {
        n_cct
    } else if k_conv < 45.0 {
        n_cct - 0.015
    } else {
        n_cct
    }
}

/// Gaussian thick-lens power `F1 + F2 - (t/n_vc)·F1·F2` (D), radii in mm.
///
/// `index` sets the surface powers only; the reduced thickness always uses
/// the virgin-cornea index.
fn thick_lens_power(front_radius_mm: f64, back_radius_mm: f64, thickness_m: f64, index: f64) -> f64 {
    let f1 = (index - AIR_INDEX) / (front_radius_mm / 1000.0);
    let f2 = (AQUEOUS_INDEX - index) / (back_radius_mm / 1000.0);
    let reduced_thickness_m = thickness_m / VIRGIN_CORNEA_INDEX;
    f1 + f2 - reduced_thickness_m * f1 * f2
}

/// Net corneal power from front/back radii (mm) and CCT (µm).
pub fn besst_corneal_power(
    front_radius_mm: f64,
    back_radius_mm: f64,
    cct_um: f64,
) -> Result<BesstCornealPower, FormulaError> {
    nonzero(Formula::Besst, "rF", front_radius_mm)?;
    nonzero(Formula::Besst, "rB", back_radius_mm)?;

    let thickness_m = cct_um / 1_000_000.0;
    let n_adj = adjusted_index(front_radius_mm, cct_um);

    Ok(BesstCornealPower {
        adjusted_index: n_adj,
        k: thick_lens_power(front_radius_mm, back_radius_mm, thickness_m, n_adj),
        virgin_k: thick_lens_power(front_radius_mm, back_radius_mm, thickness_m, VIRGIN_CORNEA_INDEX),
    })
}

/// Decide which formula BESSt should hand off to.
pub fn besst_dispatch(axial_length: f64, k: f64) -> BesstDispatch {
    if axial_length <= BESST_SHORT_EYE_MM {
        return BesstDispatch::HofferQShortEye;
    }

    let width = corneal_width(axial_length_correction(axial_length), k);
    if sagittal_discriminant(corneal_radius(k), width) < 0.0 {
        BesstDispatch::HofferQInvalidGeometry
    } else {
        BesstDispatch::SrkT
    }
}

/// BESSt
///
/// Inputs: front radius rF (mm), back radius rB (mm), CCT (µm), AL (mm),
/// ACD (mm), A-constant, desired refraction Rx (D).
///
/// The returned `IolPower::formula` names the formula actually used.
pub fn besst(
    front_radius_mm: f64,
    back_radius_mm: f64,
    cct_um: f64,
    axial_length: f64,
    acd: f64,
    a_constant: f64,
    rx: f64,
) -> Result<IolPower, FormulaError> {
    let cornea = besst_corneal_power(front_radius_mm, back_radius_mm, cct_um)?;
    let dispatch = besst_dispatch(axial_length, cornea.k);

    debug!(
        k = cornea.k,
        virgin_k = cornea.virgin_k,
        axial_length,
        ?dispatch,
        "BESSt dispatch"
    );

    match dispatch {
        BesstDispatch::SrkT => srk_t(axial_length, cornea.k, a_constant, rx),
        BesstDispatch::HofferQShortEye | BesstDispatch::HofferQInvalidGeometry => {
            hoffer_q(axial_length, cornea.k, acd, rx)
        }
    }
}
