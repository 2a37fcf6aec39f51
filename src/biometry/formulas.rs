//! IOL power formulas
//!
//! Six independent closed-form procedures. Each takes biometry in mm and
//! keratometry in diopters and returns the IOL power for the requested
//! target refraction.
//!
//! Every denominator is checked before division: a degenerate term yields
//! `FormulaError::UndefinedResult`, never a diopter value.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::chamber_depth::estimated_acd;
use super::geometry::{
    axial_length_correction, corneal_radius, corneal_width, optical_axial_length,
    sagittal_height,
};
use super::{finite, nonzero, FormulaError};
use crate::types::{Formula, IolPower};

// ============================================================================
// SRK/T Family
// ============================================================================

/// Aqueous/vitreous refractive index.
const SRKT_AQUEOUS_INDEX: f64 = 1.336;
/// Corneal refractive index minus one (1.333 - 1).
const SRKT_CORNEA_INDEX_M1: f64 = 0.333;
/// Spectacle vertex distance (mm).
const SRKT_VERTEX_MM: f64 = 12.0;

/// SRK/T vergence with separate ELP and vergence keratometry.
///
/// `k_elp` drives corneal width, sagittal height and the ELP estimate;
/// `k_vergence` drives the S2..S5 optics. Single-K SRK/T passes the same K
/// twice.
fn srk_t_vergence(
    formula: Formula,
    axial_length: f64,
    k_elp: f64,
    k_vergence: f64,
    a_constant: f64,
    target_refraction: f64,
) -> Result<IolPower, FormulaError> {
    let lcor = axial_length_correction(axial_length);
    let r_elp = corneal_radius(k_elp);
    let width = corneal_width(lcor, k_elp);
    let height = sagittal_height(r_elp, width);
    let acde = estimated_acd(height, a_constant);

    let r = corneal_radius(k_vergence);
    let l0 = optical_axial_length(axial_length);

    let s1 = l0 - acde;
    let s2 = SRKT_AQUEOUS_INDEX * r - SRKT_CORNEA_INDEX_M1 * acde;
    let s3 = SRKT_AQUEOUS_INDEX * r - SRKT_CORNEA_INDEX_M1 * l0;
    let s4 = SRKT_VERTEX_MM * s3 + l0 * r;
    let s5 = SRKT_VERTEX_MM * s2 + acde * r;

    let s1 = nonzero(formula, "S1", s1)?;
    let vergence = nonzero(formula, "S2 - 0.001*REFt*S5", s2 - 0.001 * target_refraction * s5)?;
    let diopters = finite(
        formula,
        1336.0 * (s3 - 0.001 * target_refraction * s4) / (s1 * vergence),
    )?;

    Ok(IolPower {
        formula,
        diopters,
        domain_clamped: height.clamped,
    })
}

/// SRK/T (single K)
///
/// Inputs: AL (mm), K (D), A-constant, target refraction REFt (D).
pub fn srk_t(
    axial_length: f64,
    k: f64,
    a_constant: f64,
    target_refraction: f64,
) -> Result<IolPower, FormulaError> {
    srk_t_vergence(Formula::SrkT, axial_length, k, k, a_constant, target_refraction)
}

/// Double-K SRK/T
///
/// ELP geometry uses `k_pre` (the posterior surface still follows the
/// pre-surgery radius ratio); the vergence optics use `k_post`. Reduces
/// exactly to [`srk_t`] when `k_pre == k_post`.
pub fn double_k_srk_t(
    axial_length: f64,
    k_pre: f64,
    k_post: f64,
    a_constant: f64,
    target_refraction: f64,
) -> Result<IolPower, FormulaError> {
    srk_t_vergence(
        Formula::DoubleKSrkT,
        axial_length,
        k_pre,
        k_post,
        a_constant,
        target_refraction,
    )
}

// ============================================================================
// Hoffer Q
// ============================================================================

/// Hoffer Q
///
/// Inputs: AL (mm), K (D), measured ACD (mm), desired refraction Rx (D).
///
/// AL is clamped to [18.5, 31] inside the chamber-depth correction only; the
/// vergence term keeps the caller's AL.
pub fn hoffer_q(
    axial_length: f64,
    k: f64,
    acd: f64,
    rx: f64,
) -> Result<IolPower, FormulaError> {
    const F: Formula = Formula::HofferQ;
    let tan_deg = |x: f64| x.to_radians().tan();

    let (m, g) = if axial_length <= 23.0 { (1.0, 28.0) } else { (-1.0, 23.5) };
    let al_cd = axial_length.clamp(18.5, 31.0);

    let cd = acd + 0.3 * (al_cd - 23.5)
        + tan_deg(k).powi(2)
        + 0.1 * m * (23.5 - al_cd).powi(2) * tan_deg(0.1 * (g - al_cd).powi(2))
        - 0.99166;

    let r = rx / nonzero(F, "1 - 0.012*Rx", 1.0 - 0.012 * rx)?;
    let elp = cd + 0.05;

    let phakic = nonzero(F, "AL - CD - 0.05", axial_length - elp)?;
    let kr = nonzero(F, "K + R", k + r)?;
    let corneal = nonzero(F, "1.336/(K+R) - (CD+0.05)/1000", 1.336 / kr - elp / 1000.0)?;

    let diopters = finite(F, 1336.0 / phakic - 1.336 / corneal)?;
    Ok(IolPower::new(F, diopters))
}

// ============================================================================
// Shammas-PL
// ============================================================================

/// Shammas-PL (no-history post-LASIK formula)
///
/// Takes the *uncorrected* post-surgery K; the formula applies its own
/// `Ks = 1.14 × Kpost - 6.8` correction.
pub fn shammas_pl(
    k_post: f64,
    axial_length: f64,
    a_constant: f64,
    rx: f64,
) -> Result<IolPower, FormulaError> {
    const F: Formula = Formula::ShammasPl;

    let ks = 1.14 * k_post - 6.8;
    let c = 0.5835 * a_constant - 64.40;
    let l = axial_length - 0.1 * (axial_length - 23.0);

    let phakic = nonzero(F, "L - 0.1(L-23) - C - 0.05", l - c - 0.05)?;
    let kr = nonzero(F, "K + R", ks + rx)?;
    let corneal = nonzero(F, "1.0125/(K+R) - (C+0.05)/1336", 1.0125 / kr - (c + 0.05) / 1336.0)?;

    let diopters = finite(F, 1336.0 / phakic - 1.0 / corneal)?;
    Ok(IolPower::new(F, diopters))
}

// ============================================================================
// Haigis / Haigis-L
// ============================================================================

const HAIGIS_AQUEOUS_INDEX: f64 = 1.336;
const HAIGIS_CORNEA_INDEX: f64 = 1.3315;
/// Vertex distance (m).
const HAIGIS_VERTEX_M: f64 = 0.012;
const HAIGIS_U: f64 = -0.241;
const HAIGIS_V: f64 = 0.139;

/// Haigis ELP regression constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HaigisConstants {
    /// Derived from the A-constant when unset.
    #[serde(default)]
    pub a0: Option<f64>,
    pub a1: f64,
    pub a2: f64,
}

impl Default for HaigisConstants {
    fn default() -> Self {
        Self {
            a0: None,
            a1: 0.400,
            a2: 0.100,
        }
    }
}

impl HaigisConstants {
    /// `a0`, falling back to `0.62467 × A - 72.434`.
    pub fn a0_for(&self, a_constant: f64) -> f64 {
        self.a0.unwrap_or(0.62467 * a_constant - 72.434)
    }

    /// Optical ACD `d` (mm).
    ///
    /// A zero ACD means "not measured" and switches to the fixed-u/v form.
    pub fn elp_mm(&self, acd: f64, axial_length: f64, a_constant: f64) -> f64 {
        let a0 = self.a0_for(a_constant);
        if acd.abs() < f64::EPSILON {
            (a0 + HAIGIS_U * self.a1) + (self.a2 + HAIGIS_V * self.a1) * axial_length
        } else {
            a0 + self.a1 * acd + self.a2 * axial_length
        }
    }
}

fn haigis_thin_lens(
    formula: Formula,
    radius_mm: f64,
    acd: f64,
    axial_length: f64,
    a_constant: f64,
    rx: f64,
    constants: &HaigisConstants,
) -> Result<IolPower, FormulaError> {
    let n = HAIGIS_AQUEOUS_INDEX;
    let d = constants.elp_mm(acd, axial_length, a_constant) / 1000.0;
    let l = axial_length / 1000.0;
    let r = nonzero(formula, "R", radius_mm / 1000.0)?;

    let dc = (HAIGIS_CORNEA_INDEX - 1.0) / r;
    let z = dc + rx / nonzero(formula, "1 - Rx*Dx", 1.0 - rx * HAIGIS_VERTEX_M)?;

    let phakic = nonzero(formula, "L - d", l - d)?;
    let z = nonzero(formula, "z", z)?;
    let corneal = nonzero(formula, "n/z - d", n / z - d)?;

    let diopters = finite(formula, n / phakic - n / corneal)?;
    Ok(IolPower::new(formula, diopters))
}

/// Haigis
///
/// Inputs: corneal radius R (mm), ACD (mm, 0 if unavailable), AL (mm),
/// A-constant, desired refraction Rx (D), ELP constants.
pub fn haigis(
    radius_mm: f64,
    acd: f64,
    axial_length: f64,
    a_constant: f64,
    rx: f64,
    constants: &HaigisConstants,
) -> Result<IolPower, FormulaError> {
    haigis_thin_lens(Formula::Haigis, radius_mm, acd, axial_length, a_constant, rx, constants)
}

/// Haigis-L radius correction for eyes after myopic refractive surgery.
pub fn haigis_l_radius(radius_mm: f64) -> Result<f64, FormulaError> {
    let denom = nonzero(Formula::HaigisL, "-5.1625*R + 81.9103", -5.1625 * radius_mm + 82.2603 - 0.35)?;
    Ok(331.5 / denom)
}

/// Haigis-L
///
/// Replaces the measured radius with [`haigis_l_radius`] and runs Haigis.
pub fn haigis_l(
    radius_mm: f64,
    acd: f64,
    axial_length: f64,
    a_constant: f64,
    rx: f64,
    constants: &HaigisConstants,
) -> Result<IolPower, FormulaError> {
    let corrected = haigis_l_radius(radius_mm)?;
    debug!(radius_mm, corrected_radius_mm = corrected, "Haigis-L radius correction");
    haigis_thin_lens(Formula::HaigisL, corrected, acd, axial_length, a_constant, rx, constants)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biometry::chamber_depth::acd_constant;

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() < tol,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_srk_t_typical_eye() {
        let p = srk_t(23.5, 44.0, 118.4, -0.5).unwrap();
        assert_eq!(p.formula, Formula::SrkT);
        assert!(!p.domain_clamped);
        assert_close(p.diopters, 20.759_993_673_282_81, 1e-9);
    }

    #[test]
    fn test_double_k_golden() {
        let p = double_k_srk_t(23.5, 44.0, 42.0, 118.4, -0.5).unwrap();
        assert_eq!(p.formula, Formula::DoubleKSrkT);
        assert_close(p.diopters, 23.576_924_651_796_72, 1e-9);
    }

    #[test]
    fn test_double_k_flatter_post_k_needs_more_power() {
        let single = srk_t(23.5, 44.0, 118.4, -0.5).unwrap();
        let double = double_k_srk_t(23.5, 44.0, 42.0, 118.4, -0.5).unwrap();
        assert!(double.diopters > single.diopters);
    }

    #[test]
    fn test_srk_t_flags_clamped_geometry() {
        let p = srk_t(30.0, 55.0, 118.4, 0.0).unwrap();
        assert!(p.domain_clamped);
        assert!(p.diopters.is_finite());
    }

    #[test]
    fn test_srk_t_degenerate_s1_fails() {
        // Choose A so that the ELP lands exactly on the optical axial length
        let (al, k) = (23.5, 44.0);
        let h = sagittal_height(corneal_radius(k), corneal_width(axial_length_correction(al), k));
        let target_acd_const = optical_axial_length(al) - h.height_mm + 3.3357;
        let a = (target_acd_const + 68.74709) / 0.62467;
        assert_close(acd_constant(a), target_acd_const, 1e-9);

        let err = srk_t(al, k, a, 0.0).unwrap_err();
        assert!(matches!(err, FormulaError::UndefinedResult { term: "S1", .. }));
    }

    #[test]
    fn test_srk_t_zero_k_is_error_not_value() {
        assert!(srk_t(23.5, 0.0, 118.4, 0.0).is_err());
    }

    #[test]
    fn test_hoffer_q_branch_boundary() {
        let short = hoffer_q(23.0, 44.0, 3.2, 0.0).unwrap();
        let long = hoffer_q(23.01, 44.0, 3.2, 0.0).unwrap();
        assert_close(short.diopters, 18.041_579_323_245_85, 1e-9);
        assert_close(long.diopters, 18.011_019_158_239_698, 1e-9);
        assert!((short.diopters - long.diopters).abs() < 0.1);
    }

    #[test]
    fn test_hoffer_q_clamp_only_in_chamber_depth() {
        // 35 mm is clamped to 31 in CD, but the phakic term keeps 35 mm
        let p = hoffer_q(35.0, 43.0, 3.5, 0.0).unwrap();
        assert_close(p.diopters, -6.773_808_709_672_146, 1e-9);
    }

    #[test]
    fn test_hoffer_q_vertex_singularity_fails() {
        let err = hoffer_q(23.5, 44.0, 3.2, 1.0 / 0.012).unwrap_err();
        assert!(matches!(err, FormulaError::UndefinedResult { term: "1 - 0.012*Rx", .. }));
    }

    #[test]
    fn test_shammas_pl_golden() {
        let p = shammas_pl(40.0, 24.0, 118.4, -0.5).unwrap();
        assert_close(p.diopters, 26.029_870_969_649_8, 1e-9);
    }

    #[test]
    fn test_shammas_pl_zero_vergence_fails() {
        // Ks + R == 0
        let k_post = 6.8 / 1.14;
        assert!(shammas_pl(k_post, 24.0, 118.4, 0.0).is_err());
    }

    #[test]
    fn test_haigis_golden() {
        let p = haigis(7.45, 2.69, 21.44, 118.0, -0.25, &HaigisConstants::default()).unwrap();
        assert_close(p.diopters, 26.862_013_443_355_53, 1e-9);
    }

    #[test]
    fn test_haigis_without_acd_uses_fixed_regression() {
        let p = haigis(7.8, 0.0, 23.5, 118.0, 0.0, &HaigisConstants::default()).unwrap();
        assert_close(p.diopters, 21.357_211_178_276_685, 1e-9);
    }

    #[test]
    fn test_haigis_explicit_a0_overrides_a_constant() {
        let constants = HaigisConstants {
            a0: Some(1.25),
            ..Default::default()
        };
        let a = haigis(7.8, 3.0, 23.5, 110.0, 0.0, &constants).unwrap();
        let b = haigis(7.8, 3.0, 23.5, 120.0, 0.0, &constants).unwrap();
        assert_eq!(a.diopters, b.diopters);
    }

    #[test]
    fn test_haigis_vertex_singularity_fails() {
        let err = haigis(7.8, 3.0, 23.5, 118.0, 1.0 / 0.012, &HaigisConstants::default())
            .unwrap_err();
        assert!(matches!(err, FormulaError::UndefinedResult { formula: Formula::Haigis, .. }));
    }

    #[test]
    fn test_haigis_l_golden() {
        let rc = haigis_l_radius(7.45).unwrap();
        assert_close(rc, 7.629_516_216_174_229, 1e-9);

        let p = haigis_l(7.45, 2.69, 21.44, 118.0, -0.25, &HaigisConstants::default()).unwrap();
        assert_eq!(p.formula, Formula::HaigisL);
        assert_close(p.diopters, 28.301_535_818_183_673, 1e-9);

        let via_haigis = haigis(rc, 2.69, 21.44, 118.0, -0.25, &HaigisConstants::default()).unwrap();
        assert_close(via_haigis.diopters, p.diopters, 1e-12);
    }
}
