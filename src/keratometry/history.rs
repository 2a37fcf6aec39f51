//! Clinical history method (CHM)
//!
//! Post-surgery corneal power is reconstructed from the pre-surgery K and
//! the refractive change, then used as `Kpost` in Double-K SRK/T.
//!
//! SIRC is pre-op minus post-op refraction, the same convention as
//! `true_k_sirc` and the Awwad and Masket corrections: a myopic ablation has
//! a negative SIRC and flattens the cornea.

use crate::biometry::{double_k_srk_t, FormulaError};
use crate::types::IolPower;

/// `Kpost = Kpre + SIRC`, with SIRC = pre-op minus post-op refraction.
pub fn chm_k_post(k_pre: f64, sirc: f64) -> f64 {
    k_pre + sirc
}

/// Double-K SRK/T with a CHM-derived `Kpost`.
pub fn double_k_srk_t_chm(
    axial_length: f64,
    k_pre: f64,
    sirc: f64,
    a_constant: f64,
    target_refraction: f64,
) -> Result<IolPower, FormulaError> {
    double_k_srk_t(
        axial_length,
        k_pre,
        chm_k_post(k_pre, sirc),
        a_constant,
        target_refraction,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keratometry::{delta_iol_masket, true_k_sirc, SircMethod};

    #[test]
    fn test_chm_substitutes_k_post() {
        let via_chm = double_k_srk_t_chm(23.5, 44.0, -3.0, 118.4, -0.5).unwrap();
        let direct = double_k_srk_t(23.5, 44.0, 41.0, 118.4, -0.5).unwrap();
        assert_eq!(via_chm.diopters, direct.diopters);
        assert!((via_chm.diopters - 24.966_200_364_550_296).abs() < 1e-9);
    }

    #[test]
    fn test_myopic_ablation_flattens_like_other_corrections() {
        // -4 D myopic treatment on a 46 D cornea reading 42 D afterwards
        let sirc = -4.0;
        let chm = chm_k_post(46.0, sirc);
        assert!((chm - 42.0).abs() < 1e-12);
        assert!(chm < 46.0);
        assert!(true_k_sirc(42.0, sirc, SircMethod::A).unwrap() < 42.0);
        // Flatter cornea needs more IOL power
        assert!(delta_iol_masket(sirc) > 0.0);
    }

    #[test]
    fn test_hyperopic_ablation_steepens() {
        assert!(chm_k_post(42.0, 2.5) > 42.0);
    }

    #[test]
    fn test_zero_sirc_is_plain_srk_t() {
        let chm = double_k_srk_t_chm(24.0, 43.0, 0.0, 118.7, 0.0).unwrap();
        let single = crate::biometry::srk_t(24.0, 43.0, 118.7, 0.0).unwrap();
        assert_eq!(chm.diopters, single.diopters);
    }
}
