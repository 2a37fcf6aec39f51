//! True corneal power from surgical history
//!
//! Devices report SimK through the fictitious index 1.3375. After an
//! anterior-only ablation the anterior/posterior radius ratio behind that
//! index no longer holds, so the reading has to be split into its surfaces.
//!
//! Sign convention: `posterior = SimK - anterior` (negative for a normal
//! cornea). Do not mix with the `anterior - SimK` form.

use serde::{Deserialize, Serialize};

use super::CorrectionError;
use crate::biometry::DENOMINATOR_EPSILON;

/// True stromal index minus one.
pub const STROMAL_INDEX_M1: f64 = 0.376;
/// Keratometric index minus one (1.3375 - 1).
pub const KERATOMETRIC_INDEX_M1: f64 = 0.3375;

/// True anterior-surface power `SimK × 0.376 / 0.3375`.
pub fn anterior_power(sim_k: f64) -> f64 {
    sim_k * STROMAL_INDEX_M1 / KERATOMETRIC_INDEX_M1
}

/// Posterior-surface power implied by a SimK reading.
pub fn posterior_power(sim_k: f64) -> f64 {
    sim_k - anterior_power(sim_k)
}

/// Net corneal power from paired pre/post SimK.
///
/// The anterior surface comes from the post-op reading; the posterior surface
/// is assumed untouched and comes from the pre-op reading.
pub fn true_k(preop_sim_k: f64, postop_sim_k: f64) -> f64 {
    anterior_power(postop_sim_k) + posterior_power(preop_sim_k)
}

/// Published coefficient pairs for the post-surgery keratometric index
/// `n_post = c0 + c1 × SIRC`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SircMethod {
    A,
    B,
    C,
}

impl SircMethod {
    pub fn coefficients(&self) -> (f64, f64) {
        match self {
            Self::A => (1.338, 0.000_985_6),
            Self::B => (1.3319, 0.001_13),
            Self::C => (1.3375, 0.0014),
        }
    }
}

impl std::str::FromStr for SircMethod {
    type Err = CorrectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a" => Ok(Self::A),
            "b" => Ok(Self::B),
            "c" => Ok(Self::C),
            other => Err(CorrectionError::InvalidArgument(format!(
                "unknown SIRC method '{other}' (expected a, b or c)"
            ))),
        }
    }
}

/// Corrected corneal power from SimK and the surgically induced refractive
/// change: `(n_post - 1) / ((1.3375 - 1) / SimK)`.
///
/// A zero or non-finite SimK leaves the radius term undefined and is
/// rejected.
pub fn true_k_sirc(sim_k: f64, sirc: f64, method: SircMethod) -> Result<f64, CorrectionError> {
    if !sim_k.is_finite() || sim_k.abs() < DENOMINATOR_EPSILON {
        return Err(CorrectionError::UndefinedResult {
            term: "SimK",
            value: sim_k,
        });
    }
    let (c0, c1) = method.coefficients();
    let n_post = c0 + c1 * sirc;
    Ok((n_post - 1.0) / (KERATOMETRIC_INDEX_M1 / sim_k))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_posterior_is_simk_minus_anterior() {
        for k in [35.0, 40.5, 44.0, 47.25, 52.0] {
            assert_eq!(posterior_power(k), k - anterior_power(k));
            assert!(posterior_power(k) < 0.0);
        }
    }

    #[test]
    fn test_true_k_is_identity_without_surgery() {
        for k in [38.0, 42.0, 44.0, 46.5] {
            assert!((true_k(k, k) - k).abs() < 1e-12);
        }
    }

    #[test]
    fn test_true_k_after_myopic_ablation() {
        // 46.7911 + (44 - 49.0193) = 41.7719
        let k = true_k(44.0, 42.0);
        assert!((k - 41.771_851_851_851_85).abs() < 1e-9, "got {k}");
        assert!(k < 42.0);
    }

    #[test]
    fn test_true_k_sirc_methods() {
        let cases = [
            (SircMethod::A, 41.571_612_444_444_46),
            (SircMethod::B, 40.740_622_222_222_22),
            (SircMethod::C, 41.303_111_111_111_086),
        ];
        for (method, expected) in cases {
            let k = true_k_sirc(42.0, -4.0, method).unwrap();
            assert!((k - expected).abs() < 1e-9, "{method:?}: got {k}");
        }
    }

    #[test]
    fn test_true_k_sirc_rejects_zero_sim_k() {
        for sim_k in [0.0, 1e-12, f64::NAN] {
            assert!(matches!(
                true_k_sirc(sim_k, -4.0, SircMethod::A),
                Err(CorrectionError::UndefinedResult { term: "SimK", .. })
            ));
        }
    }

    #[test]
    fn test_sirc_method_parse() {
        assert_eq!("B".parse::<SircMethod>().unwrap(), SircMethod::B);
        assert_eq!(" c ".parse::<SircMethod>().unwrap(), SircMethod::C);
        assert!(matches!(
            "d".parse::<SircMethod>(),
            Err(CorrectionError::InvalidArgument(_))
        ));
    }
}
