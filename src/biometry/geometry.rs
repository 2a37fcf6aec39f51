//! Corneal and axial geometry shared by the SRK/T family
//!
//! All lengths in millimetres, powers in diopters. The keratometric index
//! 1.3375 is baked into the 337.5 conversion factor.

use tracing::warn;

/// `(1.3375 - 1) * 1000`: converts between corneal radius (mm) and SimK (D).
pub const KERATOMETRIC_FACTOR: f64 = 337.5;

/// Axial length above which the long-eye correction applies (mm).
pub const LONG_EYE_THRESHOLD_MM: f64 = 24.2;

/// Corneal radius of curvature (mm) from keratometric power (D).
pub fn corneal_radius(k: f64) -> f64 {
    KERATOMETRIC_FACTOR / k
}

/// Keratometric power (D) from corneal radius (mm). Inverse of [`corneal_radius`].
pub fn corneal_power(radius_mm: f64) -> f64 {
    KERATOMETRIC_FACTOR / radius_mm
}

/// Corrected axial length (LCOR)
///
/// Long eyes are shortened to model retinal curvature:
/// `LCOR = -3.446 + 1.716 × AL - 0.0237 × AL²` for AL > 24.2 mm,
/// otherwise AL is returned unchanged.
pub fn axial_length_correction(axial_length: f64) -> f64 {
    if axial_length <= LONG_EYE_THRESHOLD_MM {
        axial_length
    } else {
        -3.446 + 1.716 * axial_length - 0.0237 * axial_length * axial_length
    }
}

/// Computed corneal width (Cw) from corrected axial length and K.
pub fn corneal_width(corrected_axial_length: f64, k: f64) -> f64 {
    -5.40948 + 0.58412 * corrected_axial_length + 0.098 * k
}

/// Corneal dome height, with a flag for the domain clamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SagittalHeight {
    pub height_mm: f64,
    /// The discriminant `R² - Cw²/4` was negative and forced to zero. The
    /// geometry lies outside the formula's validity envelope.
    pub clamped: bool,
}

/// Raw sagittal-height discriminant `R² - Cw²/4`, before clamping.
pub fn sagittal_discriminant(radius_mm: f64, corneal_width: f64) -> f64 {
    radius_mm * radius_mm - corneal_width * corneal_width / 4.0
}

/// Sagittal height `H = R - sqrt(R² - Cw²/4)`
///
/// A negative discriminant is clamped to 0 and reported via
/// [`SagittalHeight::clamped`] plus a warning log.
pub fn sagittal_height(radius_mm: f64, corneal_width: f64) -> SagittalHeight {
    let discriminant = sagittal_discriminant(radius_mm, corneal_width);
    let clamped = discriminant < 0.0;
    if clamped {
        warn!(
            radius_mm,
            corneal_width,
            discriminant,
            "Sagittal height discriminant negative, clamped to 0; result is approximate"
        );
    }

    SagittalHeight {
        height_mm: radius_mm - discriminant.max(0.0).sqrt(),
        clamped,
    }
}

/// Retinal thickness (mm) added to ultrasound AL to reach the photoreceptors.
pub fn retinal_thickness(axial_length: f64) -> f64 {
    0.65696 - 0.02029 * axial_length
}

/// Optical axial length `LOPT = AL + RETHICK`.
pub fn optical_axial_length(axial_length: f64) -> f64 {
    axial_length + retinal_thickness(axial_length)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axial_length_correction_identity_for_normal_eyes() {
        for al in [15.0, 20.0, 22.5, 23.99, 24.2] {
            assert_eq!(axial_length_correction(al), al);
        }
    }

    #[test]
    fn test_axial_length_correction_continuous_at_threshold() {
        let below = axial_length_correction(LONG_EYE_THRESHOLD_MM);
        let above = -3.446 + 1.716 * LONG_EYE_THRESHOLD_MM - 0.0237 * LONG_EYE_THRESHOLD_MM.powi(2);
        assert!((below - above).abs() < 1e-2, "branches differ: {below} vs {above}");

        let just_above = axial_length_correction(LONG_EYE_THRESHOLD_MM + 1e-9);
        assert!((just_above - below).abs() < 1e-2);
    }

    #[test]
    fn test_axial_length_correction_shortens_long_eyes() {
        // 28 mm → -3.446 + 48.048 - 18.5808 = 26.0212
        let lc = axial_length_correction(28.0);
        assert!((lc - 26.0212).abs() < 1e-9, "got {lc}");
    }

    #[test]
    fn test_corneal_radius_round_trip() {
        let r = corneal_radius(45.0);
        assert!((r - 7.5).abs() < 1e-12);
        assert!((corneal_power(r) - 45.0).abs() < 1e-12);
    }

    #[test]
    fn test_sagittal_height_normal_geometry_not_clamped() {
        let r = corneal_radius(44.0);
        let cw = corneal_width(axial_length_correction(23.5), 44.0);
        let h = sagittal_height(r, cw);
        assert!(!h.clamped);
        assert!(h.height_mm > 0.0 && h.height_mm < r);
    }

    #[test]
    fn test_sagittal_height_clamps_negative_discriminant() {
        // Steep cornea in a long eye: Cw/2 exceeds R
        let k = 55.0;
        let cw = corneal_width(axial_length_correction(30.0), k);
        let r = corneal_radius(k);
        assert!(sagittal_discriminant(r, cw) < 0.0);

        let h = sagittal_height(r, cw);
        assert!(h.clamped);
        assert_eq!(h.height_mm, r);
    }

    #[test]
    fn test_sagittal_height_always_finite() {
        for r in [-10.0, -1.0, 0.0, 0.5, 7.5, 100.0] {
            for cw in [-20.0, 0.0, 1.0, 11.0, 50.0] {
                let h = sagittal_height(r, cw);
                assert!(h.height_mm.is_finite(), "r={r} cw={cw}");
            }
        }
    }

    #[test]
    fn test_optical_axial_length_adds_retinal_thickness() {
        let al = 23.5;
        let expected = al + 0.65696 - 0.02029 * al;
        assert!((optical_axial_length(al) - expected).abs() < 1e-12);
    }
}
