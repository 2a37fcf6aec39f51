//! Chamber depth estimation
//!
//! ELP for the SRK/T family is the corneal dome height plus a lens-specific
//! offset derived from the A-constant.
//!
//! When both pre- and post-refractive-surgery keratometry exist, the height
//! passed here must come from the *preoperative* radius: only that surface
//! still honours the anterior/posterior radius-ratio assumption.

use super::geometry::SagittalHeight;

/// Offset between the ACD constant and the SRK/T ELP offset (mm).
const ACD_OFFSET_SHIFT: f64 = 3.3357;

/// Lens ACD constant from the SRK/T A-constant.
pub fn acd_constant(a_constant: f64) -> f64 {
    0.62467 * a_constant - 68.74709
}

/// `Offset = ACDconst - 3.3357`
pub fn elp_offset(a_constant: f64) -> f64 {
    acd_constant(a_constant) - ACD_OFFSET_SHIFT
}

/// Estimated postoperative ACD: `ACDest = H + Offset`.
pub fn estimated_acd(height: SagittalHeight, a_constant: f64) -> f64 {
    height.height_mm + elp_offset(a_constant)
}
