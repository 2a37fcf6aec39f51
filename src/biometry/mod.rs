//! Biometry Engine Module
//!
//! Closed-form IOL power prediction. Everything here is a pure function of
//! caller-supplied biometry; nothing is cached or shared between calls.
//!
//! ## Leaves
//! - `geometry` - corneal radius/power, axial-length correction, corneal
//!   width, sagittal height, retinal thickness
//! - `chamber_depth` - ACD constant and estimated postoperative ELP
//!
//! ## Formulas
//! - `srk_t()` / `double_k_srk_t()` - single- and double-K SRK/T
//! - `hoffer_q()` - Hoffer Q
//! - `shammas_pl()` - Shammas no-history formula
//! - `haigis()` / `haigis_l()` - Haigis and its post-myopic-LASIK variant
//! - `besst()` - thick-lens corneal power feeding Hoffer Q or SRK/T

pub mod chamber_depth;
pub mod formulas;
pub mod geometry;
pub mod selector;

pub use chamber_depth::{acd_constant, estimated_acd, elp_offset};
pub use formulas::{
    double_k_srk_t, haigis, haigis_l, haigis_l_radius, hoffer_q, shammas_pl, srk_t,
    HaigisConstants,
};
pub use geometry::{
    axial_length_correction, corneal_power, corneal_radius, corneal_width,
    optical_axial_length, retinal_thickness, sagittal_discriminant, sagittal_height,
    SagittalHeight,
};
pub use selector::{besst, besst_corneal_power, besst_dispatch, BesstCornealPower, BesstDispatch};

use thiserror::Error;

use crate::types::Formula;

/// Magnitude below which a denominator is treated as zero.
pub const DENOMINATOR_EPSILON: f64 = 1e-10;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FormulaError {
    /// A denominator collapsed to (near) zero or the result was not finite.
    /// Never substituted with a fallback diopter value.
    #[error("{formula}: result undefined, degenerate term `{term}` = {value:e}")]
    UndefinedResult {
        formula: Formula,
        term: &'static str,
        value: f64,
    },
}

/// Pass `value` through unless it is a usable denominator.
pub(crate) fn nonzero(formula: Formula, term: &'static str, value: f64) -> Result<f64, FormulaError> {
    if !value.is_finite() || value.abs() < DENOMINATOR_EPSILON {
        return Err(FormulaError::UndefinedResult { formula, term, value });
    }
    Ok(value)
}

/// Reject NaN and infinite results.
pub(crate) fn finite(formula: Formula, value: f64) -> Result<f64, FormulaError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(FormulaError::UndefinedResult {
            formula,
            term: "result",
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonzero_rejects_degenerate_values() {
        assert!(nonzero(Formula::SrkT, "S1", 0.0).is_err());
        assert!(nonzero(Formula::SrkT, "S1", 1e-12).is_err());
        assert!(nonzero(Formula::SrkT, "S1", f64::NAN).is_err());
        assert_eq!(nonzero(Formula::SrkT, "S1", -0.5), Ok(-0.5));
    }

    #[test]
    fn test_error_names_formula_and_term() {
        let err = nonzero(Formula::Haigis, "1 - Rx*Dx", 0.0).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Haigis"), "got {msg}");
        assert!(msg.contains("1 - Rx*Dx"), "got {msg}");
    }
}
