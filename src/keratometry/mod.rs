//! Keratometry Correction Module
//!
//! Recovers net corneal power from a SimK reading taken after corneal
//! refractive surgery. Strategies are mutually exclusive; the caller picks
//! the one matching the clinical history on hand.
//!
//! ## Corneal power corrections
//! - `true_k()` - paired pre/post SimK
//! - `true_k_sirc()` - SimK plus refractive change, three index methods
//! - `k_adj()` - Awwad regression, six placeholder coefficient sets
//! - `chm_k_post()` - clinical history method, feeds Double-K SRK/T
//!
//! ## IOL power corrections
//! - `delta_iol_masket()` / `delta_iol_latkany()` - added to a single-K result

pub mod awwad;
pub mod delta_iol;
pub mod history;
pub mod true_k;

pub use awwad::{k_adj, k_adj_named, AwwadCoefficients, CornealMeasurement, HistoryRegressor};
pub use delta_iol::{delta_iol_latkany, delta_iol_masket, KeratometryType};
pub use history::{chm_k_post, double_k_srk_t_chm};
pub use true_k::{anterior_power, posterior_power, true_k, true_k_sirc, SircMethod};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{CornealPower, IolPower};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CorrectionError {
    /// Unknown method name or measurement/history selector.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The selected method needs a history value that was not supplied.
    #[error("Missing clinical history: {0}")]
    MissingHistory(&'static str),

    /// A correction term collapsed to zero or was not finite.
    #[error("Correction undefined, degenerate term `{term}` = {value:e}")]
    UndefinedResult { term: &'static str, value: f64 },
}

// ============================================================================
// Strategy Selection
// ============================================================================

/// One corneal power correction, chosen by available clinical history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum KeratometryCorrection {
    /// Pre- and post-surgery SimK are both known.
    PairedHistory { preop_sim_k: f64, postop_sim_k: f64 },
    /// Post-surgery SimK and the refractive change are known.
    RefractiveChange {
        sim_k: f64,
        sirc: f64,
        index_method: SircMethod,
    },
    /// Awwad regression on central power or SimK.
    Awwad {
        k: f64,
        sirc: f64,
        measurement: CornealMeasurement,
        regressor: HistoryRegressor,
        #[serde(default)]
        k_pre: Option<f64>,
    },
    /// Pre-surgery K and refractive change; yields a pre/post pair.
    ClinicalHistory { k_pre: f64, sirc: f64 },
}

impl KeratometryCorrection {
    /// Corrected corneal power for the formula engine.
    pub fn corneal_power(&self) -> Result<CornealPower, CorrectionError> {
        let power = match *self {
            Self::PairedHistory {
                preop_sim_k,
                postop_sim_k,
            } => CornealPower::Single {
                k: true_k(preop_sim_k, postop_sim_k),
            },
            Self::RefractiveChange {
                sim_k,
                sirc,
                index_method,
            } => CornealPower::Single {
                k: true_k_sirc(sim_k, sirc, index_method)?,
            },
            Self::Awwad {
                k,
                sirc,
                measurement,
                regressor,
                k_pre,
            } => CornealPower::Single {
                k: k_adj(k, sirc, measurement, regressor, k_pre)?,
            },
            Self::ClinicalHistory { k_pre, sirc } => CornealPower::Paired {
                k_pre,
                k_post: chm_k_post(k_pre, sirc),
            },
        };
        Ok(power)
    }
}

/// Post-hoc IOL power adjustment for a single-K formula result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PowerAdjustment {
    Masket { sirc: f64 },
    Latkany { rx_pre: f64, k_type: KeratometryType },
}

impl PowerAdjustment {
    pub fn delta_d(&self) -> f64 {
        match *self {
            Self::Masket { sirc } => delta_iol_masket(sirc),
            Self::Latkany { rx_pre, k_type } => delta_iol_latkany(rx_pre, k_type),
        }
    }

    #[must_use]
    pub fn apply(&self, base: IolPower) -> IolPower {
        base.adjusted_by(self.delta_d())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Formula;

    #[test]
    fn test_paired_history_yields_single_k() {
        let c = KeratometryCorrection::PairedHistory {
            preop_sim_k: 44.0,
            postop_sim_k: 44.0,
        };
        match c.corneal_power().unwrap() {
            CornealPower::Single { k } => assert!((k - 44.0).abs() < 1e-12),
            other => panic!("expected single K, got {other:?}"),
        }
    }

    #[test]
    fn test_clinical_history_yields_pair() {
        let c = KeratometryCorrection::ClinicalHistory { k_pre: 44.0, sirc: -3.0 };
        assert_eq!(
            c.corneal_power().unwrap(),
            CornealPower::Paired { k_pre: 44.0, k_post: 41.0 }
        );
    }

    #[test]
    fn test_awwad_error_propagates() {
        let c = KeratometryCorrection::Awwad {
            k: 40.0,
            sirc: -3.0,
            measurement: CornealMeasurement::SimK,
            regressor: HistoryRegressor::PreopK,
            k_pre: None,
        };
        assert!(matches!(c.corneal_power(), Err(CorrectionError::MissingHistory(_))));
    }

    #[test]
    fn test_refractive_change_rejects_zero_sim_k() {
        let c = KeratometryCorrection::RefractiveChange {
            sim_k: 0.0,
            sirc: -4.0,
            index_method: SircMethod::B,
        };
        assert!(matches!(c.corneal_power(), Err(CorrectionError::UndefinedResult { .. })));
    }

    #[test]
    fn test_strategy_from_json() {
        let json = r#"{"method":"refractive_change","sim_k":42.0,"sirc":-4.0,"index_method":"a"}"#;
        let c: KeratometryCorrection = serde_json::from_str(json).unwrap();
        let k = c.corneal_power().unwrap().vergence_k();
        assert!((k - 41.571_612_444_444_46).abs() < 1e-9);
    }

    #[test]
    fn test_masket_adjustment_applies() {
        let base = IolPower::new(Formula::SrkT, 20.0);
        let adj = PowerAdjustment::Masket { sirc: -5.0 }.apply(base);
        assert!((adj.diopters - 21.731).abs() < 1e-12);
    }
}
