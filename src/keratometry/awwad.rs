//! Awwad corneal power adjustment
//!
//! Linear regression `K_adj = slope × K + history × H + intercept`, with one
//! coefficient set per (corneal measurement, available history) pair. The
//! result feeds Double-K SRK/T or Hoffer Q.
//!
//! Myopic ablations (SIRC < 0) use the tabulated sets; hyperopic ablations
//! flip the sign of the history and intercept terms.
//!
//! **The built-in coefficient values are placeholders.** No published
//! regression table was available when this module was written; the six sets
//! in [`AwwadCoefficients::myopic`] are illustrative magnitudes only and must
//! not be used for clinical lens selection. Callers with validated
//! coefficients should pass them through [`AwwadCoefficients::adjust`].

use serde::{Deserialize, Serialize};

use super::CorrectionError;

/// Which corneal measurement `K` is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CornealMeasurement {
    /// Average central topographic power (3 mm zone).
    CentralPower,
    /// Simulated keratometry.
    SimK,
}

/// Which clinical history enters the regression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryRegressor {
    Sirc,
    PreopK,
    NoHistory,
}

impl std::str::FromStr for CornealMeasurement {
    type Err = CorrectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "central_power" | "accp" => Ok(Self::CentralPower),
            "sim_k" | "simk" => Ok(Self::SimK),
            other => Err(CorrectionError::InvalidArgument(format!(
                "unknown corneal measurement type '{other}'"
            ))),
        }
    }
}

impl std::str::FromStr for HistoryRegressor {
    type Err = CorrectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sirc" => Ok(Self::Sirc),
            "preop_k" | "kpre" => Ok(Self::PreopK),
            "none" | "no_history" => Ok(Self::NoHistory),
            other => Err(CorrectionError::InvalidArgument(format!(
                "unknown history type '{other}'"
            ))),
        }
    }
}

/// One regression coefficient set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AwwadCoefficients {
    pub slope: f64,
    pub history: f64,
    pub intercept: f64,
}

impl AwwadCoefficients {
    /// Myopic coefficient set for a measurement/history pair.
    ///
    /// Placeholder values, not a published regression (see module docs).
    pub fn myopic(measurement: CornealMeasurement, regressor: HistoryRegressor) -> Self {
        let (slope, history, intercept) = match (measurement, regressor) {
            (CornealMeasurement::CentralPower, HistoryRegressor::Sirc) => (1.0, 0.16, -0.20),
            (CornealMeasurement::CentralPower, HistoryRegressor::PreopK) => (0.92, 0.06, -0.40),
            (CornealMeasurement::CentralPower, HistoryRegressor::NoHistory) => (0.98, 0.0, -0.10),
            (CornealMeasurement::SimK, HistoryRegressor::Sirc) => (1.0, 0.20, -0.60),
            (CornealMeasurement::SimK, HistoryRegressor::PreopK) => (0.90, 0.08, -0.20),
            (CornealMeasurement::SimK, HistoryRegressor::NoHistory) => (0.97, 0.0, -0.50),
        };
        Self { slope, history, intercept }
    }

    /// Coefficients for the ablation direction implied by `sirc`.
    pub fn for_sirc(
        measurement: CornealMeasurement,
        regressor: HistoryRegressor,
        sirc: f64,
    ) -> Self {
        let c = Self::myopic(measurement, regressor);
        if sirc < 0.0 {
            c
        } else {
            Self {
                slope: c.slope,
                history: -c.history,
                intercept: -c.intercept,
            }
        }
    }

    /// `slope × K + history × H + intercept`.
    pub fn adjust(&self, k: f64, history_value: f64) -> f64 {
        self.slope * k + self.history * history_value + self.intercept
    }
}

/// Adjusted corneal power using the built-in coefficient sets.
///
/// The built-in sets are placeholders, not published values; use
/// [`AwwadCoefficients::adjust`] with validated coefficients for clinical
/// work. `k_pre` is required when `regressor` is [`HistoryRegressor::PreopK`].
pub fn k_adj(
    k: f64,
    sirc: f64,
    measurement: CornealMeasurement,
    regressor: HistoryRegressor,
    k_pre: Option<f64>,
) -> Result<f64, CorrectionError> {
    let c = AwwadCoefficients::for_sirc(measurement, regressor, sirc);
    let h = match regressor {
        HistoryRegressor::Sirc => sirc,
        HistoryRegressor::PreopK => k_pre.ok_or(CorrectionError::MissingHistory("pre-op K"))?,
        HistoryRegressor::NoHistory => 0.0,
    };
    Ok(c.adjust(k, h))
}

/// [`k_adj`] with the measurement and history selected by name.
pub fn k_adj_named(
    k: f64,
    sirc: f64,
    measurement: &str,
    regressor: &str,
    k_pre: Option<f64>,
) -> Result<f64, CorrectionError> {
    k_adj(k, sirc, measurement.parse()?, regressor.parse()?, k_pre)
}
