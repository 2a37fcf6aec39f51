//! Post-hoc IOL power adjustments
//!
//! Added to the result of a single-K formula run on the unadjusted SimK.

use serde::{Deserialize, Serialize};

use super::CorrectionError;

/// Which keratometry fed the base formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeratometryType {
    Average,
    Flattest,
}

impl std::str::FromStr for KeratometryType {
    type Err = CorrectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "average" | "avg" => Ok(Self::Average),
            "flattest" | "flat" => Ok(Self::Flattest),
            other => Err(CorrectionError::InvalidArgument(format!(
                "unknown keratometry type '{other}' (expected average or flattest)"
            ))),
        }
    }
}

/// Masket: `ΔIOL = -0.326 × SIRC + 0.101`.
pub fn delta_iol_masket(sirc: f64) -> f64 {
    -0.326 * sirc + 0.101
}

/// Latkany regression on pre-op refraction: `ΔIOL = -(slope × RXpre + intercept)`.
///
/// Myopic eyes (RXpre < 0) branch on the keratometry type; hyperopic eyes
/// share one coefficient pair.
pub fn delta_iol_latkany(rx_pre: f64, k_type: KeratometryType) -> f64 {
    let (slope, intercept) = match (rx_pre < 0.0, k_type) {
        (true, KeratometryType::Average) => (0.46, 0.21),
        (true, KeratometryType::Flattest) => (0.47, 0.85),
        (false, _) => (0.27, 1.10),
    };
    -(slope * rx_pre + intercept)
}
