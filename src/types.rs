//! Shared data model for IOL power calculation
//!
//! Every value here is transient: built by the caller for one calculation and
//! dropped afterwards. Lengths are millimetres and powers diopters unless a
//! field name says otherwise.

use serde::{Deserialize, Serialize};

// ============================================================================
// Formula Identity
// ============================================================================

/// The power-prediction procedures the engine implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Formula {
    SrkT,
    DoubleKSrkT,
    HofferQ,
    ShammasPl,
    Haigis,
    HaigisL,
    Besst,
}

impl Formula {
    pub const ALL: [Self; 7] = [
        Self::SrkT,
        Self::DoubleKSrkT,
        Self::HofferQ,
        Self::ShammasPl,
        Self::Haigis,
        Self::HaigisL,
        Self::Besst,
    ];

    /// Config / serde name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SrkT => "srk_t",
            Self::DoubleKSrkT => "double_k_srk_t",
            Self::HofferQ => "hoffer_q",
            Self::ShammasPl => "shammas_pl",
            Self::Haigis => "haigis",
            Self::HaigisL => "haigis_l",
            Self::Besst => "besst",
        }
    }
}

impl std::fmt::Display for Formula {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SrkT => write!(f, "SRK/T"),
            Self::DoubleKSrkT => write!(f, "Double-K SRK/T"),
            Self::HofferQ => write!(f, "Hoffer Q"),
            Self::ShammasPl => write!(f, "Shammas-PL"),
            Self::Haigis => write!(f, "Haigis"),
            Self::HaigisL => write!(f, "Haigis-L"),
            Self::Besst => write!(f, "BESSt"),
        }
    }
}

impl std::str::FromStr for Formula {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| format!("unknown formula '{s}'"))
    }
}

// ============================================================================
// Results
// ============================================================================

/// IOL power predicted for the requested target refraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IolPower {
    /// Formula that actually produced the value (BESSt reports the one it
    /// dispatched to).
    pub formula: Formula,
    pub diopters: f64,
    /// Sagittal-height geometry was clamped; the value is approximate.
    pub domain_clamped: bool,
}

impl IolPower {
    pub fn new(formula: Formula, diopters: f64) -> Self {
        Self {
            formula,
            diopters,
            domain_clamped: false,
        }
    }

    /// Shift by a post-hoc power adjustment (Masket / Latkany).
    #[must_use]
    pub fn adjusted_by(self, delta_d: f64) -> Self {
        Self {
            diopters: self.diopters + delta_d,
            ..self
        }
    }
}

impl std::fmt::Display for IolPower {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {:+.2} D", self.formula, self.diopters)?;
        if self.domain_clamped {
            write!(f, " (approximate: geometry clamped)")?;
        }
        Ok(())
    }
}

/// Net corneal power recovered by a keratometry correction.
///
/// Always true-index anterior+posterior power, never a raw device SimK.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CornealPower {
    /// One corrected K for single-K formulas.
    Single { k: f64 },
    /// Pre/post pair for Double-K SRK/T.
    Paired { k_pre: f64, k_post: f64 },
}

impl CornealPower {
    /// The K a vergence formula should use (post-op K when paired).
    pub fn vergence_k(&self) -> f64 {
        match *self {
            Self::Single { k } => k,
            Self::Paired { k_post, .. } => k_post,
        }
    }
}

// ============================================================================
// Measurements
// ============================================================================

/// Biometry for one eye, as supplied by the caller.
///
/// Keratometry is kept in two layers. `k`, `k_post` and `front_radius_mm` are
/// raw device readings and are never overwritten. `corrected_k` holds the net
/// corneal power from a keratometry correction. Formulas that carry their own
/// post-surgery correction (Shammas-PL, Haigis-L) read only the raw layer.
///
/// Optional fields are only needed by some formulas; physiologic plausibility
/// is not checked here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BiometricMeasurement {
    pub axial_length_mm: f64,
    /// Measured SimK as reported by the device (keratometric index 1.3375).
    #[serde(default)]
    pub k: Option<f64>,
    /// Keratometry before corneal refractive surgery.
    #[serde(default)]
    pub k_pre: Option<f64>,
    /// Measured SimK after corneal refractive surgery.
    #[serde(default)]
    pub k_post: Option<f64>,
    /// Net corneal power recovered by a keratometry correction.
    #[serde(default)]
    pub corrected_k: Option<f64>,
    /// Measured anterior corneal radius (mm).
    #[serde(default)]
    pub front_radius_mm: Option<f64>,
    /// Measured posterior corneal radius (mm).
    #[serde(default)]
    pub back_radius_mm: Option<f64>,
    #[serde(default)]
    pub acd_mm: Option<f64>,
    /// Central corneal thickness (µm).
    #[serde(default)]
    pub cct_um: Option<f64>,
    /// Lens A-constant; the configured lens is used when absent.
    #[serde(default)]
    pub a_constant: Option<f64>,
    /// Target postoperative refraction (D); the configured target is used
    /// when absent.
    #[serde(default)]
    pub target_refraction_d: Option<f64>,
}

impl BiometricMeasurement {
    /// Raw measured keratometry: post-op SimK, falling back to `k`.
    pub fn measured_k(&self) -> Option<f64> {
        self.k_post.or(self.k)
    }

    /// K for formulas without a built-in correction: the corrected power
    /// when one is available, otherwise the measured reading.
    pub fn vergence_k(&self) -> Option<f64> {
        self.corrected_k.or(self.k).or(self.k_post)
    }

    /// Record a corrected corneal power; raw readings are left untouched.
    #[must_use]
    pub fn with_corneal_power(mut self, power: CornealPower) -> Self {
        match power {
            CornealPower::Single { k } => self.corrected_k = Some(k),
            CornealPower::Paired { k_pre, k_post } => {
                self.k_pre = Some(k_pre);
                self.corrected_k = Some(k_post);
            }
        }
        self
    }
}
