//! Multi-formula cross-check
//!
//! Clinicians compare several formulas for the same eye before choosing a
//! lens. Each formula is independent and stateless, so a batch is evaluated
//! in parallel; the report keeps request order.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::biometry::{
    besst, corneal_radius, double_k_srk_t, haigis, haigis_l, hoffer_q, shammas_pl, srk_t,
    FormulaError, HaigisConstants,
};
use crate::config::{EngineConfig, LensConfig};
use crate::types::{BiometricMeasurement, Formula, IolPower};

// ============================================================================
// Formula Requests
// ============================================================================

/// Fully specified arguments for one formula call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "formula", rename_all = "snake_case")]
pub enum FormulaInput {
    SrkT {
        axial_length: f64,
        k: f64,
        a_constant: f64,
        target_refraction: f64,
    },
    DoubleKSrkT {
        axial_length: f64,
        k_pre: f64,
        k_post: f64,
        a_constant: f64,
        target_refraction: f64,
    },
    HofferQ {
        axial_length: f64,
        k: f64,
        acd: f64,
        rx: f64,
    },
    ShammasPl {
        k_post: f64,
        axial_length: f64,
        a_constant: f64,
        rx: f64,
    },
    Haigis {
        radius_mm: f64,
        acd: f64,
        axial_length: f64,
        a_constant: f64,
        rx: f64,
        constants: HaigisConstants,
    },
    HaigisL {
        radius_mm: f64,
        acd: f64,
        axial_length: f64,
        a_constant: f64,
        rx: f64,
        constants: HaigisConstants,
    },
    Besst {
        front_radius_mm: f64,
        back_radius_mm: f64,
        cct_um: f64,
        axial_length: f64,
        acd: f64,
        a_constant: f64,
        rx: f64,
    },
}

impl FormulaInput {
    pub fn formula(&self) -> Formula {
        match self {
            Self::SrkT { .. } => Formula::SrkT,
            Self::DoubleKSrkT { .. } => Formula::DoubleKSrkT,
            Self::HofferQ { .. } => Formula::HofferQ,
            Self::ShammasPl { .. } => Formula::ShammasPl,
            Self::Haigis { .. } => Formula::Haigis,
            Self::HaigisL { .. } => Formula::HaigisL,
            Self::Besst { .. } => Formula::Besst,
        }
    }

    pub fn evaluate(&self) -> Result<IolPower, FormulaError> {
        match *self {
            Self::SrkT {
                axial_length,
                k,
                a_constant,
                target_refraction,
            } => srk_t(axial_length, k, a_constant, target_refraction),
            Self::DoubleKSrkT {
                axial_length,
                k_pre,
                k_post,
                a_constant,
                target_refraction,
            } => double_k_srk_t(axial_length, k_pre, k_post, a_constant, target_refraction),
            Self::HofferQ {
                axial_length,
                k,
                acd,
                rx,
            } => hoffer_q(axial_length, k, acd, rx),
            Self::ShammasPl {
                k_post,
                axial_length,
                a_constant,
                rx,
            } => shammas_pl(k_post, axial_length, a_constant, rx),
            Self::Haigis {
                radius_mm,
                acd,
                axial_length,
                a_constant,
                rx,
                ref constants,
            } => haigis(radius_mm, acd, axial_length, a_constant, rx, constants),
            Self::HaigisL {
                radius_mm,
                acd,
                axial_length,
                a_constant,
                rx,
                ref constants,
            } => haigis_l(radius_mm, acd, axial_length, a_constant, rx, constants),
            Self::Besst {
                front_radius_mm,
                back_radius_mm,
                cct_um,
                axial_length,
                acd,
                a_constant,
                rx,
            } => besst(front_radius_mm, back_radius_mm, cct_um, axial_length, acd, a_constant, rx),
        }
    }

    /// Build the request for `formula` from a measurement.
    ///
    /// Returns `None` when the measurement lacks an input the formula needs.
    /// A-constant and target refraction fall back to the configured values.
    ///
    /// Shammas-PL and Haigis-L apply their own post-surgery correction, so
    /// they read only the raw measured K or radius and never `corrected_k`.
    pub fn from_measurement(
        formula: Formula,
        m: &BiometricMeasurement,
        lens: &LensConfig,
        default_target: f64,
    ) -> Option<Self> {
        let al = m.axial_length_mm;
        let a = m.a_constant.unwrap_or(lens.a_constant);
        let rx = m.target_refraction_d.unwrap_or(default_target);
        let measured_radius = || m.front_radius_mm.or_else(|| m.measured_k().map(corneal_radius));
        let vergence_radius = || m.corrected_k.map(corneal_radius).or_else(measured_radius);

        let input = match formula {
            Formula::SrkT => Self::SrkT {
                axial_length: al,
                k: m.vergence_k()?,
                a_constant: a,
                target_refraction: rx,
            },
            Formula::DoubleKSrkT => Self::DoubleKSrkT {
                axial_length: al,
                k_pre: m.k_pre?,
                k_post: m.corrected_k.or(m.k_post)?,
                a_constant: a,
                target_refraction: rx,
            },
            Formula::HofferQ => Self::HofferQ {
                axial_length: al,
                k: m.vergence_k()?,
                acd: m.acd_mm?,
                rx,
            },
            Formula::ShammasPl => Self::ShammasPl {
                k_post: m.measured_k()?,
                axial_length: al,
                a_constant: a,
                rx,
            },
            // Haigis treats a zero ACD as "not measured"
            Formula::Haigis => Self::Haigis {
                radius_mm: vergence_radius()?,
                acd: m.acd_mm.unwrap_or(0.0),
                axial_length: al,
                a_constant: a,
                rx,
                constants: lens.haigis_constants(),
            },
            Formula::HaigisL => Self::HaigisL {
                radius_mm: measured_radius()?,
                acd: m.acd_mm.unwrap_or(0.0),
                axial_length: al,
                a_constant: a,
                rx,
                constants: lens.haigis_constants(),
            },
            Formula::Besst => Self::Besst {
                front_radius_mm: m.front_radius_mm?,
                back_radius_mm: m.back_radius_mm?,
                cct_um: m.cct_um?,
                axial_length: al,
                acd: m.acd_mm?,
                a_constant: a,
                rx,
            },
        };
        Some(input)
    }
}

// ============================================================================
// Report
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FormulaOutcome {
    Computed { power: IolPower },
    Failed { reason: String },
    /// The measurement lacked an input this formula needs.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaRun {
    /// Formula requested (BESSt runs record the dispatch target in `power`).
    pub requested: Formula,
    pub outcome: FormulaOutcome,
}

impl FormulaRun {
    pub fn power(&self) -> Option<&IolPower> {
        match &self.outcome {
            FormulaOutcome::Computed { power } => Some(power),
            _ => None,
        }
    }
}

/// Agreement statistics over the computed results.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpreadSummary {
    pub count: usize,
    pub min_d: f64,
    pub max_d: f64,
    pub mean_d: f64,
    pub spread_d: f64,
}

impl SpreadSummary {
    fn from_powers(powers: &[f64]) -> Option<Self> {
        if powers.is_empty() {
            return None;
        }
        let min_d = powers.iter().copied().fold(f64::INFINITY, f64::min);
        let max_d = powers.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean_d = powers.iter().sum::<f64>() / powers.len() as f64;
        Some(Self {
            count: powers.len(),
            min_d,
            max_d,
            mean_d,
            spread_d: max_d - min_d,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossCheckReport {
    pub runs: Vec<FormulaRun>,
    pub summary: Option<SpreadSummary>,
    /// At least one computed result came from clamped geometry.
    pub any_domain_clamped: bool,
}

impl CrossCheckReport {
    fn from_runs(runs: Vec<FormulaRun>) -> Self {
        let powers: Vec<f64> = runs.iter().filter_map(|r| r.power().map(|p| p.diopters)).collect();
        let any_domain_clamped = runs
            .iter()
            .filter_map(FormulaRun::power)
            .any(|p| p.domain_clamped);
        Self {
            summary: SpreadSummary::from_powers(&powers),
            any_domain_clamped,
            runs,
        }
    }

    /// Formulas disagree by more than `threshold_d`.
    pub fn spread_exceeds(&self, threshold_d: f64) -> bool {
        self.summary.is_some_and(|s| s.spread_d > threshold_d)
    }

    pub fn failures(&self) -> impl Iterator<Item = &FormulaRun> {
        self.runs
            .iter()
            .filter(|r| matches!(r.outcome, FormulaOutcome::Failed { .. }))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

// ============================================================================
// Entry Points
// ============================================================================

fn evaluate_one(input: &FormulaInput) -> FormulaRun {
    let requested = input.formula();
    let outcome = match input.evaluate() {
        Ok(power) => FormulaOutcome::Computed { power },
        Err(e) => {
            warn!(formula = %requested, error = %e, "Formula evaluation failed");
            FormulaOutcome::Failed {
                reason: e.to_string(),
            }
        }
    };
    FormulaRun { requested, outcome }
}

/// Evaluate a batch of formula requests in parallel.
pub fn run(inputs: &[FormulaInput]) -> CrossCheckReport {
    let runs: Vec<FormulaRun> = inputs.par_iter().map(evaluate_one).collect();
    CrossCheckReport::from_runs(runs)
}

/// Run every configured formula the measurement can support.
pub fn run_for_measurement(m: &BiometricMeasurement, config: &EngineConfig) -> CrossCheckReport {
    let requests: Vec<(Formula, Option<FormulaInput>)> = config
        .crosscheck
        .formulas
        .iter()
        .map(|&f| {
            (
                f,
                FormulaInput::from_measurement(f, m, &config.lens, config.target.refraction_d),
            )
        })
        .collect();

    let runs: Vec<FormulaRun> = requests
        .par_iter()
        .map(|(formula, input)| match input {
            Some(input) => evaluate_one(input),
            None => {
                debug!(formula = %formula, "Skipping formula, measurement lacks inputs");
                FormulaRun {
                    requested: *formula,
                    outcome: FormulaOutcome::Skipped,
                }
            }
        })
        .collect();

    let report = CrossCheckReport::from_runs(runs);
    if let Some(summary) = report.summary {
        if report.spread_exceeds(config.crosscheck.spread_warning_d) {
            warn!(
                spread_d = summary.spread_d,
                threshold_d = config.crosscheck.spread_warning_d,
                count = summary.count,
                "Formula results disagree beyond configured spread"
            );
        }
    }
    report
}
