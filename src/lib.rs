//! IOL Power: intraocular lens power prediction after corneal refractive surgery
//!
//! Deterministic formula engine for cataract surgery planning in eyes that
//! have had LASIK, PRK or similar procedures.
//!
//! ## Architecture
//!
//! - **Biometry**: ocular geometry, chamber depth and the vergence formulas
//!   (SRK/T, Double-K SRK/T, Hoffer Q, Shammas-PL, Haigis, Haigis-L, BESSt)
//! - **Keratometry**: corneal power corrections (True-K, Awwad, clinical
//!   history) and post-hoc power adjustments (Masket, Latkany)
//! - **Cross-check**: runs several formulas on one eye in parallel and
//!   reports their spread
//! - **Config**: per-clinic lens constants and cross-check policy from TOML

pub mod biometry;
pub mod config;
pub mod crosscheck;
pub mod keratometry;
pub mod types;

// Re-export engine configuration
pub use config::{ConfigError, EngineConfig};

// Re-export commonly used types
pub use types::{BiometricMeasurement, CornealPower, Formula, IolPower};

// Re-export error types
pub use biometry::FormulaError;
pub use keratometry::{CorrectionError, KeratometryCorrection, PowerAdjustment};

// Re-export cross-check entry points
pub use crosscheck::{CrossCheckReport, FormulaInput, FormulaOutcome};
