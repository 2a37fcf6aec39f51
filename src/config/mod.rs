//! Engine Configuration Module
//!
//! Per-clinic settings loaded from TOML: lens constants, default target
//! refraction and the cross-check formula list.
//!
//! ## Loading Order
//!
//! 1. `IOL_POWER_CONFIG` environment variable (path to TOML file)
//! 2. `iol_power.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! The config is an ordinary value passed by reference; there is no global.
//!
//! ```ignore
//! let config = EngineConfig::load();
//! let report = crosscheck::run_for_measurement(&measurement, &config);
//! ```

mod engine_config;
pub mod validation;

pub use engine_config::*;
