//! Analysis Configuration Module
//!
//! Loads the per-run configuration from TOML (or JSON) and validates it into
//! an [`AnalysisPlan`] of typed engine configurations.
//!
//! ## Loading Order
//!
//! 1. `RUNSCAN_CONFIG` environment variable (path to TOML file)
//! 2. `runscan.toml` in the current working directory
//! 3. Built-in defaults (nothing configured)
//!
//! ## Usage
//!
//! ```ignore
//! let plan = AnalysisConfig::load().validate()?;
//! let report = runscan::report::analyze(&plan, &samples);
//! ```
//!
//! There is no process-wide config: each session owns its plan.

mod analysis_config;
pub mod validation;

pub use analysis_config::*;
