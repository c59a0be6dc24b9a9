//! RunScan: Streaming analysis for engine test runs
//!
//! Single-pass engines over a time-ordered, multi-channel recording of an
//! engine/turbine test.
//!
//! ## Architecture
//!
//! - **Sliding Window**: time-bounded statistics over one channel
//! - **Cycle Detector**: start → ignition → rundown state machine, one row per cycle
//! - **Snapshot Capturer**: steady-state point capture with a 10-minute re-arm
//! - **Veto Scanner**: one-vote-veto limit checks per evaluation item
//! - **Report**: runs the engines side by side and folds in functional checks
//! - **Session Store**: per-caller plans and last reports
//!
//! ## Usage
//!
//! ```ignore
//! use runscan::{AnalysisConfig, report};
//!
//! runscan::logging::init("info");
//! let plan = AnalysisConfig::load().validate()?;
//! let report = report::analyze(&plan, &samples);
//! println!("{}", report.summary());
//! ```

pub mod condition;
pub mod config;
pub mod cycle;
pub mod logging;
pub mod report;
pub mod session;
pub mod snapshot;
pub mod types;
pub mod veto;
pub mod window;

// Re-export configuration
pub use config::{AnalysisConfig, AnalysisPlan, ConfigError};

// Re-export commonly used types
pub use types::{CycleMetric, CycleResult, ItemVerdict, Sample, Snapshot, Verdict};

// Re-export engines
pub use condition::{Comparison, Condition};
pub use cycle::{CycleConfig, CycleDetector};
pub use snapshot::{Combination, SnapshotCapturer, SnapshotConfig};
pub use veto::{VetoConfig, VetoOutcome, VetoScanner};
pub use window::{SlidingWindow, Statistic};

// Re-export report and sessions
pub use report::{analyze, ItemOutcome, RunReport};
pub use session::{SessionError, SessionStore};
