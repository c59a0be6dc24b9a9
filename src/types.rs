//! Core data types shared by the analysis engines
//!
//! A run is an ordered sequence of [`Sample`]s. Each engine consumes that
//! sequence once and produces its own typed rows:
//!
//! - [`CycleResult`] from the cycle detector
//! - [`Snapshot`] from the snapshot capturer
//! - [`ItemVerdict`] from the veto scanner

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Input Samples
// ============================================================================

/// One instant of a multi-channel recording.
///
/// Channels are identified purely by name. A channel missing from `values`
/// makes every condition on that channel "not met" for this tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Seconds since the start of the run
    pub timestamp: f64,
    /// Channel name to reading
    pub values: HashMap<String, f64>,
}

impl Sample {
    pub fn new(timestamp: f64) -> Self {
        Self {
            timestamp,
            values: HashMap::new(),
        }
    }

    /// Build a sample from `(channel, value)` pairs.
    pub fn from_pairs<'a, I>(timestamp: f64, pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        Self {
            timestamp,
            values: pairs
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        }
    }

    /// Builder-style channel insertion.
    pub fn with(mut self, channel: &str, value: f64) -> Self {
        self.values.insert(channel.to_string(), value);
        self
    }

    /// Reading for `channel`, if present in this sample.
    pub fn value(&self, channel: &str) -> Option<f64> {
        self.values.get(channel).copied()
    }
}

// ============================================================================
// Cycle Detector Output
// ============================================================================

/// One completed start → ignition → rundown cycle.
///
/// Every derived metric is `None` when one of the two timestamps it needs
/// was never observed during the cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleResult {
    /// 1-based cycle counter within the run
    pub sequence_number: u32,
    /// Absolute time of the baseline event (`T_Baseline`)
    pub time_base: Option<f64>,
    /// `T_Baseline - T_Start`
    pub startup_time: Option<f64>,
    /// `T_Ignition - T_Baseline`
    pub ignition_time: Option<f64>,
    /// `T_Ng_T2 - T_Ng_T1`
    pub ng_rundown: Option<f64>,
    /// `T_Np_T2 - T_Np_T1`
    pub np_rundown: Option<f64>,
}

/// Named metric of a [`CycleResult`], used by functional-result checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleMetric {
    TimeBase,
    StartupTime,
    IgnitionTime,
    NgRundown,
    NpRundown,
}

impl CycleMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleMetric::TimeBase => "time_base",
            CycleMetric::StartupTime => "startup_time",
            CycleMetric::IgnitionTime => "ignition_time",
            CycleMetric::NgRundown => "ng_rundown",
            CycleMetric::NpRundown => "np_rundown",
        }
    }
}

impl std::fmt::Display for CycleMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl CycleResult {
    /// Value of a named metric for this cycle.
    pub fn metric(&self, metric: CycleMetric) -> Option<f64> {
        match metric {
            CycleMetric::TimeBase => self.time_base,
            CycleMetric::StartupTime => self.startup_time,
            CycleMetric::IgnitionTime => self.ignition_time,
            CycleMetric::NgRundown => self.ng_rundown,
            CycleMetric::NpRundown => self.np_rundown,
        }
    }
}

// ============================================================================
// Snapshot Capturer Output
// ============================================================================

/// Cross-channel reading recorded when the steady-state trigger fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: f64,
    /// Display channel name to reading, in configured order
    pub display_values: Vec<(String, f64)>,
}

impl Snapshot {
    pub fn value(&self, channel: &str) -> Option<f64> {
        self.display_values
            .iter()
            .find(|(name, _)| name == channel)
            .map(|(_, v)| *v)
    }
}

// ============================================================================
// Veto Scanner Output
// ============================================================================

/// One-vote-veto verdict. Only ever moves from `Pass` to `Fail`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Pass => write!(f, "Pass"),
            Verdict::Fail => write!(f, "Fail"),
        }
    }
}

/// Final state of one evaluation item after a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemVerdict {
    pub id: String,
    pub display_name: String,
    pub verdict: Verdict,
    /// Timestamp of the tick that flipped the item to `Fail`
    pub failed_at: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_builders() {
        let sample = Sample::new(1.5).with("Ng", 100.0).with("Np", 50.0);
        assert_eq!(sample.value("Ng"), Some(100.0));
        assert_eq!(sample.value("T45"), None);

        let pairs = Sample::from_pairs(2.0, [("Ng", 1.0), ("Np", 2.0)]);
        assert_eq!(pairs.values.len(), 2);
        assert_eq!(pairs.timestamp, 2.0);
    }

    #[test]
    fn test_cycle_metric_lookup() {
        let row = CycleResult {
            sequence_number: 1,
            time_base: Some(12.0),
            startup_time: Some(4.0),
            ignition_time: None,
            ng_rundown: Some(30.0),
            np_rundown: None,
        };
        assert_eq!(row.metric(CycleMetric::StartupTime), Some(4.0));
        assert_eq!(row.metric(CycleMetric::IgnitionTime), None);
        assert_eq!(row.metric(CycleMetric::NgRundown), Some(30.0));
        assert_eq!(CycleMetric::NpRundown.to_string(), "np_rundown");
    }

    #[test]
    fn test_verdict_display() {
        assert_eq!(format!("{}", Verdict::Pass), "Pass");
        assert_eq!(format!("{}", Verdict::Fail), "Fail");
        assert!(Verdict::Pass.is_pass());
        assert!(!Verdict::Fail.is_pass());
    }

    #[test]
    fn test_snapshot_value_lookup() {
        let snap = Snapshot {
            timestamp: 5.0,
            display_values: vec![("Ng".to_string(), 9000.0), ("T45".to_string(), 600.0)],
        };
        assert_eq!(snap.value("T45"), Some(600.0));
        assert_eq!(snap.value("Np"), None);
    }
}
