//! Snapshot Capturer - steady-state point capture
//!
//! Records the configured display channels whenever the steady-state trigger
//! turns on. The trigger combines two optional conditions:
//!
//! - Condition 1: a windowed statistic (or instant value) against a threshold
//! - Condition 2: the amplitude (`max - min`) of a channel over a window
//!
//! ## Trigger
//!
//! | Combination | Trigger            |
//! |-------------|--------------------|
//! | `Cond1Only` | Condition 1        |
//! | `Cond2Only` | Condition 2        |
//! | `AND`       | Condition 1 AND 2  |
//!
//! A snapshot is taken on the rising edge of the trigger. While the trigger
//! stays on and Condition 2 takes part in it, a new snapshot is forced once
//! more than [`REARM_TIMEOUT_SECS`] have passed since the last one. Condition 1
//! alone never re-arms.

use crate::condition::{AmplitudeCondition, ConditionProbe, StatisticCondition};
use crate::types::{Sample, Snapshot};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Steady-state re-arm period for Condition 2 (10 minutes).
pub const REARM_TIMEOUT_SECS: f64 = 600.0;

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Combination {
    #[default]
    #[serde(rename = "Cond1Only", alias = "Cond1_Only", alias = "cond1_only")]
    Cond1Only,
    #[serde(rename = "Cond2Only", alias = "Cond2_Only", alias = "cond2_only")]
    Cond2Only,
    #[serde(rename = "AND", alias = "And", alias = "and")]
    And,
}

impl Combination {
    /// Whether Condition 2 takes part in the trigger.
    pub fn uses_condition2(&self) -> bool {
        matches!(self, Combination::Cond2Only | Combination::And)
    }
}

impl std::fmt::Display for Combination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Combination::Cond1Only => write!(f, "Cond1Only"),
            Combination::Cond2Only => write!(f, "Cond2Only"),
            Combination::And => write!(f, "AND"),
        }
    }
}

/// Validated snapshot configuration. Disabled conditions are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotConfig {
    pub display_channels: Vec<String>,
    pub combination: Combination,
    pub condition1: Option<StatisticCondition>,
    pub condition2: Option<AmplitudeCondition>,
}

// ============================================================================
// Snapshot Capturer
// ============================================================================

#[derive(Debug, Clone)]
pub struct SnapshotCapturer {
    display_channels: Vec<String>,
    combination: Combination,
    condition1: Option<ConditionProbe>,
    condition2: Option<ConditionProbe>,
    last_trigger: bool,
    last_recorded: Option<f64>,
    snapshots: Vec<Snapshot>,
}

impl SnapshotCapturer {
    pub fn new(config: &SnapshotConfig) -> Self {
        let condition1 = config.condition1.clone().map(ConditionProbe::new);
        let condition2 = config.condition2.clone().map(ConditionProbe::new);

        match config.combination {
            Combination::Cond1Only if condition1.is_none() => {
                warn!("Cond1Only selected but Condition 1 is disabled, no snapshots will be taken");
            }
            Combination::Cond2Only if condition2.is_none() => {
                warn!("Cond2Only selected but Condition 2 is disabled, no snapshots will be taken");
            }
            Combination::And if condition1.is_none() || condition2.is_none() => {
                warn!(
                    condition1 = condition1.is_some(),
                    condition2 = condition2.is_some(),
                    "AND combination with a disabled condition, trigger stays off"
                );
            }
            _ => {}
        }

        info!(
            combination = %config.combination,
            channels = config.display_channels.len(),
            "Snapshot capturer initialised"
        );

        Self {
            display_channels: config.display_channels.clone(),
            combination: config.combination,
            condition1,
            condition2,
            last_trigger: false,
            last_recorded: None,
            snapshots: Vec::new(),
        }
    }

    pub fn run(config: &SnapshotConfig, samples: &[Sample]) -> Vec<Snapshot> {
        let mut capturer = Self::new(config);
        for sample in samples {
            capturer.process(sample);
        }
        capturer.finish()
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    /// Current state of the combined trigger (as of the last processed tick).
    pub fn trigger(&self) -> bool {
        self.last_trigger
    }

    pub fn process(&mut self, sample: &Sample) {
        if let Some(probe) = self.condition1.as_mut() {
            probe.update(sample);
        }
        if let Some(probe) = self.condition2.as_mut() {
            probe.update(sample);
        }

        let cond1 = self.condition1.as_ref().is_some_and(|p| p.is_met(sample));
        let cond2 = self.condition2.as_ref().is_some_and(|p| p.is_met(sample));
        let trigger = match self.combination {
            Combination::Cond1Only => cond1,
            Combination::Cond2Only => cond2,
            Combination::And => cond1 && cond2,
        };
        let rearm_enabled = self.combination.uses_condition2() && self.condition2.is_some();
        let now = sample.timestamp;

        if trigger && !self.last_trigger {
            debug!(t = now, cond1, cond2, "Steady-state trigger rising edge");
            self.record(sample, "rising edge");
            if rearm_enabled {
                self.last_recorded = Some(now);
            }
        } else if trigger && rearm_enabled {
            let expired = self
                .last_recorded
                .is_some_and(|last| now - last > REARM_TIMEOUT_SECS);
            if expired {
                self.record(sample, "re-arm timeout");
                self.last_recorded = Some(now);
            }
        }

        self.last_trigger = trigger;
    }

    pub fn finish(self) -> Vec<Snapshot> {
        info!(snapshots = self.snapshots.len(), "Snapshot capture complete");
        self.snapshots
    }

    fn record(&mut self, sample: &Sample, reason: &str) {
        let display_values = self
            .display_channels
            .iter()
            .map(|channel| {
                let value = sample.value(channel).unwrap_or_else(|| {
                    debug!(channel = %channel, t = sample.timestamp, "Display channel missing, recording 0.0");
                    0.0
                });
                (channel.clone(), value)
            })
            .collect();
        info!(t = sample.timestamp, reason, "Snapshot recorded");
        self.snapshots.push(Snapshot {
            timestamp: sample.timestamp,
            display_values,
        });
    }
}
