//! Run Report - combined engine output and item status
//!
//! [`analyze`] drives the three engines over one run and folds their output
//! into a [`RunReport`]. The engines share nothing, so they run side by side
//! on the rayon pool; each gets a fresh instance.
//!
//! ## Status rows
//!
//! Every configured evaluation item gets one [`StatusRow`], in configuration
//! order:
//!
//! - continuous items take their verdict from the veto scan
//! - functional items check a cycle metric (e.g. `ng_rundown`) against a
//!   pass condition; `NoData` when no cycle carries that metric

use crate::condition::Comparison;
use crate::config::{AnalysisPlan, EvaluationEntry};
use crate::cycle::CycleDetector;
use crate::snapshot::SnapshotCapturer;
use crate::types::{CycleMetric, CycleResult, Sample, Snapshot, Verdict};
use crate::veto::{VetoOutcome, VetoScanner};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

// ============================================================================
// Functional Checks
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemOutcome {
    Pass,
    Fail,
    NoData,
}

impl From<Verdict> for ItemOutcome {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Pass => ItemOutcome::Pass,
            Verdict::Fail => ItemOutcome::Fail,
        }
    }
}

impl std::fmt::Display for ItemOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemOutcome::Pass => write!(f, "Pass"),
            ItemOutcome::Fail => write!(f, "Fail"),
            ItemOutcome::NoData => write!(f, "No Data"),
        }
    }
}

/// Pass condition on a per-cycle metric: `metric <comparison> threshold`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionalCheck {
    pub id: String,
    pub display_name: String,
    pub source: CycleMetric,
    pub comparison: Comparison,
    pub threshold: f64,
}

impl FunctionalCheck {
    /// Check every cycle that carries the metric. Returns the outcome and the
    /// sequence number of the first violating cycle.
    pub fn evaluate(&self, cycles: &[CycleResult]) -> (ItemOutcome, Option<u32>) {
        let mut seen = false;
        for cycle in cycles {
            let Some(value) = cycle.metric(self.source) else {
                continue;
            };
            seen = true;
            if !self.comparison.evaluate(value, self.threshold) {
                debug!(
                    item = %self.id,
                    cycle = cycle.sequence_number,
                    value,
                    threshold = self.threshold,
                    "Functional check violated"
                );
                return (ItemOutcome::Fail, Some(cycle.sequence_number));
            }
        }
        if seen {
            (ItemOutcome::Pass, None)
        } else {
            (ItemOutcome::NoData, None)
        }
    }
}

// ============================================================================
// Report
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRow {
    pub id: String,
    pub display_name: String,
    pub outcome: ItemOutcome,
    /// Failing tick of a continuous item
    pub failed_at: Option<f64>,
    /// First violating cycle of a functional item
    pub failed_cycle: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub cycles: Vec<CycleResult>,
    pub snapshots: Vec<Snapshot>,
    pub veto: VetoOutcome,
    pub status: Vec<StatusRow>,
}

impl RunReport {
    pub fn status_rows(&self) -> &[StatusRow] {
        &self.status
    }

    pub fn outcome(&self, id: &str) -> Option<ItemOutcome> {
        self.status.iter().find(|r| r.id == id).map(|r| r.outcome)
    }

    /// One-line summary for logs.
    pub fn summary(&self) -> String {
        let count = |outcome| self.status.iter().filter(|r| r.outcome == outcome).count();
        format!(
            "{} cycles, {} snapshots, items: {} pass / {} fail / {} no data",
            self.cycles.len(),
            self.snapshots.len(),
            count(ItemOutcome::Pass),
            count(ItemOutcome::Fail),
            count(ItemOutcome::NoData),
        )
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Run every configured engine over `samples` and build the report.
pub fn analyze(plan: &AnalysisPlan, samples: &[Sample]) -> RunReport {
    let veto_config = plan.evaluation.as_ref().map(|e| e.veto_config());

    let (cycles, (snapshots, veto)) = rayon::join(
        || {
            plan.cycle
                .as_ref()
                .map(|config| CycleDetector::run(config, samples))
                .unwrap_or_default()
        },
        || {
            rayon::join(
                || {
                    plan.snapshot
                        .as_ref()
                        .map(|config| SnapshotCapturer::run(config, samples))
                        .unwrap_or_default()
                },
                || {
                    veto_config
                        .as_ref()
                        .map(|config| VetoScanner::run(config, samples))
                        .unwrap_or_default()
                },
            )
        },
    );

    let status = plan
        .evaluation
        .iter()
        .flat_map(|e| e.entries.iter())
        .map(|entry| match entry {
            EvaluationEntry::Continuous(item) => {
                let verdict = veto.get(&item.id);
                StatusRow {
                    id: item.id.clone(),
                    display_name: item.display_name.clone(),
                    outcome: verdict.map_or(ItemOutcome::Pass, |v| v.verdict.into()),
                    failed_at: verdict.and_then(|v| v.failed_at),
                    failed_cycle: None,
                }
            }
            EvaluationEntry::Functional(check) => {
                let (outcome, failed_cycle) = check.evaluate(&cycles);
                StatusRow {
                    id: check.id.clone(),
                    display_name: check.display_name.clone(),
                    outcome,
                    failed_at: None,
                    failed_cycle,
                }
            }
        })
        .collect();

    let report = RunReport {
        cycles,
        snapshots,
        veto,
        status,
    };
    info!(run = %plan.run.name, summary = %report.summary(), "Run analysed");
    report
}
