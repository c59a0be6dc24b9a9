//! Veto Scanner - one-vote-veto limit checks
//!
//! Each evaluation item lists failure conditions on one or more channels.
//! An item starts at `Pass` and flips to `Fail` on the first tick where ALL
//! of its conditions hold; it never flips back.
//!
//! Conditions can be windowed statistics, instant values or differences.
//! A channel missing from a sample makes its condition "not met" for that
//! tick, so a missing channel never fails an item.

use crate::condition::{Condition, ConditionProbe};
use crate::types::{ItemVerdict, Sample, Verdict};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

// ============================================================================
// Configuration
// ============================================================================

/// How an item's conditions combine. Only conjunction is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConditionLogic {
    #[default]
    #[serde(rename = "AND", alias = "and", alias = "And")]
    And,
}

impl ConditionLogic {
    pub fn parse(name: &str) -> Option<Self> {
        name.trim()
            .eq_ignore_ascii_case("and")
            .then_some(ConditionLogic::And)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationItem {
    pub id: String,
    pub display_name: String,
    pub logic: ConditionLogic,
    pub conditions: Vec<Condition>,
}

/// Validated veto configuration, items in configured order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VetoConfig {
    pub items: Vec<EvaluationItem>,
}

// ============================================================================
// Scan Outcome
// ============================================================================

/// Final verdicts of a scan, in configured item order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VetoOutcome {
    pub verdicts: Vec<ItemVerdict>,
}

impl VetoOutcome {
    pub fn get(&self, id: &str) -> Option<&ItemVerdict> {
        self.verdicts.iter().find(|v| v.id == id)
    }

    /// Item id to verdict.
    pub fn as_map(&self) -> BTreeMap<String, Verdict> {
        self.verdicts
            .iter()
            .map(|v| (v.id.clone(), v.verdict))
            .collect()
    }

    pub fn failed(&self) -> impl Iterator<Item = &ItemVerdict> {
        self.verdicts.iter().filter(|v| !v.verdict.is_pass())
    }

    pub fn all_passed(&self) -> bool {
        self.verdicts.iter().all(|v| v.verdict.is_pass())
    }
}

// ============================================================================
// Veto Scanner
// ============================================================================

#[derive(Debug, Clone)]
struct ItemState {
    id: String,
    display_name: String,
    probes: Vec<ConditionProbe>,
    verdict: Verdict,
    failed_at: Option<f64>,
}

impl ItemState {
    fn observe(&mut self, sample: &Sample) {
        if self.verdict == Verdict::Fail {
            return;
        }
        for probe in &mut self.probes {
            probe.update(sample);
        }
        if self.probes.iter().all(|p| p.is_met(sample)) {
            self.verdict = Verdict::Fail;
            self.failed_at = Some(sample.timestamp);
            warn!(item = %self.id, t = sample.timestamp, "Evaluation item failed");
        }
    }
}

#[derive(Debug, Clone)]
pub struct VetoScanner {
    items: Vec<ItemState>,
}

impl VetoScanner {
    pub fn new(config: &VetoConfig) -> Self {
        let items: Vec<ItemState> = config
            .items
            .iter()
            .map(|item| ItemState {
                id: item.id.clone(),
                display_name: item.display_name.clone(),
                probes: item.conditions.iter().cloned().map(ConditionProbe::new).collect(),
                verdict: Verdict::Pass,
                failed_at: None,
            })
            .collect();
        info!(items = items.len(), "Veto scanner initialised");
        Self { items }
    }

    pub fn run(config: &VetoConfig, samples: &[Sample]) -> VetoOutcome {
        let mut scanner = Self::new(config);
        for sample in samples {
            scanner.process(sample);
        }
        scanner.finish()
    }

    pub fn process(&mut self, sample: &Sample) {
        for item in &mut self.items {
            item.observe(sample);
        }
    }

    /// Verdict of one item so far.
    pub fn verdict(&self, id: &str) -> Option<Verdict> {
        self.items.iter().find(|i| i.id == id).map(|i| i.verdict)
    }

    pub fn finish(self) -> VetoOutcome {
        let verdicts: Vec<ItemVerdict> = self
            .items
            .into_iter()
            .map(|item| ItemVerdict {
                id: item.id,
                display_name: item.display_name,
                verdict: item.verdict,
                failed_at: item.failed_at,
            })
            .collect();
        let failed = verdicts.iter().filter(|v| !v.verdict.is_pass()).count();
        info!(items = verdicts.len(), failed, "Veto scan complete");
        VetoOutcome { verdicts }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{Comparison, DifferenceCondition, StatisticCondition};
    use crate::window::Statistic;

    fn temperature(comparison: Comparison, threshold: f64) -> Condition {
        StatisticCondition {
            channel: "Temperature".to_string(),
            statistic: Statistic::Instant,
            duration: 1.0,
            comparison,
            threshold,
        }
        .into()
    }

    fn item(id: &str, conditions: Vec<Condition>) -> EvaluationItem {
        EvaluationItem {
            id: id.to_string(),
            display_name: format!("{id} check"),
            logic: ConditionLogic::And,
            conditions,
        }
    }

    fn temperature_run() -> Vec<Sample> {
        (0..40)
            .map(|i| {
                let t = f64::from(i);
                let temp = if i == 20 { 900.0 } else { 500.0 };
                Sample::new(t).with("Temperature", temp)
            })
            .collect()
    }

    #[test]
    fn test_condition_logic_parse() {
        assert_eq!(ConditionLogic::parse("AND"), Some(ConditionLogic::And));
        assert_eq!(ConditionLogic::parse(" and "), Some(ConditionLogic::And));
        assert_eq!(ConditionLogic::parse("OR"), None);
    }

    #[test]
    fn test_overtemperature_fails_and_stays_failed() {
        let config = VetoConfig {
            items: vec![item("EGT", vec![temperature(Comparison::Greater, 850.0)])],
        };
        let mut scanner = VetoScanner::new(&config);
        for sample in temperature_run() {
            scanner.process(&sample);
            let expected = if sample.timestamp < 20.0 { Verdict::Pass } else { Verdict::Fail };
            assert_eq!(scanner.verdict("EGT"), Some(expected));
        }
        let outcome = scanner.finish();
        let egt = outcome.get("EGT").map(|v| (v.verdict, v.failed_at));
        assert_eq!(egt, Some((Verdict::Fail, Some(20.0))));
        assert!(!outcome.all_passed());
    }

    #[test]
    fn test_failure_condition_met_on_first_tick() {
        let config = VetoConfig {
            items: vec![item("EGT", vec![temperature(Comparison::Less, 850.0)])],
        };
        let outcome = VetoScanner::run(&config, &temperature_run());
        assert_eq!(outcome.as_map().get("EGT"), Some(&Verdict::Fail));
        assert_eq!(outcome.get("EGT").and_then(|v| v.failed_at), Some(0.0));
    }

    #[test]
    fn test_all_conditions_required() {
        let config = VetoConfig {
            items: vec![item(
                "combo",
                vec![
                    temperature(Comparison::Greater, 850.0),
                    StatisticCondition {
                        channel: "Ng".to_string(),
                        statistic: Statistic::Instant,
                        duration: 1.0,
                        comparison: Comparison::Greater,
                        threshold: 9000.0,
                    }
                    .into(),
                ],
            )],
        };
        // Temperature spikes while Ng stays low: only one condition holds
        let samples: Vec<Sample> = temperature_run()
            .into_iter()
            .map(|s| s.with("Ng", 5000.0))
            .collect();
        assert!(VetoScanner::run(&config, &samples).all_passed());
    }

    #[test]
    fn test_missing_channel_never_fails() {
        let config = VetoConfig {
            items: vec![item("oil", vec![temperature(Comparison::Greater, 0.0)])],
        };
        let samples: Vec<Sample> = (0..10)
            .map(|i| Sample::new(f64::from(i)).with("Ng", 100.0))
            .collect();
        let outcome = VetoScanner::run(&config, &samples);
        assert_eq!(outcome.get("oil").map(|v| v.verdict), Some(Verdict::Pass));
        assert_eq!(outcome.failed().count(), 0);
    }

    #[test]
    fn test_windowed_max_fails_before_window_fills() {
        let hot: Condition = StatisticCondition {
            channel: "T45".to_string(),
            statistic: Statistic::Max,
            duration: 5.0,
            comparison: Comparison::Greater,
            threshold: 700.0,
        }
        .into();
        let config = VetoConfig {
            items: vec![item("egt_peak", vec![hot])],
        };
        let samples: Vec<Sample> = (0..=20)
            .map(|i| {
                let t45 = if i == 0 { 900.0 } else { 500.0 };
                Sample::new(f64::from(i)).with("T45", t45)
            })
            .collect();
        let outcome = VetoScanner::run(&config, &samples);
        let peak = outcome.get("egt_peak").map(|v| (v.verdict, v.failed_at));
        assert_eq!(peak, Some((Verdict::Fail, Some(0.0))));
    }

    #[test]
    fn test_difference_condition() {
        let surge: Condition = DifferenceCondition {
            channel: "P3".to_string(),
            duration: 2.0,
            comparison: Comparison::Less,
            threshold: -20.0,
        }
        .into();
        let config = VetoConfig {
            items: vec![item("surge", vec![surge])],
        };
        let pressures = [100.0, 100.0, 100.0, 100.0, 95.0, 70.0, 70.0];
        let samples: Vec<Sample> = pressures
            .iter()
            .zip(0..)
            .map(|(&p, i)| Sample::new(f64::from(i)).with("P3", p))
            .collect();
        let outcome = VetoScanner::run(&config, &samples);
        // window (3,5] at t=5: 70 - 95 = -25
        assert_eq!(outcome.get("surge").and_then(|v| v.failed_at), Some(5.0));
    }

    #[test]
    fn test_verdicts_keep_configured_order() {
        let config = VetoConfig {
            items: vec![
                item("zeta", vec![temperature(Comparison::Greater, 850.0)]),
                item("alpha", vec![temperature(Comparison::Greater, 1000.0)]),
            ],
        };
        let outcome = VetoScanner::run(&config, &temperature_run());
        let ids: Vec<&str> = outcome.verdicts.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["zeta", "alpha"]);
        assert_eq!(outcome.failed().count(), 1);
    }
}
