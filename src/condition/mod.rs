//! Conditions - validated, typed trigger predicates
//!
//! Configuration arrives as loosely-typed key/value data; `config` turns it
//! into one of the [`Condition`] variants exactly once at load time. At run
//! time every condition is paired with a [`ChannelProbe`] that owns its
//! sliding window, giving a [`ConditionProbe`] the engines update and query
//! tick by tick.
//!
//! ## Variants
//!
//! - `Statistic`: windowed statistic (or instant value) compared to a threshold
//! - `Difference`: current value minus the value `duration` seconds earlier
//! - `DualThreshold`: rundown check, "below high" then "below low"
//! - `Amplitude`: `max - min` over a window (steady-state Condition 2)

use crate::types::Sample;
use crate::window::{SlidingWindow, Statistic};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Comparison Operators
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unsupported comparison operator '{0}' (expected >, <, >= or <=)")]
pub struct UnknownComparison(pub String);

/// Threshold comparison. Anything other than the four operators is a fatal
/// configuration error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparison {
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = "<")]
    Less,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "<=")]
    LessOrEqual,
}

impl Comparison {
    pub fn evaluate(&self, value: f64, threshold: f64) -> bool {
        match self {
            Comparison::Greater => value > threshold,
            Comparison::Less => value < threshold,
            Comparison::GreaterOrEqual => value >= threshold,
            Comparison::LessOrEqual => value <= threshold,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Comparison::Greater => ">",
            Comparison::Less => "<",
            Comparison::GreaterOrEqual => ">=",
            Comparison::LessOrEqual => "<=",
        }
    }
}

impl FromStr for Comparison {
    type Err = UnknownComparison;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            ">" => Ok(Comparison::Greater),
            "<" => Ok(Comparison::Less),
            ">=" => Ok(Comparison::GreaterOrEqual),
            "<=" => Ok(Comparison::LessOrEqual),
            other => Err(UnknownComparison(other.to_string())),
        }
    }
}

impl std::fmt::Display for Comparison {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Condition Variants
// ============================================================================

/// `statistic(channel over duration) <logic> threshold`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticCondition {
    pub channel: String,
    /// Never `Difference`; that is its own variant
    pub statistic: Statistic,
    pub duration: f64,
    pub comparison: Comparison,
    pub threshold: f64,
}

/// `(current - value duration seconds earlier) <logic> threshold`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifferenceCondition {
    pub channel: String,
    pub duration: f64,
    pub comparison: Comparison,
    pub threshold: f64,
}

/// Rundown check on a speed channel.
///
/// `threshold_low < threshold_high` is enforced by config validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DualThresholdCondition {
    pub channel: String,
    pub statistic: Statistic,
    pub duration: f64,
    pub threshold_high: f64,
    pub threshold_low: f64,
}

impl DualThresholdCondition {
    pub fn is_below_high(&self, value: f64) -> bool {
        value < self.threshold_high
    }

    pub fn is_below_low(&self, value: f64) -> bool {
        value < self.threshold_low
    }
}

/// `(max - min over duration) <logic> threshold`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmplitudeCondition {
    pub channel: String,
    pub duration: f64,
    pub comparison: Comparison,
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    Statistic(StatisticCondition),
    Difference(DifferenceCondition),
    DualThreshold(DualThresholdCondition),
    Amplitude(AmplitudeCondition),
}

impl Condition {
    pub fn channel(&self) -> &str {
        match self {
            Condition::Statistic(c) => &c.channel,
            Condition::Difference(c) => &c.channel,
            Condition::DualThreshold(c) => &c.channel,
            Condition::Amplitude(c) => &c.channel,
        }
    }

    fn measure(&self) -> (Measure, f64) {
        match self {
            Condition::Statistic(c) => (Measure::Statistic(c.statistic), c.duration),
            Condition::Difference(c) => (Measure::Difference, c.duration),
            Condition::DualThreshold(c) => (Measure::Statistic(c.statistic), c.duration),
            Condition::Amplitude(c) => (Measure::Amplitude, c.duration),
        }
    }

    /// Whether an observed value satisfies this condition.
    ///
    /// For `DualThreshold` this is the terminal "below low" check.
    pub fn accepts(&self, value: f64) -> bool {
        match self {
            Condition::Statistic(c) => c.comparison.evaluate(value, c.threshold),
            Condition::Difference(c) => c.comparison.evaluate(value, c.threshold),
            Condition::DualThreshold(c) => c.is_below_low(value),
            Condition::Amplitude(c) => c.comparison.evaluate(value, c.threshold),
        }
    }
}

impl From<StatisticCondition> for Condition {
    fn from(c: StatisticCondition) -> Self {
        Condition::Statistic(c)
    }
}

impl From<DifferenceCondition> for Condition {
    fn from(c: DifferenceCondition) -> Self {
        Condition::Difference(c)
    }
}

impl From<DualThresholdCondition> for Condition {
    fn from(c: DualThresholdCondition) -> Self {
        Condition::DualThreshold(c)
    }
}

impl From<AmplitudeCondition> for Condition {
    fn from(c: AmplitudeCondition) -> Self {
        Condition::Amplitude(c)
    }
}

// ============================================================================
// Runtime Probes
// ============================================================================

/// What a probe derives from its channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    Statistic(Statistic),
    Difference,
    Amplitude,
}

/// Owns the window for one channel and derives a value from it.
#[derive(Debug, Clone)]
pub struct ChannelProbe {
    channel: String,
    measure: Measure,
    window: Option<SlidingWindow>,
    require_coverage: bool,
}

impl ChannelProbe {
    pub fn new(channel: impl Into<String>, measure: Measure, duration: f64) -> Self {
        let window = match measure {
            Measure::Statistic(Statistic::Instant) => None,
            _ => Some(SlidingWindow::new(duration)),
        };
        Self {
            channel: channel.into(),
            measure,
            window,
            require_coverage: false,
        }
    }

    /// Withhold aggregates until the window is covered.
    pub fn with_coverage(mut self) -> Self {
        self.require_coverage = true;
        self
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Feed this tick's reading into the window. Missing channels are skipped.
    pub fn update(&mut self, sample: &Sample) {
        if let (Some(window), Some(value)) = (self.window.as_mut(), sample.value(&self.channel)) {
            window.update(sample.timestamp, value);
        }
    }

    /// Derived value for this tick, `None` when the channel is absent from
    /// `sample` or the window cannot produce a value yet.
    pub fn value(&self, sample: &Sample) -> Option<f64> {
        let current = sample.value(&self.channel)?;
        match (self.measure, self.window.as_ref()) {
            (Measure::Statistic(Statistic::Instant), _) => Some(current),
            (Measure::Statistic(kind), Some(window)) if self.require_coverage => {
                window.covered_statistic(kind)
            }
            (Measure::Statistic(kind), Some(window)) => window.statistic(kind),
            (Measure::Difference, Some(window)) => window.difference(),
            (Measure::Amplitude, Some(window)) => window.amplitude(),
            (_, None) => None,
        }
    }
}

/// A condition bound to its probe.
#[derive(Debug, Clone)]
pub struct ConditionProbe {
    condition: Condition,
    probe: ChannelProbe,
}

impl ConditionProbe {
    pub fn new(condition: impl Into<Condition>) -> Self {
        let condition = condition.into();
        let (measure, duration) = condition.measure();
        let probe = ChannelProbe::new(condition.channel(), measure, duration);
        Self { condition, probe }
    }

    /// Probe whose aggregate is only reported once its window is covered.
    pub fn covered(condition: impl Into<Condition>) -> Self {
        let mut probe = Self::new(condition);
        probe.probe = probe.probe.with_coverage();
        probe
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    pub fn update(&mut self, sample: &Sample) {
        self.probe.update(sample);
    }

    pub fn value(&self, sample: &Sample) -> Option<f64> {
        self.probe.value(sample)
    }

    /// Missing channel or insufficient window data count as "not met".
    pub fn is_met(&self, sample: &Sample) -> bool {
        self.value(sample)
            .is_some_and(|value| self.condition.accepts(value))
    }
}
